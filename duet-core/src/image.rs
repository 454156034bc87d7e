//! Memory images loaded into RAM at boot.

use log::debug;
use thiserror::Error;

/// Contents of memory at boot, as a flat byte buffer loaded at the start of RAM.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    /// Use `bytes` as-is.
    pub fn from_binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Build an image from 32-bit words, stored little-endian.
    pub fn from_words(words: &[u32]) -> Self {
        Self {
            bytes: words.iter().flat_map(|word| word.to_le_bytes()).collect(),
        }
    }

    /// Parse the text format: one 32-bit hex word per line.
    ///
    /// Words may carry a `0x` prefix. Everything after `#` or `//` is a comment, and blank lines
    /// are skipped.
    pub fn parse_hex(text: &str) -> Result<Self, ImageError> {
        let mut words = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let content = strip_comment(line).trim();
            if content.is_empty() {
                continue;
            }
            let digits = content
                .strip_prefix("0x")
                .or_else(|| content.strip_prefix("0X"))
                .unwrap_or(content);
            let word = (!digits.is_empty() && digits.len() <= 8)
                .then(|| u32::from_str_radix(digits, 16).ok())
                .flatten()
                .ok_or_else(|| ImageError::InvalidHexLine {
                    line: index + 1,
                    content: line.to_owned(),
                })?;
            words.push(word);
        }
        Ok(Self::from_words(&words))
    }

    /// Pick the format of `bytes`: text that parses as hex words (at least one) is the hex format,
    /// anything else is a raw binary.
    pub fn detect(bytes: &[u8]) -> Self {
        if let Ok(text) = std::str::from_utf8(bytes) {
            if let Ok(image) = Self::parse_hex(text) {
                if !image.is_empty() {
                    debug!(bytes = image.len(); "detected hex image");
                    return image;
                }
            }
        }
        debug!(bytes = bytes.len(); "detected binary image");
        Self::from_binary(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find('#'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ImageError {
    #[error("line {line} is not a 32-bit hex word: {content:?}")]
    InvalidHexLine { line: usize, content: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let text = "\
            # boot\n\
            00500093 // addi x1, x0, 5\n\
            \n\
            0x00100073\n";
        let image = Image::parse_hex(text).unwrap();
        assert_eq!(
            &[0x93, 0x00, 0x50, 0x00, 0x73, 0x00, 0x10, 0x00],
            image.bytes()
        );
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(
            Err(ImageError::InvalidHexLine {
                line: 2,
                content: "0x123456789".to_owned()
            }),
            Image::parse_hex("00000013\n0x123456789\n")
        );
        assert!(Image::parse_hex("0x\n").is_err());
        assert!(Image::parse_hex("addi x1, x0, 1\n").is_err());
    }

    #[test]
    fn test_detect() {
        let hex = Image::detect(b"deadbeef\n");
        assert_eq!(&[0xEF, 0xBE, 0xAD, 0xDE], hex.bytes());

        let binary = Image::detect(&[0x93, 0x00, 0x50, 0x00]);
        assert_eq!(&[0x93, 0x00, 0x50, 0x00], binary.bytes());

        // Comment-only text holds no words, so it is taken verbatim.
        let text = Image::detect(b"# nothing\n");
        assert_eq!(b"# nothing\n", text.bytes());
    }
}
