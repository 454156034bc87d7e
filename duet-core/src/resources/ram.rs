use crate::bus::Bus;

/// Byte-addressed, zero-initialized RAM.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    /// Create a new zero-initialized RAM resource that can hold `size` bytes.
    ///
    /// `size` must be at least one, and at most `1 << 32` (since it must be addressable by `u32`).
    pub fn new(size: usize) -> Option<Self> {
        if size == 0 || (usize::BITS > 32 && size > (1 << 32)) {
            None
        } else {
            Some(Self {
                data: vec![0; size],
            })
        }
    }

    /// Returns the size expressed in bytes. Guaranteed to be at least one.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Force RAM back to its reset state, which is all-zeros.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Copy bytes starting at `address` into `buf`. Bytes past the end of the RAM read as `0`.
    pub fn read(&self, buf: &mut [u8], address: u32) {
        buf.fill(0);
        let start = address as usize;
        if start >= self.data.len() {
            return;
        }
        let size = buf.len().min(self.data.len() - start);
        buf[..size].copy_from_slice(&self.data[start..start + size]);
    }

    /// Copy `buf` into RAM starting at `address`. Bytes past the end of the RAM are dropped.
    pub fn write(&mut self, address: u32, buf: &[u8]) {
        let start = address as usize;
        if start >= self.data.len() {
            return;
        }
        let size = buf.len().min(self.data.len() - start);
        self.data[start..start + size].copy_from_slice(&buf[..size]);
    }
}

impl Bus for Ram {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        Ram::read(self, buf, address);
    }

    fn read_debug(&self, buf: &mut [u8], address: u32) {
        Ram::read(self, buf, address);
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        Ram::write(self, address, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        assert!(Ram::new(0).is_none());
        let ram = Ram::new(16).unwrap();
        assert_eq!(16, ram.len());
    }

    #[test]
    fn test_read_write() {
        let mut ram = Ram::new(8).unwrap();
        ram.write(2, &[1, 2, 3]);
        let mut buf = [0xFF; 4];
        ram.read(&mut buf, 1);
        assert_eq!([0, 1, 2, 3], buf);
    }

    #[test]
    fn test_access_past_end() {
        let mut ram = Ram::new(4).unwrap();
        ram.write(2, &[0xAA, 0xBB, 0xCC]);
        let mut buf = [0xFF; 4];
        ram.read(&mut buf, 2);
        assert_eq!([0xAA, 0xBB, 0, 0], buf);
        ram.read(&mut buf, 100);
        assert_eq!([0; 4], buf);
    }

    #[test]
    fn test_reset() {
        let mut ram = Ram::new(4).unwrap();
        ram.write(0, &[1, 2, 3, 4]);
        ram.reset();
        let mut buf = [0xFF; 4];
        ram.read(&mut buf, 0);
        assert_eq!([0; 4], buf);
    }
}
