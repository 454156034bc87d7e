use std::fmt;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A non-empty range in the 32-bit physical address space, bounded inclusively on both sides.
///
/// Enforces the invariant that `self.start() <= self.end()`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AddressRange {
    start: u32,
    end: u32,
}

impl Display for AddressRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#010x}, {:#010x}]", self.start, self.end)
    }
}

impl AddressRange {
    pub fn new(start: u32, end: u32) -> Result<Self, InvalidBoundsError> {
        (start <= end)
            .then_some(Self { start, end })
            .ok_or(InvalidBoundsError { start, end })
    }

    /// Create the range of `size` bytes starting at `base`.
    ///
    /// Fails if `size` is zero or if the range would run past the end of the address space.
    pub fn with_size(base: u32, size: u32) -> Result<Self, InvalidBoundsError> {
        match size.checked_sub(1).and_then(|delta| base.checked_add(delta)) {
            Some(end) => Self::new(base, end),
            None => Err(InvalidBoundsError {
                start: base,
                end: base.wrapping_add(size).wrapping_sub(1),
            }),
        }
    }

    pub fn start(self) -> u32 {
        self.start
    }

    pub fn end(self) -> u32 {
        self.end
    }

    /// Check if an address is contained within this address range.
    pub fn contains(self, address: u32) -> bool {
        self.start <= address && address <= self.end
    }

    /// Returns `true` if the `size` bytes starting at `address` all lie within this range.
    ///
    /// An access of zero bytes is never contained.
    pub fn contains_access(self, address: u32, size: usize) -> bool {
        self.contains(address)
            && size
                .checked_sub(1)
                .and_then(|delta| u32::try_from(delta).ok())
                .is_some_and(|delta| self.end - address >= delta)
    }

    /// Returns the size of this address range in bytes.
    pub fn size(self) -> usize {
        const_assert!(usize::BITS > 32);
        (self.end - self.start) as usize + 1
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("bounds [{start:#x}, {end:#x}] do not form a valid 32-bit address range")]
pub struct InvalidBoundsError {
    start: u32,
    end: u32,
}

#[macro_export]
macro_rules! address_range {
    ($start:expr, $end:expr) => {
        $crate::address_range::AddressRange::new($start, $end).unwrap()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_size() {
        let range = AddressRange::with_size(0x1000, 32 * 1024).unwrap();
        assert_eq!(0x1000, range.start());
        assert_eq!(0x8FFF, range.end());
        assert_eq!(32 * 1024, range.size());

        let top = AddressRange::with_size(0xF000_0000, 0x1000_0000).unwrap();
        assert_eq!(u32::MAX, top.end());

        assert!(AddressRange::with_size(0x1000, 0).is_err());
        assert!(AddressRange::with_size(0xFFFF_FFFF, 2).is_err());
    }

    #[test]
    fn test_contains_access() {
        let range = address_range![0x3000_0000, 0x3000_0003];
        assert!(range.contains_access(0x3000_0000, 4));
        assert!(range.contains_access(0x3000_0002, 2));
        assert!(!range.contains_access(0x3000_0002, 4));
        assert!(!range.contains_access(0x2FFF_FFFF, 1));
        assert!(!range.contains_access(0x3000_0000, 0));
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(AddressRange::new(2, 1).is_err());
        assert_eq!("[0x00001000, 0x00008fff]", address_range![0x1000, 0x8FFF].to_string());
    }
}
