#[macro_use]
extern crate static_assertions;

pub mod address_map;
pub mod address_range;
pub mod board;
pub mod bus;
pub mod core;
pub mod cs_registers;
pub mod image;
pub mod instruction;
pub mod interrupt;
pub mod registers;
pub mod resources;
pub mod simulator;
pub mod system_bus;
pub mod units;

/// Re-export of [`AddressRange`] for convenience.
pub use address_range::AddressRange;

pub mod unit {
    //! Widths of the bus access units, in bytes.

    pub const BYTE: u32 = 1;
    pub const HALFWORD: u32 = 2;
    pub const WORD: u32 = 4;
}

/// Power-of-two alignment requirement of a bus access.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Alignment(u32);

impl Alignment {
    /// Any address.
    pub const BYTE: Self = Self(unit::BYTE);
    /// Even addresses.
    pub const HALFWORD: Self = Self(unit::HALFWORD);
    /// Addresses with the low two bits clear.
    pub const WORD: Self = Self(unit::WORD);

    /// Returns `true` if `address` is aligned to this alignment.
    pub fn is_aligned(self, address: u32) -> bool {
        address & (self.0 - 1) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_aligned() {
        assert!(Alignment::BYTE.is_aligned(0x1003));
        assert!(Alignment::HALFWORD.is_aligned(0x1002));
        assert!(!Alignment::HALFWORD.is_aligned(0x1001));
        assert!(Alignment::WORD.is_aligned(0x1000));
        assert!(!Alignment::WORD.is_aligned(0x1002));
    }
}
