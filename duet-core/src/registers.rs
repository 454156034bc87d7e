//! General purpose register file.

use std::fmt;
use std::fmt::Formatter;

/// The number of `x` registers available (indices start at `0` for `x0`)
pub const LEN: u8 = 32;

/// The 32 general purpose `x` registers of an RV32I core.
///
/// Register `x0` is hardwired to zero: reads always return `0` and writes are discarded.
///
/// It is not possible to get a mutable reference to an `x` register, since that would allow
/// unchecked writes to register `x0`.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct RegisterFile {
    x_registers: [u32; LEN as usize],
}

impl RegisterFile {
    /// Returns a fresh set of all-zero registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of an `x` register.
    pub fn read(&self, specifier: Specifier) -> u32 {
        self.x_registers[usize::from(specifier)]
    }

    /// Sets the value of an `x` register, returning `false` if the write was discarded because it
    /// targeted `x0`.
    pub fn write(&mut self, specifier: Specifier, value: u32) -> bool {
        if specifier == Specifier::X0 {
            return false;
        }
        self.x_registers[usize::from(specifier)] = value;
        true
    }

    /// Clear every register.
    pub fn reset(&mut self) {
        self.x_registers = [0; LEN as usize];
    }
}

/// An `x` register specifier. Can take values in the range `0..LEN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Specifier(u8);

impl Specifier {
    /// Register `x0`, a.k.a. register `zero`, always returns `0` on read, and ignores any writes.
    pub const X0: Self = Specifier(0);

    /// Register `x31`, which test programs use as their debug output.
    pub const X31: Self = Specifier(31);

    /// Create a register specifier from its index, returning `None` if `index > 31`.
    pub fn new<U: TryInto<u8>>(index: U) -> Option<Self> {
        let index = index.try_into().ok()?;
        (index < LEN).then_some(Self(index))
    }

    /// Build a specifier from the low 5 bits of `value`; the remaining bits are ignored.
    pub fn from_u5_truncating(value: u32) -> Self {
        const_assert_eq!(LEN, 32);
        Self((value & 0x1F) as u8)
    }

    /// Return an iterator over all register specifier, starting at x0 up to x31.
    pub fn iter_all() -> impl Iterator<Item = Self> {
        (0..LEN).map(Self)
    }
}

impl From<Specifier> for u8 {
    fn from(value: Specifier) -> Self {
        value.0
    }
}

impl From<Specifier> for usize {
    fn from(value: Specifier) -> Self {
        value.0 as usize
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_to_zero() {
        let mut registers = RegisterFile::new();
        assert!(!registers.write(Specifier::X0, 0xDEADBEEF));
        assert_eq!(0, registers.read(Specifier::X0));
    }

    #[test]
    fn test_write_read_all() {
        let mut registers = RegisterFile::new();
        for specifier in Specifier::iter_all().skip(1) {
            assert!(registers.write(specifier, u8::from(specifier) as u32 + 1));
        }
        assert_eq!(0, registers.read(Specifier::X0));
        for specifier in Specifier::iter_all().skip(1) {
            assert_eq!(u8::from(specifier) as u32 + 1, registers.read(specifier));
        }
        registers.reset();
        assert_eq!(RegisterFile::new(), registers);
    }

    #[test]
    fn test_specifier() {
        assert_eq!(Some(Specifier::X31), Specifier::new(31));
        assert_eq!(None, Specifier::new(32));
        assert_eq!(None, Specifier::new(-1));
        assert_eq!(Specifier::X31, Specifier::from_u5_truncating(0xFF));
        assert_eq!("x31", Specifier::X31.to_string());
        assert_eq!(32, Specifier::iter_all().count());
    }
}
