//! Core Local Interruptor

use log::trace;

use crate::bus::{read_register_lanes, write_register_lanes, Bus};

pub const MTIME_ADDR_LO: u32 = 0x0;
pub const MTIME_ADDR_HI: u32 = MTIME_ADDR_LO + 4;
pub const MTIMECMP_ADDR_LO: u32 = 0x8;
pub const MTIMECMP_ADDR_HI: u32 = MTIMECMP_ADDR_LO + 4;

/// Free-running 64-bit timer with a compare register driving the machine timer interrupt.
///
/// `mtime` advances by one every clock tick. The timer interrupt is a pure function of the two
/// registers, so it is never stale.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Clint {
    mtime: u64,
    mtimecmp: u64,
}

impl Default for Clint {
    fn default() -> Self {
        Self::new()
    }
}

impl Clint {
    /// Create new Clint in reset state.
    ///
    /// `mtimecmp` starts at its maximum so that no timer interrupt is pending after reset.
    pub fn new() -> Self {
        Self {
            mtime: 0,
            mtimecmp: u64::MAX,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn step(&mut self) {
        self.mtime = self.mtime.wrapping_add(1);
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    pub fn mtimecmp(&self) -> u64 {
        self.mtimecmp
    }

    pub fn set_mtimecmp(&mut self, value: u64) {
        self.mtimecmp = value;
    }

    /// Level of the machine timer interrupt line (MTIP).
    pub fn needs_interrupt(&self) -> bool {
        self.mtime >= self.mtimecmp
    }

    fn read_u32(&self, address: u32) -> u32 {
        match address {
            MTIME_ADDR_LO => self.mtime as u32,
            MTIME_ADDR_HI => (self.mtime >> 32) as u32,
            MTIMECMP_ADDR_LO => self.mtimecmp as u32,
            MTIMECMP_ADDR_HI => (self.mtimecmp >> 32) as u32,
            _ => 0,
        }
    }

    fn write_u32(&mut self, address: u32, value: u32) {
        match address {
            MTIME_ADDR_LO => self.mtime = set_lower(self.mtime, value),
            MTIME_ADDR_HI => self.mtime = set_higher(self.mtime, value),
            MTIMECMP_ADDR_LO => self.mtimecmp = set_lower(self.mtimecmp, value),
            MTIMECMP_ADDR_HI => self.mtimecmp = set_higher(self.mtimecmp, value),
            _ => return,
        }
        trace!(
            address = address,
            value = value;
            "CLINT register written"
        );
    }
}

fn set_lower(register: u64, value: u32) -> u64 {
    register & 0xFFFF_FFFF_0000_0000 | value as u64
}

fn set_higher(register: u64, value: u32) -> u64 {
    (value as u64) << 32 | register & 0xFFFF_FFFF
}

/// Registers are 32 bits wide; sub-word accesses select byte lanes of the addressed register.
impl Bus for Clint {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        self.read_debug(buf, address)
    }

    fn read_debug(&self, buf: &mut [u8], address: u32) {
        let register = address & !0b11;
        read_register_lanes(self.read_u32(register), address & 0b11, buf);
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        let register = address & !0b11;
        let value = write_register_lanes(self.read_u32(register), address & 0b11, buf);
        self.write_u32(register, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_word(clint: &mut Clint, address: u32, value: u32) {
        Bus::write(clint, address, &value.to_le_bytes());
    }

    fn read_word(clint: &mut Clint, address: u32) -> u32 {
        let mut buf = [0; 4];
        Bus::read(clint, &mut buf, address);
        u32::from_le_bytes(buf)
    }

    #[test]
    fn test_reset_state() {
        let clint = Clint::new();
        assert_eq!(0, clint.mtime());
        assert!(!clint.needs_interrupt());
    }

    #[test]
    fn test_timer_fires_at_compare() {
        let mut clint = Clint::new();
        write_word(&mut clint, MTIMECMP_ADDR_HI, 0);
        write_word(&mut clint, MTIMECMP_ADDR_LO, 3);
        assert_eq!(3, clint.mtimecmp());
        for _ in 0..2 {
            clint.step();
            assert!(!clint.needs_interrupt());
        }
        clint.step();
        assert!(clint.needs_interrupt());
        clint.step();
        assert!(clint.needs_interrupt());
    }

    #[test]
    fn test_halves_independent() {
        let mut clint = Clint::new();
        write_word(&mut clint, MTIMECMP_ADDR_LO, 0x1234_5678);
        assert_eq!(0xFFFF_FFFF_1234_5678, clint.mtimecmp());
        write_word(&mut clint, MTIMECMP_ADDR_HI, 0x9ABC_DEF0);
        assert_eq!(0x9ABC_DEF0_1234_5678, clint.mtimecmp());
        assert_eq!(0x9ABC_DEF0, read_word(&mut clint, MTIMECMP_ADDR_HI));
        assert_eq!(0x1234_5678, read_word(&mut clint, MTIMECMP_ADDR_LO));
    }

    #[test]
    fn test_mtime_carries_into_high_half() {
        let mut clint = Clint::new();
        write_word(&mut clint, MTIME_ADDR_LO, u32::MAX);
        clint.step();
        assert_eq!(0, read_word(&mut clint, MTIME_ADDR_LO));
        assert_eq!(1, read_word(&mut clint, MTIME_ADDR_HI));
    }

    #[test]
    fn test_byte_lanes() {
        let mut clint = Clint::new();
        Bus::write(&mut clint, MTIMECMP_ADDR_LO + 1, &[0x00]);
        assert_eq!(0xFFFF_FFFF_FFFF_00FF, clint.mtimecmp());
        let mut buf = [0; 2];
        Bus::read(&mut clint, &mut buf, MTIMECMP_ADDR_LO);
        assert_eq!([0xFF, 0x00], buf);
    }
}
