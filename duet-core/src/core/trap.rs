use super::Exception;
use crate::interrupt::Interrupt;

/// Trap setup and handling registers: mtvec, mscratch, mepc, mcause, and mtval.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Trap {
    mtvec: u32,
    mscratch: u32,
    mepc: u32,
    pub mcause: Cause,
    mtval: u32,
}

impl Trap {
    pub fn new() -> Self {
        Self {
            mtvec: 0,
            mscratch: 0,
            mepc: 0,
            mcause: Cause::new(),
            mtval: 0,
        }
    }

    pub fn read_mtvec(&self) -> u32 {
        self.mtvec
    }

    /// The MODE field is **WARL**: only direct (0) and vectored (1) are supported, so bit 1 is
    /// hardwired to zero.
    pub fn write_mtvec(&mut self, value: u32, mask: u32) {
        self.mtvec = (self.mtvec & !mask | value & mask) & !0b10;
    }

    /// Returns the address a trap for `cause` jumps to.
    ///
    /// In vectored mode, interrupts jump to `BASE + 4 * code`. Exceptions always jump to `BASE`.
    pub fn vector(&self, cause: &TrapCause) -> u32 {
        let base = self.mtvec & !0b11;
        match cause {
            TrapCause::Interrupt(interrupt) if self.mtvec & 0b1 == 1 => {
                base.wrapping_add(4 * interrupt.code())
            }
            _ => base,
        }
    }

    pub fn read_mscratch(&self) -> u32 {
        self.mscratch
    }

    pub fn write_mscratch(&mut self, value: u32, mask: u32) {
        self.mscratch = self.mscratch & !mask | value & mask;
    }

    pub fn read_mepc(&self) -> u32 {
        self.mepc
    }

    pub fn write_mepc(&mut self, value: u32, mask: u32) {
        self.mepc = self.mepc & !mask | value & mask & !0b11;
    }

    pub fn read_mtval(&self) -> u32 {
        self.mtval
    }

    pub fn write_mtval(&mut self, value: u32, mask: u32) {
        self.mtval = self.mtval & !mask | value & mask;
    }
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Cause(u32);

impl Cause {
    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        self.0 = self.0 & !mask | value & mask;
    }

    pub fn set(&mut self, cause: &TrapCause) {
        self.0 = cause.mcause();
    }
}

/// What caused a trap to be taken.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrapCause {
    Exception(Exception),
    Interrupt(Interrupt),
}

impl TrapCause {
    /// The value mcause takes for this trap. Interrupts have the most significant bit set.
    pub fn mcause(&self) -> u32 {
        match self {
            Self::Exception(exception) => exception.code(),
            Self::Interrupt(interrupt) => 0x8000_0000 | interrupt.code(),
        }
    }
}

impl From<Exception> for TrapCause {
    fn from(value: Exception) -> Self {
        Self::Exception(value)
    }
}

impl From<Interrupt> for TrapCause {
    fn from(value: Interrupt) -> Self {
        Self::Interrupt(value)
    }
}
