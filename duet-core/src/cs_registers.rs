//! Control and Status Registers.
//!
//! Part of the "Zicsr" extension. Only the machine-mode registers needed for interrupt handling
//! and the basic counters are implemented; any other specifier is rejected.

use crate::core::counters::Counters;
use crate::core::interrupts::Interrupts;
use crate::core::status::Status;
use crate::core::trap::{Trap, TrapCause};
use crate::instruction::CsrOp;
use crate::interrupt::{Interrupt, InterruptLines};
use log::debug;
use thiserror::Error;

/// General 12-bit value representing a CSR specifier. Note that this can hold any 12-bit value,
/// even if the value represents an unsupported or non-existent CSR.
pub type CsrSpecifier = u16;

/// `misa` value: MXL = 1 (XLEN 32), extension I.
pub const MISA_RV32I: u32 = 0x4000_0100;

/// Control and Status Registers for the single hart.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct CsRegisters {
    status: Status,
    interrupts: Interrupts,
    trap: Trap,
    counters: Counters,
}

impl CsRegisters {
    /// Creates a fresh collection of registers initialized to their reset values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force all Control and Status registers to their reset state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    pub fn trap(&self) -> &Trap {
        &self.trap
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    /// Read the value of a CSR by its specifier.
    ///
    /// `lines` is the current level of the platform interrupt lines, which mip reflects.
    pub fn read(&self, specifier: CsrSpecifier, lines: InterruptLines) -> Result<u32, CsrError> {
        use specifier::*;
        Ok(match specifier {
            MSTATUS => self.status.read(),
            MISA => MISA_RV32I,
            MIE => self.interrupts.read_mie(),
            MTVEC => self.trap.read_mtvec(),
            MSCRATCH => self.trap.read_mscratch(),
            MEPC => self.trap.read_mepc(),
            MCAUSE => self.trap.mcause.read(),
            MTVAL => self.trap.read_mtval(),
            MIP => self.interrupts.read_mip(lines),
            MCYCLE | CYCLE => self.counters.read_mcycle(),
            MCYCLEH | CYCLEH => self.counters.read_mcycleh(),
            MINSTRET | INSTRET => self.counters.read_minstret(),
            MINSTRETH | INSTRETH => self.counters.read_minstreth(),
            MHARTID => 0,
            _ => return Err(CsrError::Unsupported(specifier)),
        })
    }

    /// Write `value` to the bits of a CSR selected by `mask`, respecting the **WARL** behavior of
    /// each register.
    pub fn write(&mut self, specifier: CsrSpecifier, value: u32, mask: u32) -> Result<(), CsrError> {
        use specifier::*;
        if specifier::is_read_only(specifier) {
            return if is_supported(specifier) {
                Err(CsrError::WriteToReadOnly(specifier))
            } else {
                Err(CsrError::Unsupported(specifier))
            };
        }
        match specifier {
            MSTATUS => self.status.write(value, mask),
            // Writable but only a single ISA is supported, so writes are ignored.
            MISA => {}
            MIE => self.interrupts.write_mie(value, mask),
            MTVEC => self.trap.write_mtvec(value, mask),
            MSCRATCH => self.trap.write_mscratch(value, mask),
            MEPC => self.trap.write_mepc(value, mask),
            MCAUSE => self.trap.mcause.write(value, mask),
            MTVAL => self.trap.write_mtval(value, mask),
            // Pending bits are driven by the CLINT and PLIC.
            MIP => {}
            MCYCLE => self.counters.write_mcycle(value, mask),
            MCYCLEH => self.counters.write_mcycleh(value, mask),
            MINSTRET => self.counters.write_minstret(value, mask),
            MINSTRETH => self.counters.write_minstreth(value, mask),
            _ => return Err(CsrError::Unsupported(specifier)),
        }
        Ok(())
    }

    /// Atomic read-modify-write as performed by a Zicsr instruction, returning the old value.
    ///
    /// When `write` is `false` (CSRRS/CSRRC with a zero source) only the read is performed, so
    /// read-only registers can be read that way.
    pub fn access(
        &mut self,
        specifier: CsrSpecifier,
        op: CsrOp,
        operand: u32,
        write: bool,
        lines: InterruptLines,
    ) -> Result<u32, CsrError> {
        let old = self.read(specifier, lines)?;
        if write {
            let (value, mask) = match op {
                CsrOp::ReadWrite => (operand, !0),
                CsrOp::ReadSet => (!0, operand),
                CsrOp::ReadClear => (0, operand),
            };
            self.write(specifier, value, mask)?;
        }
        Ok(old)
    }

    /// The interrupt the hart should take at the next instruction boundary, if any.
    pub fn pending_interrupt(&self, lines: InterruptLines) -> Option<Interrupt> {
        if !self.status.mie() {
            return None;
        }
        self.interrupts.highest_pending(lines)
    }

    /// Perform the CSR side of trap entry and return the address to continue at.
    pub fn enter_trap(&mut self, cause: TrapCause, pc: u32, tval: u32) -> u32 {
        self.trap.write_mepc(pc, !0);
        self.trap.mcause.set(&cause);
        self.trap.write_mtval(tval, !0);
        self.status.push_interrupt_enable();
        let target = self.trap.vector(&cause);
        debug!(
            mcause = self.trap.mcause.read(),
            mepc = pc,
            target = target;
            "entering trap handler"
        );
        target
    }

    /// Perform the CSR side of MRET and return the address to continue at.
    pub fn return_from_trap(&mut self) -> u32 {
        self.status.pop_interrupt_enable();
        let target = self.trap.read_mepc();
        debug!(target = target; "returning from trap handler");
        target
    }
}

fn is_supported(specifier: CsrSpecifier) -> bool {
    use specifier::*;
    matches!(
        specifier,
        CYCLE | CYCLEH | INSTRET | INSTRETH | MHARTID
    )
}

/// Errors that can occur when attempting to access a CSR.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrError {
    #[error("unsupported CSR: {0:#05X}")]
    Unsupported(CsrSpecifier),
    /// Attempt to write to a read-only register.
    #[error("writing to read-only CSR {0:#05X} is invalid")]
    WriteToReadOnly(CsrSpecifier),
}

/// Specifiers for all supported CSRs.
pub mod specifier {
    use super::CsrSpecifier;

    /// Cycle counter for RDCYCLE instruction.
    pub const CYCLE: CsrSpecifier = 0xC00;
    /// Instructions-retired counter for RDINSTRET instruction.
    pub const INSTRET: CsrSpecifier = 0xC02;
    /// Upper 32 bits of [`CYCLE`].
    pub const CYCLEH: CsrSpecifier = 0xC80;
    /// Upper 32 bits of [`INSTRET`].
    pub const INSTRETH: CsrSpecifier = 0xC82;

    /// Hardware thread ID.
    pub const MHARTID: CsrSpecifier = 0xF14;

    /// Machine status register.
    pub const MSTATUS: CsrSpecifier = 0x300;
    /// ISA and extensions.
    pub const MISA: CsrSpecifier = 0x301;
    /// Machine interrupt-enable register.
    pub const MIE: CsrSpecifier = 0x304;
    /// Machine trap-handler base address.
    pub const MTVEC: CsrSpecifier = 0x305;

    /// Scratch register for machine trap handlers.
    pub const MSCRATCH: CsrSpecifier = 0x340;
    /// Machine exception program counter.
    pub const MEPC: CsrSpecifier = 0x341;
    /// Machine trap cause.
    pub const MCAUSE: CsrSpecifier = 0x342;
    /// Machine bad address or instruction.
    pub const MTVAL: CsrSpecifier = 0x343;
    /// Machine interrupt pending.
    pub const MIP: CsrSpecifier = 0x344;

    /// Machine cycle counter.
    pub const MCYCLE: CsrSpecifier = 0xB00;
    /// Machine instructions-retired counter.
    pub const MINSTRET: CsrSpecifier = 0xB02;
    /// Upper 32 bits of [`MCYCLE`].
    pub const MCYCLEH: CsrSpecifier = 0xB80;
    /// Upper 32 bits of [`MINSTRET`].
    pub const MINSTRETH: CsrSpecifier = 0xB82;

    /// Returns `true` if this CSR only supports read access.
    pub fn is_read_only(specifier: CsrSpecifier) -> bool {
        // The top two bits of a CSR specifier indicate whether the CSR is read-only (0b11) or
        // read/write (0b00, 0b01, 0b10)
        specifier >> 10 == 0b11
    }
}
