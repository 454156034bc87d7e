//! The records exchanged between the control state machine and the datapath every cycle.
//!
//! Every selector is a closed enum. Where a selector has no meaningful value for a state, it is
//! set to its explicit `Undefined`/`None`/`Hold` variant rather than left to a default.

use crate::bus::AccessSize;
use crate::core::trap::TrapCause;
use crate::instruction::{CsrOp, CsrSource, LoadWidth, StoreWidth};
use crate::interrupt::Interrupt;
use crate::units::{AluOp, CompareOp, LogicalOp, ShiftOp};

/// Micro-operations the datapath performs in a single cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Command {
    /// Execution unit driving the unit result.
    pub unit: UnitSelect,
    pub operand_a: OperandA,
    pub operand_b: OperandB,
    /// Value written back to the destination register of the instruction register.
    pub data: DataSelect,
    pub pc: PcSelect,
    /// Latch the unit result into the address register.
    pub ad_write: bool,
    /// Latch the memory data register into the instruction register.
    pub ir_write: bool,
    pub memory: MemoryRequest,
    pub csr: CsrCommand,
    /// The instruction completes in this cycle and counts as retired.
    pub retire: bool,
}

impl Command {
    /// The command that changes nothing.
    pub const IDLE: Self = Self {
        unit: UnitSelect::Undefined,
        operand_a: OperandA::Undefined,
        operand_b: OperandB::Undefined,
        data: DataSelect::None,
        pc: PcSelect::Hold,
        ad_write: false,
        ir_write: false,
        memory: MemoryRequest::None,
        csr: CsrCommand::None,
        retire: false,
    };
}

impl Default for Command {
    fn default() -> Self {
        Self::IDLE
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnitSelect {
    /// No unit is used; the unit result is zero.
    Undefined,
    Alu(AluOp),
    Logical(LogicalOp),
    /// Operand A is shifted by operand B.
    Shift(ShiftOp),
    /// Produces `1` if the comparison holds and `0` otherwise.
    SetLessThan(CompareOp),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OperandA {
    Undefined,
    Rs1,
    Pc,
    Zero,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OperandB {
    Undefined,
    Rs2,
    Immediate(ImmediateFormat),
}

/// Which instruction format the immediate operand is decoded with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImmediateFormat {
    I,
    S,
    B,
    U,
    J,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataSelect {
    /// No register is written.
    None,
    Unit,
    PcPlus4,
    /// The memory data register, extended according to the load width.
    Load(LoadWidth),
    /// The value the CSR held before the access.
    Csr,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PcSelect {
    Hold,
    ResetVector,
    /// `pc + 4`
    Next,
    Unit,
    /// The unit result with bit 0 cleared, for JALR.
    UnitAligned,
    /// The address produced by trap entry.
    TrapVector,
    /// The address produced by MRET.
    ReturnAddress,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemoryRequest {
    None,
    /// Read the word at `pc` into the memory data register.
    Fetch,
    /// Read at the address held in the address register into the memory data register.
    Read(AccessSize),
    /// Write `rs2` at the address held in the address register.
    Write(AccessSize),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrCommand {
    None,
    /// Read-modify-write of the CSR addressed by the instruction register.
    Access { op: CsrOp, source: CsrSource },
    EnterTrap { cause: TrapCause, tval: u32 },
    ReturnFromTrap,
}

/// Signals the datapath reports to the control state machine.
///
/// Sampled at the start of every cycle to pick the command, and once more after an instruction
/// commits to decide where the instruction boundary leads.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Status {
    pub pc: u32,
    /// Content of the instruction register.
    pub instruction: u32,
    /// Comparator output for the branch condition encoded in the instruction register.
    pub branch_taken: bool,
    /// Interrupt that is pending, enabled in mie, and globally enabled, if any.
    pub interrupt: Option<Interrupt>,
}

pub fn load_size(width: LoadWidth) -> AccessSize {
    match width {
        LoadWidth::Lb | LoadWidth::Lbu => AccessSize::Byte,
        LoadWidth::Lh | LoadWidth::Lhu => AccessSize::Half,
        LoadWidth::Lw => AccessSize::Word,
    }
}

pub fn store_size(width: StoreWidth) -> AccessSize {
    match width {
        StoreWidth::Sb => AccessSize::Byte,
        StoreWidth::Sh => AccessSize::Half,
        StoreWidth::Sw => AccessSize::Word,
    }
}

/// Extend a loaded value to 32 bits according to `width`.
pub fn extend_load(width: LoadWidth, value: u32) -> u32 {
    match width {
        LoadWidth::Lb => value as u8 as i8 as i32 as u32,
        LoadWidth::Lh => value as u16 as i16 as i32 as u32,
        LoadWidth::Lw => value,
        LoadWidth::Lbu => value & 0xFF,
        LoadWidth::Lhu => value & 0xFFFF,
    }
}
