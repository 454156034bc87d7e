//! The control state machine.
//!
//! [`transition`] is a pure function: given the current state and the status the datapath reports
//! at the start of a cycle, it returns the next state and the command the datapath executes in
//! that cycle. All side effects live in the datapath.
//!
//! The last state of an instruction leads to an instruction boundary. Where the boundary goes is
//! decided by [`boundary`] from the status sampled after the instruction has committed, so that an
//! instruction that changes mstatus, mie or a device is already accounted for.

use super::command::{
    load_size, store_size, Command, CsrCommand, DataSelect, ImmediateFormat, MemoryRequest,
    OperandA, OperandB, PcSelect, Status, UnitSelect,
};
use super::{Config, Exception, Fault, FaultPolicy};
use crate::instruction::{
    BranchCondition, CsrOp, CsrSource, Instruction, LoadWidth, RegImmOp, RegRegOp, RegShiftImmOp,
    StoreWidth,
};
use crate::interrupt::Interrupt;
use crate::units::{AluOp, CompareOp, LogicalOp, ShiftOp};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum State {
    /// Load the reset vector into the program counter.
    Init,
    /// Read the instruction word at `pc`.
    PreFetch,
    /// Latch the word read in [`PreFetch`](Self::PreFetch) into the instruction register.
    Fetch,
    /// Select the instruction state from the instruction register.
    Decode,
    Lui,
    Auipc,
    Jal,
    Jalr,
    Branch(BranchCondition),
    /// Compute the effective address.
    Load(LoadWidth),
    /// Read memory at the effective address.
    LoadAccess(LoadWidth),
    /// Write the extended value to the destination register.
    LoadWriteback(LoadWidth),
    /// Compute the effective address.
    Store(StoreWidth),
    /// Write memory at the effective address.
    StoreAccess(StoreWidth),
    OpImm(RegImmOp),
    OpShiftImm(RegShiftImmOp),
    Op(RegRegOp),
    Csr(CsrOp, CsrSource),
    Fence,
    Ecall,
    Ebreak,
    Mret,
    InterruptEntry(Interrupt),
    Error(Fault),
    /// Terminal state reached through EBREAK.
    Halted,
}

impl State {
    /// Returns `true` if the simulation cannot make progress from this state.
    pub fn is_halted(&self, config: &Config) -> bool {
        match self {
            Self::Halted => true,
            Self::Error(_) => config.fault_policy == FaultPolicy::Halt,
            _ => false,
        }
    }
}

/// Compute the next state and the command for the current cycle.
pub fn transition(state: State, status: &Status, config: &Config) -> (State, Command) {
    match state {
        State::Init => (
            State::PreFetch,
            Command {
                pc: PcSelect::ResetVector,
                ..Command::IDLE
            },
        ),
        State::PreFetch => (
            State::Fetch,
            Command {
                memory: MemoryRequest::Fetch,
                ..Command::IDLE
            },
        ),
        State::Fetch => (
            State::Decode,
            Command {
                ir_write: true,
                ..Command::IDLE
            },
        ),
        State::Decode => (decode(status), Command::IDLE),
        State::Lui => complete(Command {
            unit: UnitSelect::Alu(AluOp::Add),
            operand_a: OperandA::Zero,
            operand_b: OperandB::Immediate(ImmediateFormat::U),
            data: DataSelect::Unit,
            pc: PcSelect::Next,
            ..Command::IDLE
        }),
        State::Auipc => complete(Command {
            unit: UnitSelect::Alu(AluOp::Add),
            operand_a: OperandA::Pc,
            operand_b: OperandB::Immediate(ImmediateFormat::U),
            data: DataSelect::Unit,
            pc: PcSelect::Next,
            ..Command::IDLE
        }),
        State::Jal => complete(Command {
            unit: UnitSelect::Alu(AluOp::Add),
            operand_a: OperandA::Pc,
            operand_b: OperandB::Immediate(ImmediateFormat::J),
            data: DataSelect::PcPlus4,
            pc: PcSelect::Unit,
            ..Command::IDLE
        }),
        State::Jalr => complete(Command {
            unit: UnitSelect::Alu(AluOp::Add),
            operand_a: OperandA::Rs1,
            operand_b: OperandB::Immediate(ImmediateFormat::I),
            data: DataSelect::PcPlus4,
            pc: PcSelect::UnitAligned,
            ..Command::IDLE
        }),
        // The target is always computed; the comparator alone decides whether it is taken.
        State::Branch(_) => complete(Command {
            unit: UnitSelect::Alu(AluOp::Add),
            operand_a: OperandA::Pc,
            operand_b: OperandB::Immediate(ImmediateFormat::B),
            pc: if status.branch_taken {
                PcSelect::Unit
            } else {
                PcSelect::Next
            },
            ..Command::IDLE
        }),
        State::Load(width) => (
            State::LoadAccess(width),
            effective_address(ImmediateFormat::I),
        ),
        State::LoadAccess(width) => (
            State::LoadWriteback(width),
            Command {
                memory: MemoryRequest::Read(load_size(width)),
                ..Command::IDLE
            },
        ),
        State::LoadWriteback(width) => complete(Command {
            data: DataSelect::Load(width),
            pc: PcSelect::Next,
            ..Command::IDLE
        }),
        State::Store(width) => (
            State::StoreAccess(width),
            effective_address(ImmediateFormat::S),
        ),
        State::StoreAccess(width) => complete(Command {
            memory: MemoryRequest::Write(store_size(width)),
            pc: PcSelect::Next,
            ..Command::IDLE
        }),
        State::OpImm(op) => complete(register_op(
            reg_imm_unit(op),
            OperandB::Immediate(ImmediateFormat::I),
        )),
        State::OpShiftImm(op) => complete(register_op(
            reg_shift_imm_unit(op),
            OperandB::Immediate(ImmediateFormat::I),
        )),
        State::Op(op) => complete(register_op(reg_reg_unit(op), OperandB::Rs2)),
        State::Csr(op, source) => complete(Command {
            data: DataSelect::Csr,
            pc: PcSelect::Next,
            csr: CsrCommand::Access { op, source },
            ..Command::IDLE
        }),
        State::Fence => complete(Command {
            pc: PcSelect::Next,
            ..Command::IDLE
        }),
        State::Ecall => (
            State::PreFetch,
            trap_entry(Exception::EnvironmentCallFromMMode.into(), 0),
        ),
        State::Ebreak => (State::Halted, Command::IDLE),
        State::Mret => complete(Command {
            pc: PcSelect::ReturnAddress,
            csr: CsrCommand::ReturnFromTrap,
            ..Command::IDLE
        }),
        State::InterruptEntry(interrupt) => (State::PreFetch, trap_entry(interrupt.into(), 0)),
        State::Error(fault) => match config.fault_policy {
            FaultPolicy::Halt => (state, Command::IDLE),
            FaultPolicy::Trap => (
                State::PreFetch,
                trap_entry(fault.exception.into(), fault.tval),
            ),
        },
        State::Halted => (state, Command::IDLE),
    }
}

/// Select the instruction state for the word in the instruction register.
fn decode(status: &Status) -> State {
    let Ok(instruction) = Instruction::decode(status.instruction) else {
        return State::Error(Fault {
            exception: Exception::IllegalInstruction,
            pc: status.pc,
            instruction: status.instruction,
            tval: status.instruction,
        });
    };
    match instruction {
        Instruction::OpImm(op) => State::OpImm(op),
        Instruction::OpShiftImm(op) => State::OpShiftImm(op),
        Instruction::Auipc => State::Auipc,
        Instruction::Lui => State::Lui,
        Instruction::Op(op) => State::Op(op),
        Instruction::Jal => State::Jal,
        Instruction::Jalr => State::Jalr,
        Instruction::Branch(condition) => State::Branch(condition),
        Instruction::Load(width) => State::Load(width),
        Instruction::Store(width) => State::Store(width),
        Instruction::Csr(op, source) => State::Csr(op, source),
        Instruction::Fence => State::Fence,
        Instruction::Ecall => State::Ecall,
        Instruction::Ebreak => State::Ebreak,
        Instruction::Mret => State::Mret,
    }
}

/// Last state of an instruction: retire it. The state returned is only provisional, see
/// [`boundary`].
fn complete(command: Command) -> (State, Command) {
    (
        State::PreFetch,
        Command {
            retire: true,
            ..command
        },
    )
}

/// State following an instruction boundary, given the status after the instruction committed.
pub fn boundary(status: &Status) -> State {
    match status.interrupt {
        Some(interrupt) => State::InterruptEntry(interrupt),
        None => State::PreFetch,
    }
}

fn effective_address(format: ImmediateFormat) -> Command {
    Command {
        unit: UnitSelect::Alu(AluOp::Add),
        operand_a: OperandA::Rs1,
        operand_b: OperandB::Immediate(format),
        ad_write: true,
        ..Command::IDLE
    }
}

fn register_op(unit: UnitSelect, operand_b: OperandB) -> Command {
    Command {
        unit,
        operand_a: OperandA::Rs1,
        operand_b,
        data: DataSelect::Unit,
        pc: PcSelect::Next,
        ..Command::IDLE
    }
}

fn trap_entry(cause: super::trap::TrapCause, tval: u32) -> Command {
    Command {
        pc: PcSelect::TrapVector,
        csr: CsrCommand::EnterTrap { cause, tval },
        ..Command::IDLE
    }
}

fn reg_imm_unit(op: RegImmOp) -> UnitSelect {
    match op {
        RegImmOp::Addi => UnitSelect::Alu(AluOp::Add),
        RegImmOp::Slti => UnitSelect::SetLessThan(CompareOp::Lt),
        RegImmOp::Sltiu => UnitSelect::SetLessThan(CompareOp::Ltu),
        RegImmOp::Xori => UnitSelect::Logical(LogicalOp::Xor),
        RegImmOp::Ori => UnitSelect::Logical(LogicalOp::Or),
        RegImmOp::Andi => UnitSelect::Logical(LogicalOp::And),
    }
}

fn reg_shift_imm_unit(op: RegShiftImmOp) -> UnitSelect {
    match op {
        RegShiftImmOp::Slli => UnitSelect::Shift(ShiftOp::Sll),
        RegShiftImmOp::Srli => UnitSelect::Shift(ShiftOp::Srl),
        RegShiftImmOp::Srai => UnitSelect::Shift(ShiftOp::Sra),
    }
}

fn reg_reg_unit(op: RegRegOp) -> UnitSelect {
    match op {
        RegRegOp::Add => UnitSelect::Alu(AluOp::Add),
        RegRegOp::Sub => UnitSelect::Alu(AluOp::Sub),
        RegRegOp::Slt => UnitSelect::SetLessThan(CompareOp::Lt),
        RegRegOp::Sltu => UnitSelect::SetLessThan(CompareOp::Ltu),
        RegRegOp::And => UnitSelect::Logical(LogicalOp::And),
        RegRegOp::Or => UnitSelect::Logical(LogicalOp::Or),
        RegRegOp::Xor => UnitSelect::Logical(LogicalOp::Xor),
        RegRegOp::Sll => UnitSelect::Shift(ShiftOp::Sll),
        RegRegOp::Srl => UnitSelect::Shift(ShiftOp::Srl),
        RegRegOp::Sra => UnitSelect::Shift(ShiftOp::Sra),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(instruction: u32) -> Status {
        Status {
            pc: 0x1000,
            instruction,
            branch_taken: false,
            interrupt: None,
        }
    }

    #[test]
    fn test_fetch_sequence() {
        let config = Config::default();
        let s = status(0);
        let (next, command) = transition(State::Init, &s, &config);
        assert_eq!(State::PreFetch, next);
        assert_eq!(PcSelect::ResetVector, command.pc);
        let (next, command) = transition(next, &s, &config);
        assert_eq!(State::Fetch, next);
        assert_eq!(MemoryRequest::Fetch, command.memory);
        let (next, command) = transition(next, &s, &config);
        assert_eq!(State::Decode, next);
        assert!(command.ir_write);
    }

    #[test]
    fn test_decode_selects_state() {
        let config = Config::default();
        // lw x1, 0(x2)
        let (next, command) = transition(State::Decode, &status(0x0001_2083), &config);
        assert_eq!(State::Load(LoadWidth::Lw), next);
        assert_eq!(Command::IDLE, command);
        // csrrsi x0, mstatus, 8
        let (next, _) = transition(State::Decode, &status(0x3004_6073), &config);
        assert_eq!(State::Csr(CsrOp::ReadSet, CsrSource::Immediate), next);
    }

    #[test]
    fn test_illegal_instruction_faults() {
        let config = Config::default();
        let (next, _) = transition(State::Decode, &status(0xFFFF_FFFF), &config);
        let State::Error(fault) = next else {
            panic!("expected error state, got {next:?}");
        };
        assert_eq!(Exception::IllegalInstruction, fault.exception);
        assert_eq!(0x1000, fault.pc);
        assert!(next.is_halted(&config));

        let (again, command) = transition(next, &status(0xFFFF_FFFF), &config);
        assert_eq!(next, again);
        assert_eq!(Command::IDLE, command);
    }

    #[test]
    fn test_fault_trap_policy() {
        let config = Config {
            fault_policy: FaultPolicy::Trap,
            ..Config::default()
        };
        let (error, _) = transition(State::Decode, &status(0xFFFF_FFFF), &config);
        assert!(!error.is_halted(&config));
        let (next, command) = transition(error, &status(0xFFFF_FFFF), &config);
        assert_eq!(State::PreFetch, next);
        assert_eq!(PcSelect::TrapVector, command.pc);
        assert_eq!(
            CsrCommand::EnterTrap {
                cause: Exception::IllegalInstruction.into(),
                tval: 0xFFFF_FFFF
            },
            command.csr
        );
    }

    #[test]
    fn test_branch_selects_on_comparator() {
        let config = Config::default();
        let mut s = status(0);
        let (_, command) = transition(State::Branch(BranchCondition::Beq), &s, &config);
        assert_eq!(PcSelect::Next, command.pc);
        assert_eq!(UnitSelect::Alu(AluOp::Add), command.unit);
        s.branch_taken = true;
        let (_, command) = transition(State::Branch(BranchCondition::Beq), &s, &config);
        assert_eq!(PcSelect::Unit, command.pc);
        assert!(command.retire);
    }

    #[test]
    fn test_interrupt_checked_at_boundary_only() {
        let config = Config::default();
        let mut s = status(0);
        s.interrupt = Some(Interrupt::MachineTimer);

        let (next, command) = transition(State::Load(LoadWidth::Lw), &s, &config);
        assert_eq!(State::LoadAccess(LoadWidth::Lw), next);
        assert!(!command.retire);
        let (next, _) = transition(State::PreFetch, &s, &config);
        assert_eq!(State::Fetch, next);

        // The final state retires; the pending interrupt is left to the boundary.
        let (next, command) = transition(State::Op(RegRegOp::Add), &s, &config);
        assert_eq!(State::PreFetch, next);
        assert!(command.retire);

        let next = boundary(&s);
        assert_eq!(State::InterruptEntry(Interrupt::MachineTimer), next);
        let (next, command) = transition(next, &s, &config);
        assert_eq!(State::PreFetch, next);
        assert!(!command.retire);
        assert_eq!(
            CsrCommand::EnterTrap {
                cause: Interrupt::MachineTimer.into(),
                tval: 0
            },
            command.csr
        );
    }

    #[test]
    fn test_boundary_without_interrupt_fetches() {
        assert_eq!(State::PreFetch, boundary(&status(0)));
    }

    #[test]
    fn test_ebreak_halts() {
        let config = Config::default();
        let (next, _) = transition(State::Ebreak, &status(0), &config);
        assert_eq!(State::Halted, next);
        assert!(next.is_halted(&config));
        assert_eq!(
            (State::Halted, Command::IDLE),
            transition(next, &status(0), &config)
        );
    }
}
