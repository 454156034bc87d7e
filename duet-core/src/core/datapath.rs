use log::trace;

use super::command::{
    extend_load, Command, CsrCommand, DataSelect, ImmediateFormat, MemoryRequest,
    OperandA, OperandB, PcSelect, Status, UnitSelect,
};
use super::observer::{DebugPort, WritebackObserver};
use super::{Exception, Fault};
use crate::bus::{AccessFault, AccessSize};
use crate::cs_registers::CsRegisters;
use crate::instruction::{b_funct, CsrOp, CsrSource, Fields};
use crate::interrupt::InterruptLines;
use crate::registers::{RegisterFile, Specifier};
use crate::system_bus::SystemBus;
use crate::units::ExecutionUnits;

/// Registers and execution units of the core, driven by one [`Command`] per cycle.
///
/// Within a cycle, every value is computed from the state at the start of the cycle and all
/// registers are updated at the end, like flip-flops on a clock edge. If the command faults,
/// nothing is updated.
#[derive(Debug)]
pub struct Datapath {
    registers: RegisterFile,
    pc: u32,
    /// Instruction register.
    ir: u32,
    /// Address register, holding the effective address of a load or store.
    ad: u32,
    /// Memory data register, holding the last word read from the bus.
    mem_data: u32,
    cs_registers: CsRegisters,
    units: Box<dyn ExecutionUnits>,
    debug_port: DebugPort,
    observers: Vec<Box<dyn WritebackObserver>>,
    reset_vector: u32,
}

impl Datapath {
    pub fn new(units: Box<dyn ExecutionUnits>, reset_vector: u32, debug_register: Specifier) -> Self {
        Self {
            registers: RegisterFile::new(),
            pc: 0,
            ir: 0,
            ad: 0,
            mem_data: 0,
            cs_registers: CsRegisters::new(),
            units,
            debug_port: DebugPort::new(debug_register),
            observers: Vec::new(),
            reset_vector,
        }
    }

    /// Clear all architectural and internal registers. Attached observers are kept.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.pc = 0;
        self.ir = 0;
        self.ad = 0;
        self.mem_data = 0;
        self.cs_registers.reset();
        self.debug_port.clear();
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn cs_registers(&self) -> &CsRegisters {
        &self.cs_registers
    }

    pub fn debug_port(&self) -> &DebugPort {
        &self.debug_port
    }

    pub fn debug_port_mut(&mut self) -> &mut DebugPort {
        &mut self.debug_port
    }

    pub fn attach_observer(&mut self, observer: Box<dyn WritebackObserver>) {
        self.observers.push(observer);
    }

    pub fn count_cycle(&mut self) {
        self.cs_registers.counters_mut().increment_cycle();
    }

    /// Signals for the control state machine, derived from the current register contents and the
    /// interrupt `lines`.
    pub fn status(&self, lines: InterruptLines) -> Status {
        let fields = Fields(self.ir);
        let branch_taken = b_funct(fields)
            .map(|condition| {
                self.units.branch(
                    condition,
                    self.registers.read(fields.rs1()),
                    self.registers.read(fields.rs2()),
                )
            })
            .unwrap_or(false);
        Status {
            pc: self.pc,
            instruction: self.ir,
            branch_taken,
            interrupt: self.cs_registers.pending_interrupt(lines),
        }
    }

    pub fn execute<B: SystemBus>(
        &mut self,
        command: &Command,
        bus: &mut B,
        lines: InterruptLines,
    ) -> Result<(), Fault> {
        let fields = Fields(self.ir);
        let rs1 = self.registers.read(fields.rs1());
        let rs2 = self.registers.read(fields.rs2());
        let unit = self.unit_result(command, fields, rs1, rs2);

        let mut mem_data = self.mem_data;
        match command.memory {
            MemoryRequest::None => {}
            MemoryRequest::Fetch => {
                mem_data = bus
                    .read(self.pc, AccessSize::Word)
                    .map_err(|fault| self.access_fault(fault, AccessKind::Fetch))?;
            }
            MemoryRequest::Read(size) => {
                mem_data = bus
                    .read(self.ad, size)
                    .map_err(|fault| self.access_fault(fault, AccessKind::Load))?;
                trace!(address = self.ad, value = mem_data; "load");
            }
            MemoryRequest::Write(size) => {
                bus.write(self.ad, size, rs2)
                    .map_err(|fault| self.access_fault(fault, AccessKind::Store))?;
                trace!(address = self.ad, value = rs2; "store");
            }
        }

        let mut csr_value = 0;
        let mut csr_target = None;
        match command.csr {
            CsrCommand::None => {}
            CsrCommand::Access { op, source } => {
                // Set and clear with x0 or a zero immediate only read.
                let (value, zero_source) = match source {
                    CsrSource::Register => (rs1, fields.rs1() == Specifier::X0),
                    CsrSource::Immediate => (fields.zimm(), fields.zimm() == 0),
                };
                let write = op == CsrOp::ReadWrite || !zero_source;
                csr_value = self
                    .cs_registers
                    .access(fields.csr(), op, value, write, lines)
                    .map_err(|_| self.fault(Exception::IllegalInstruction, self.ir))?;
            }
            CsrCommand::EnterTrap { cause, tval } => {
                csr_target = Some(self.cs_registers.enter_trap(cause, self.pc, tval));
            }
            CsrCommand::ReturnFromTrap => {
                csr_target = Some(self.cs_registers.return_from_trap());
            }
        }

        let data = match command.data {
            DataSelect::None => None,
            DataSelect::Unit => Some(unit),
            DataSelect::PcPlus4 => Some(self.pc.wrapping_add(4)),
            DataSelect::Load(width) => Some(extend_load(width, self.mem_data)),
            DataSelect::Csr => Some(csr_value),
        };
        if let Some(value) = data {
            self.write_back(fields.rd(), value);
        }

        self.pc = match command.pc {
            PcSelect::Hold => self.pc,
            PcSelect::ResetVector => self.reset_vector,
            PcSelect::Next => self.pc.wrapping_add(4),
            PcSelect::Unit => unit,
            PcSelect::UnitAligned => unit & !1,
            PcSelect::TrapVector | PcSelect::ReturnAddress => match csr_target {
                Some(target) => target,
                None => unreachable!("{:?} requires a trap entry or return", command.pc),
            },
        };

        if command.ad_write {
            self.ad = unit;
        }
        if command.ir_write {
            self.ir = self.mem_data;
        }
        self.mem_data = mem_data;
        if command.retire {
            self.cs_registers.counters_mut().increment_instret();
        }
        Ok(())
    }

    fn unit_result(&self, command: &Command, fields: Fields, rs1: u32, rs2: u32) -> u32 {
        let a = match command.operand_a {
            OperandA::Undefined | OperandA::Zero => 0,
            OperandA::Rs1 => rs1,
            OperandA::Pc => self.pc,
        };
        let b = match command.operand_b {
            OperandB::Undefined => 0,
            OperandB::Rs2 => rs2,
            OperandB::Immediate(format) => immediate(fields, format),
        };
        match command.unit {
            UnitSelect::Undefined => 0,
            UnitSelect::Alu(op) => self.units.alu(op, a, b),
            UnitSelect::Logical(op) => self.units.logical(op, a, b),
            UnitSelect::Shift(op) => self.units.shift(op, a, b),
            UnitSelect::SetLessThan(op) => self.units.compare(op, a, b) as u32,
        }
    }

    fn write_back(&mut self, register: Specifier, value: u32) {
        if !self.registers.write(register, value) {
            return;
        }
        trace!(value = value; "writeback to {register}");
        self.debug_port.observe(register, value);
        for observer in &mut self.observers {
            observer.observe(register, value);
        }
    }

    fn fault(&self, exception: Exception, tval: u32) -> Fault {
        Fault {
            exception,
            pc: self.pc,
            instruction: self.ir,
            tval,
        }
    }

    fn access_fault(&self, fault: AccessFault, kind: AccessKind) -> Fault {
        let exception = match (fault, kind) {
            (AccessFault::Misaligned { .. }, AccessKind::Fetch) => {
                Exception::InstructionAddressMisaligned
            }
            (AccessFault::CrossesBoundary { .. }, AccessKind::Fetch) => {
                Exception::InstructionAccessFault
            }
            (AccessFault::Misaligned { .. }, AccessKind::Load) => Exception::LoadAddressMisaligned,
            (AccessFault::CrossesBoundary { .. }, AccessKind::Load) => Exception::LoadAccessFault,
            (AccessFault::Misaligned { .. }, AccessKind::Store) => {
                Exception::StoreAddressMisaligned
            }
            (AccessFault::CrossesBoundary { .. }, AccessKind::Store) => Exception::StoreAccessFault,
        };
        self.fault(exception, fault.address())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum AccessKind {
    Fetch,
    Load,
    Store,
}

fn immediate(fields: Fields, format: ImmediateFormat) -> u32 {
    (match format {
        ImmediateFormat::I => fields.i_imm(),
        ImmediateFormat::S => fields.s_imm(),
        ImmediateFormat::B => fields.b_imm(),
        ImmediateFormat::U => fields.u_imm(),
        ImmediateFormat::J => fields.j_imm(),
    }) as u32
}
