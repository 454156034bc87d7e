//! Provides a simulatable, multi-cycle RV32I core implementation.
//!
//! The core is split into a control state machine ([`control`]) and a [`Datapath`]. Every tick the
//! datapath reports its [`Status`](command::Status), the state machine answers with a
//! [`Command`](command::Command), and the datapath executes it. When the command retires an
//! instruction, the status is sampled once more to choose between the next fetch and an interrupt.

pub mod command;
pub mod control;
pub mod counters;
mod datapath;
pub mod interrupts;
pub mod observer;
pub mod status;
pub mod trap;

use crate::cs_registers::CsRegisters;
use crate::registers::{RegisterFile, Specifier};
use crate::simulator::Simulatable;
use crate::system_bus::SystemBus;
use crate::units::{ExecutionUnits, Golden};
use control::State;
use datapath::Datapath;
use log::{info, trace, warn};
use observer::WritebackObserver;
use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// Address to which the core's PC register is reset.
    pub reset_vector: u32,
    /// What happens when an instruction faults.
    pub fault_policy: FaultPolicy,
    /// Register whose writes are collected as debug output.
    pub debug_register: Specifier,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_vector: 0x0000_1000,
            fault_policy: FaultPolicy::Halt,
            debug_register: Specifier::X31,
        }
    }
}

/// Behavior of the core on an illegal instruction or a faulting memory access.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum FaultPolicy {
    /// Stop in the error state and report the fault through [`Core::fault`].
    #[default]
    Halt,
    /// Take a synchronous exception trap to mtvec and continue.
    Trap,
}

/// RV32I core with a single hart, executing one micro-step of an instruction per tick.
#[derive(Debug)]
pub struct Core<B: SystemBus> {
    config: Config,
    state: State,
    datapath: Datapath,
    system_bus: B,
}

impl<B: SystemBus> Core<B> {
    pub fn new(system_bus: B, config: Config) -> Self {
        Self::with_units(system_bus, config, Box::new(Golden))
    }

    /// Create a core whose datapath evaluates its execution units through `units`.
    pub fn with_units(system_bus: B, config: Config, units: Box<dyn ExecutionUnits>) -> Self {
        let datapath = Datapath::new(units, config.reset_vector, config.debug_register);
        Self {
            config,
            state: State::Init,
            datapath,
            system_bus,
        }
    }

    /// Force this core to its reset state.
    pub fn reset(&mut self) {
        self.state = State::Init;
        self.datapath.reset();
    }

    /// Provide a read-only view of this core's configuration.
    ///
    /// It is not possible to modify the configuration after creation.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted(&self.config)
    }

    /// The fault the core is stopped on, if any.
    pub fn fault(&self) -> Option<Fault> {
        match self.state {
            State::Error(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn registers(&self) -> &RegisterFile {
        self.datapath.registers()
    }

    pub fn pc(&self) -> u32 {
        self.datapath.pc()
    }

    pub fn cs_registers(&self) -> &CsRegisters {
        self.datapath.cs_registers()
    }

    pub fn debug_output(&self) -> &[u32] {
        self.datapath.debug_port().output()
    }

    pub fn take_debug_output(&mut self) -> Vec<u32> {
        self.datapath.debug_port_mut().take()
    }

    /// Attach an additional observer to the register writeback path.
    pub fn attach_observer(&mut self, observer: Box<dyn WritebackObserver>) {
        self.datapath.attach_observer(observer);
    }

    pub fn system_bus(&self) -> &B {
        &self.system_bus
    }

    pub fn system_bus_mut(&mut self) -> &mut B {
        &mut self.system_bus
    }

    /// Advance the core by one clock cycle. Does nothing once halted.
    pub fn tick(&mut self) {
        if self.is_halted() {
            return;
        }
        let lines = self.system_bus.interrupt_lines();
        let status = self.datapath.status(lines);
        let (next, command) = control::transition(self.state, &status, &self.config);
        self.datapath.count_cycle();
        let next = match self.datapath.execute(&command, &mut self.system_bus, lines) {
            Ok(()) if command.retire => {
                // Sample again now that the instruction and its bus access have committed.
                let lines = self.system_bus.interrupt_lines();
                control::boundary(&self.datapath.status(lines))
            }
            Ok(()) => next,
            Err(fault) => State::Error(fault),
        };
        self.enter(next);
    }

    fn enter(&mut self, next: State) {
        if next == self.state {
            return;
        }
        trace!(pc = self.datapath.pc(); "{:?} -> {:?}", self.state, next);
        match next {
            State::Error(fault) => warn!(
                pc = fault.pc,
                instruction = fault.instruction,
                tval = fault.tval;
                "{}", fault.exception
            ),
            State::Halted => info!(pc = self.datapath.pc(); "halted"),
            _ => {}
        }
        self.state = next;
    }
}

impl<B: SystemBus> Simulatable for Core<B> {
    fn tick(&mut self) {
        Core::tick(self)
    }

    fn reset(&mut self) {
        Core::reset(self)
    }

    fn is_halted(&self) -> bool {
        Core::is_halted(self)
    }
}

/// A synchronous exception raised while executing an instruction.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Exception {
    /// Instruction address is not on a four-byte aligned boundary in memory.
    #[error("instruction address misaligned")]
    InstructionAddressMisaligned,
    #[error("instruction access fault")]
    InstructionAccessFault,
    /// Raised for reserved or unsupported encodings, unsupported CSRs, and writes to read-only
    /// CSRs.
    #[error("illegal instruction")]
    IllegalInstruction,
    #[error("load address misaligned")]
    LoadAddressMisaligned,
    #[error("load access fault")]
    LoadAccessFault,
    #[error("store address misaligned")]
    StoreAddressMisaligned,
    #[error("store access fault")]
    StoreAccessFault,
    #[error("environment call from M-mode")]
    EnvironmentCallFromMMode,
}

impl Exception {
    /// Returns the exception code (cause) for this exception.
    pub fn code(&self) -> u32 {
        match self {
            Self::InstructionAddressMisaligned => 0,
            Self::InstructionAccessFault => 1,
            Self::IllegalInstruction => 2,
            Self::LoadAddressMisaligned => 4,
            Self::LoadAccessFault => 5,
            Self::StoreAddressMisaligned => 6,
            Self::StoreAccessFault => 7,
            Self::EnvironmentCallFromMMode => 11,
        }
    }
}

/// An exception together with where it happened.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
#[error("{exception} at pc {pc:#010x} (instruction {instruction:#010x}, tval {tval:#010x})")]
pub struct Fault {
    pub exception: Exception,
    /// Address of the faulting instruction.
    pub pc: u32,
    /// Content of the instruction register when the fault was raised.
    pub instruction: u32,
    /// Faulting address for memory faults, the instruction word for illegal instructions.
    pub tval: u32,
}
