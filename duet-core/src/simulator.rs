use crate::board::Board;
use crate::bus::{AccessFault, AccessSize};
use crate::core::Fault;
use crate::registers::Specifier;
use crate::system_bus::SystemBus;
use log::{info, trace};
use std::fmt::Debug;

/// Trait for types that can be simulated by [`Simulator`].
pub trait Simulatable: Debug {
    /// Advance the simulation one tick. This operation should be deterministic.
    fn tick(&mut self);

    /// Force the simulatable back to its reset state.
    fn reset(&mut self);

    /// Returns `true` once ticking no longer changes any state.
    fn is_halted(&self) -> bool;
}

/// How a call to [`Simulator::run`] ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RunOutcome {
    /// The simulatable halted after `cycles` cycles of this run.
    Halted { cycles: u64 },
    /// The whole cycle budget was consumed without halting.
    BudgetExhausted,
}

/// A simulator can simulate any `Simulatable`, counting the cycles it has been advanced.
#[derive(Debug)]
pub struct Simulator<S: Simulatable> {
    /// The object that's being simulated.
    simulatable: S,
    cycles: u64,
}

impl<S: Simulatable> Simulator<S> {
    /// Wrap `simulatable`, which is expected to be in its reset state.
    pub fn new(simulatable: S) -> Self {
        Self {
            simulatable,
            cycles: 0,
        }
    }

    pub fn simulatable(&self) -> &S {
        &self.simulatable
    }

    pub fn simulatable_mut(&mut self) -> &mut S {
        &mut self.simulatable
    }

    pub fn into_inner(self) -> S {
        self.simulatable
    }

    /// Number of cycles simulated since creation or the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_halted(&self) -> bool {
        self.simulatable.is_halted()
    }

    /// Reset the simulatable and the cycle count.
    pub fn reset(&mut self) {
        self.simulatable.reset();
        self.cycles = 0;
    }

    /// Advance up to `n` cycles, stopping early if the simulatable halts.
    ///
    /// Returns the number of cycles actually simulated.
    pub fn step(&mut self, n: u64) -> u64 {
        let mut consumed = 0;
        while consumed < n && !self.simulatable.is_halted() {
            self.simulatable.tick();
            consumed += 1;
        }
        self.cycles += consumed;
        trace!(requested = n, consumed = consumed; "stepped");
        consumed
    }

    /// Run until the simulatable halts or `budget` cycles have been simulated.
    pub fn run(&mut self, budget: u64) -> RunOutcome {
        let consumed = self.step(budget);
        if self.simulatable.is_halted() {
            info!(cycles = consumed; "halted");
            RunOutcome::Halted { cycles: consumed }
        } else {
            info!(cycles = consumed; "cycle budget exhausted");
            RunOutcome::BudgetExhausted
        }
    }
}

/// Host-side inspection and stimulus of a [`Board`].
impl Simulator<Board> {
    pub fn read_register(&self, register: Specifier) -> u32 {
        self.simulatable.core().registers().read(register)
    }

    pub fn pc(&self) -> u32 {
        self.simulatable.core().pc()
    }

    /// Read memory without side effects on the devices.
    pub fn read_memory(&self, address: u32, size: AccessSize) -> Result<u32, AccessFault> {
        self.simulatable.interconnect().read_debug(address, size)
    }

    /// Raise PLIC interrupt `source`. It stays pending until claimed.
    pub fn inject_interrupt(&mut self, source: u32) {
        self.simulatable.interconnect_mut().plic_mut().trigger(source);
    }

    pub fn debug_output(&self) -> &[u32] {
        self.simulatable.core().debug_output()
    }

    pub fn take_debug_output(&mut self) -> Vec<u32> {
        self.simulatable.core_mut().take_debug_output()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.simulatable.core().fault()
    }

    pub fn set_switches(&mut self, switches: u32) {
        self.simulatable
            .interconnect_mut()
            .leds_mut()
            .set_switches(switches);
    }

    pub fn set_push_buttons(&mut self, buttons: u8) {
        self.simulatable
            .interconnect_mut()
            .buttons_mut()
            .set_buttons(buttons);
    }

    pub fn leds(&self) -> u32 {
        self.simulatable.interconnect().leds().leds()
    }
}
