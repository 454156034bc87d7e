//! Interrupt sources visible to the core.

/// Machine-level interrupts the core can take, in decreasing priority order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Interrupt {
    /// Raised by the PLIC while a pending source is enabled.
    MachineExternal,
    /// Raised by the CLINT while `mtime >= mtimecmp`.
    MachineTimer,
}

impl Interrupt {
    /// All interrupts, highest priority first.
    pub const BY_PRIORITY: [Self; 2] = [Self::MachineExternal, Self::MachineTimer];

    /// Returns the exception code (cause) for this interrupt, which is also its bit index in the
    /// `mip` and `mie` registers.
    pub fn code(self) -> u32 {
        match self {
            Self::MachineTimer => 7,
            Self::MachineExternal => 11,
        }
    }
}

/// Snapshot of the interrupt request lines driven by the platform devices.
///
/// These are level signals: they are recomputed from device state every time they are sampled and
/// are never latched by the core.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct InterruptLines {
    pub external: bool,
    pub timer: bool,
}

impl InterruptLines {
    pub fn is_raised(self, interrupt: Interrupt) -> bool {
        match interrupt {
            Interrupt::MachineExternal => self.external,
            Interrupt::MachineTimer => self.timer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(7, Interrupt::MachineTimer.code());
        assert_eq!(11, Interrupt::MachineExternal.code());
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(Interrupt::MachineExternal, Interrupt::BY_PRIORITY[0]);
        let lines = InterruptLines {
            external: false,
            timer: true,
        };
        assert!(lines.is_raised(Interrupt::MachineTimer));
        assert!(!lines.is_raised(Interrupt::MachineExternal));
    }
}
