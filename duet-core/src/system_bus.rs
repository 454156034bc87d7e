use crate::bus::{AccessFault, AccessSize};
use crate::interrupt::InterruptLines;
use std::fmt::Debug;

/// The master interface a core sees: sized accesses to the whole physical address space, plus the
/// interrupt lines of the platform.
///
/// Unmapped addresses are not an error: reads return `0` and writes are dropped. Values are
/// zero-extended to 32 bits on reads, and only the low `size` bytes of `value` are written.
pub trait SystemBus: Debug {
    fn read(&mut self, address: u32, size: AccessSize) -> Result<u32, AccessFault>;

    /// Like [`read`](Self::read), but without read side effects.
    fn read_debug(&self, address: u32, size: AccessSize) -> Result<u32, AccessFault>;

    fn write(&mut self, address: u32, size: AccessSize, value: u32) -> Result<(), AccessFault>;

    /// Current level of the interrupt request lines.
    fn interrupt_lines(&self) -> InterruptLines;
}
