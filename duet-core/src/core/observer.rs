use crate::registers::Specifier;
use std::fmt::Debug;

/// Hook on the register writeback path.
///
/// Called once for every write to an `x` register other than `x0`, even if the value is unchanged.
pub trait WritebackObserver: Debug {
    fn observe(&mut self, register: Specifier, value: u32);
}

/// Collects every value written to one register.
///
/// Test programs use this as their output channel: each write to the register appends a word to
/// the stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DebugPort {
    register: Specifier,
    output: Vec<u32>,
}

impl DebugPort {
    pub fn new(register: Specifier) -> Self {
        Self {
            register,
            output: Vec::new(),
        }
    }

    pub fn register(&self) -> Specifier {
        self.register
    }

    pub fn output(&self) -> &[u32] {
        &self.output
    }

    /// Drain the values collected so far.
    pub fn take(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.output)
    }

    pub fn clear(&mut self) {
        self.output.clear();
    }
}

impl WritebackObserver for DebugPort {
    fn observe(&mut self, register: Specifier, value: u32) {
        if register == self.register {
            self.output.push(value);
        }
    }
}
