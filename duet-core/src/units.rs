//! Combinational execution units of the datapath.
//!
//! Every unit is a pure function of its operands. The datapath does not call these directly but
//! goes through an [`ExecutionUnits`] implementation, which lets tests swap in a faulty unit and
//! check that a program notices.

use crate::instruction::BranchCondition;
use std::fmt::Debug;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AluOp {
    Add,
    Sub,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShiftOp {
    /// Shift left logical.
    Sll,
    /// Shift right logical.
    Srl,
    /// Shift right arithmetic.
    Sra,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    /// Signed less than.
    Lt,
    /// Unsigned less than.
    Ltu,
}

/// Wrapping add/subtract.
pub fn alu(op: AluOp, a: u32, b: u32) -> u32 {
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
    }
}

pub fn logical(op: LogicalOp, a: u32, b: u32) -> u32 {
    match op {
        LogicalOp::And => a & b,
        LogicalOp::Or => a | b,
        LogicalOp::Xor => a ^ b,
    }
}

/// Only the low 5 bits of `amount` are used.
pub fn shift(op: ShiftOp, value: u32, amount: u32) -> u32 {
    let amount = amount & 0x1F;
    match op {
        ShiftOp::Sll => value << amount,
        ShiftOp::Srl => value >> amount,
        ShiftOp::Sra => (value as i32 >> amount) as u32,
    }
}

pub fn compare(op: CompareOp, a: u32, b: u32) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Lt => (a as i32) < (b as i32),
        CompareOp::Ltu => a < b,
    }
}

/// Returns the comparison a branch condition is built from, and whether its outcome is inverted.
pub fn branch_comparison(condition: BranchCondition) -> (CompareOp, bool) {
    match condition {
        BranchCondition::Beq => (CompareOp::Eq, false),
        BranchCondition::Bne => (CompareOp::Eq, true),
        BranchCondition::Blt => (CompareOp::Lt, false),
        BranchCondition::Bge => (CompareOp::Lt, true),
        BranchCondition::Bltu => (CompareOp::Ltu, false),
        BranchCondition::Bgeu => (CompareOp::Ltu, true),
    }
}

/// Strategy through which the datapath evaluates its execution units.
///
/// All methods default to the pure unit functions of this module. Override a single method to
/// inject a fault into that unit.
pub trait ExecutionUnits: Debug {
    fn alu(&self, op: AluOp, a: u32, b: u32) -> u32 {
        alu(op, a, b)
    }

    fn logical(&self, op: LogicalOp, a: u32, b: u32) -> u32 {
        logical(op, a, b)
    }

    fn shift(&self, op: ShiftOp, value: u32, amount: u32) -> u32 {
        shift(op, value, amount)
    }

    fn compare(&self, op: CompareOp, a: u32, b: u32) -> bool {
        compare(op, a, b)
    }

    /// Evaluate a branch condition using [`compare`](Self::compare).
    fn branch(&self, condition: BranchCondition, a: u32, b: u32) -> bool {
        let (op, negate) = branch_comparison(condition);
        self.compare(op, a, b) != negate
    }
}

/// The reference implementation of every unit.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Golden;

impl ExecutionUnits for Golden {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alu_wraps() {
        assert_eq!(0, alu(AluOp::Add, u32::MAX, 1));
        assert_eq!(u32::MAX, alu(AluOp::Sub, 0, 1));
        assert_eq!(7, alu(AluOp::Sub, 10, 3));
    }

    #[test]
    fn test_logical() {
        assert_eq!(0b1000, logical(LogicalOp::And, 0b1100, 0b1010));
        assert_eq!(0b1110, logical(LogicalOp::Or, 0b1100, 0b1010));
        assert_eq!(0b0110, logical(LogicalOp::Xor, 0b1100, 0b1010));
    }

    #[test]
    fn test_shift_uses_low_five_bits() {
        assert_eq!(2, shift(ShiftOp::Sll, 1, 33));
        assert_eq!(0x4000_0000, shift(ShiftOp::Srl, 0x8000_0000, 1));
        assert_eq!(0xC000_0000, shift(ShiftOp::Sra, 0x8000_0000, 1));
        assert_eq!(0x8000_0000, shift(ShiftOp::Sra, 0x8000_0000, 32));
    }

    #[test]
    fn test_compare() {
        assert!(compare(CompareOp::Lt, -1i32 as u32, 0));
        assert!(!compare(CompareOp::Ltu, -1i32 as u32, 0));
        assert!(compare(CompareOp::Eq, 5, 5));
    }

    #[test]
    fn test_branch_conditions() {
        let units = Golden;
        let minus_one = -1i32 as u32;
        assert!(units.branch(BranchCondition::Beq, 3, 3));
        assert!(!units.branch(BranchCondition::Bne, 3, 3));
        assert!(units.branch(BranchCondition::Blt, minus_one, 1));
        assert!(!units.branch(BranchCondition::Bltu, minus_one, 1));
        assert!(units.branch(BranchCondition::Bge, 1, minus_one));
        assert!(units.branch(BranchCondition::Bgeu, minus_one, 1));
        assert!(units.branch(BranchCondition::Bge, 2, 2));
    }

    #[derive(Debug)]
    struct SubAsAdd;

    impl ExecutionUnits for SubAsAdd {
        fn alu(&self, _op: AluOp, a: u32, b: u32) -> u32 {
            a.wrapping_add(b)
        }
    }

    #[test]
    fn test_override_single_unit() {
        assert_eq!(13, SubAsAdd.alu(AluOp::Sub, 10, 3));
        assert_eq!(0b0110, SubAsAdd.logical(LogicalOp::Xor, 0b1100, 0b1010));
    }
}
