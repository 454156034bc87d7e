use crate::cs_registers::CsrSpecifier;
use crate::registers::Specifier;
use std::fmt;
use thiserror::Error;

/// A supported instruction, decoded down to what selects its control path.
///
/// Register and immediate fields are left in the raw word; see [`Fields`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    OpImm(RegImmOp),
    OpShiftImm(RegShiftImmOp),
    Auipc,
    Lui,
    Op(RegRegOp),
    Jal,
    Jalr,
    Branch(BranchCondition),
    Load(LoadWidth),
    Store(StoreWidth),
    Csr(CsrOp, CsrSource),
    Fence,
    Ecall,
    Ebreak,
    Mret,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegShiftImmOp {
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegRegOp {
    Add,
    Slt,
    Sltu,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sub,
    Sra,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BranchCondition {
    Beq,
    Bne,
    Blt,
    Bltu,
    Bge,
    Bgeu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadWidth {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StoreWidth {
    Sb,
    Sh,
    Sw,
}

/// The read-modify-write flavour of a Zicsr instruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrOp {
    /// CSRRW / CSRRWI: replace the whole register.
    ReadWrite,
    /// CSRRS / CSRRSI: set the bits that are set in the operand.
    ReadSet,
    /// CSRRC / CSRRCI: clear the bits that are set in the operand.
    ReadClear,
}

/// Where the operand of a Zicsr instruction comes from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrSource {
    /// The *rs1* register.
    Register,
    /// The 5-bit zero-extended immediate in the *rs1* field.
    Immediate,
}

impl Instruction {
    pub fn decode(raw_instruction: u32) -> Result<Self, DecodeError> {
        let fields = Fields(raw_instruction);
        let illegal = DecodeError::IllegalInstruction(raw_instruction);
        match opcode(raw_instruction).ok_or(DecodeError::UnsupportedOpcode(raw_instruction))? {
            Opcode::OpImm => match (i_funct(fields), i_shfunct(fields)) {
                (Some(op), _) => Ok(Self::OpImm(op)),
                (None, Some(op)) => Ok(Self::OpShiftImm(op)),
                (None, None) => Err(illegal),
            },
            Opcode::Auipc => Ok(Self::Auipc),
            Opcode::Lui => Ok(Self::Lui),
            Opcode::Op => r_funct(fields).map(Self::Op).ok_or(illegal),
            Opcode::Jal => Ok(Self::Jal),
            Opcode::Jalr if fields.funct3() == 0 => Ok(Self::Jalr),
            Opcode::Jalr => Err(illegal),
            Opcode::Branch => b_funct(fields).map(Self::Branch).ok_or(illegal),
            Opcode::Load => i_width(fields).map(Self::Load).ok_or(illegal),
            Opcode::Store => s_width(fields).map(Self::Store).ok_or(illegal),
            // Reserved fence fields and FENCE.TSO behave as a plain FENCE. FENCE.I is not
            // supported.
            Opcode::MiscMem if fields.funct3() == 0 => Ok(Self::Fence),
            Opcode::MiscMem => Err(illegal),
            Opcode::System => match fields.funct3() {
                0b000 => i_sys(fields).ok_or(illegal),
                0b100 => Err(illegal),
                funct3 => {
                    let op = match funct3 & 0b11 {
                        0b01 => CsrOp::ReadWrite,
                        0b10 => CsrOp::ReadSet,
                        _ => CsrOp::ReadClear,
                    };
                    let source = if funct3 & 0b100 == 0 {
                        CsrSource::Register
                    } else {
                        CsrSource::Immediate
                    };
                    Ok(Self::Csr(op, source))
                }
            },
        }
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("instruction {0:#010x} has an unsupported opcode")]
    UnsupportedOpcode(u32),
    #[error("illegal instruction {0:#010x}")]
    IllegalInstruction(u32),
}

/// View of the bit fields of a raw instruction word.
///
/// This is what the datapath sees of the instruction register every cycle: fields are extracted
/// without regard to the actual instruction format, so a field may be meaningless for a given
/// opcode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Fields(pub u32);

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Fields {
    /// Returns the 5-bit *rd* value for R-type, I-type, U-type, J-type instructions.
    pub fn rd(self) -> Specifier {
        Specifier::from_u5_truncating(self.0 >> 7)
    }

    /// Returns the 5-bit *rs1* value for R-type, I-type, S-type, B-type instructions.
    pub fn rs1(self) -> Specifier {
        Specifier::from_u5_truncating(self.0 >> 15)
    }

    /// Returns the 5-bit *rs2* value for R-type, S-type, B-type instructions.
    pub fn rs2(self) -> Specifier {
        Specifier::from_u5_truncating(self.0 >> 20)
    }

    /// Returns the 3-bit *funct3* value for R-type, I-type, S-type, B-type instructions.
    pub fn funct3(self) -> u8 {
        ((self.0 >> 12) & 0b111) as u8
    }

    /// Returns the 7-bit *funct7* value for R-type instructions.
    pub fn funct7(self) -> u8 {
        (self.0 >> 25) as u8
    }

    /// Returns the 12-bit CSR address of a Zicsr instruction.
    pub fn csr(self) -> CsrSpecifier {
        (self.0 >> 20) as CsrSpecifier
    }

    /// Returns the 5-bit zero-extended immediate of CSRR*I instructions, held in the *rs1* field.
    pub fn zimm(self) -> u32 {
        (self.0 >> 15) & 0x1F
    }

    /// Returns the 12-bit I-immediate sign-extended to 32 bits.
    pub fn i_imm(self) -> i32 {
        self.0 as i32 >> 20
    }

    /// Returns the 12-bit S-immediate sign-extended to 32 bits.
    pub fn s_imm(self) -> i32 {
        let imm_11_5 = self.0 & 0xFE00_0000;
        let imm_4_0 = self.0 & 0x0000_0F80;
        (imm_11_5 | (imm_4_0 << 13)) as i32 >> 20
    }

    /// Returns the 13-bit B-immediate sign-extended to 32 bits.
    pub fn b_imm(self) -> i32 {
        let imm_12 = self.0 & 0x8000_0000;
        let imm_10_5 = self.0 & 0x7E00_0000;
        let imm_4_1 = self.0 & 0x0000_0F00;
        let imm_11 = self.0 & 0x0000_0080;
        (imm_12 | (imm_11 << 23) | (imm_10_5 >> 1) | (imm_4_1 << 12)) as i32 >> 19
    }

    /// Returns the signed 32-bit U-immediate.
    pub fn u_imm(self) -> i32 {
        (self.0 & 0xFFFF_F000) as i32
    }

    /// Returns the 21-bit J-immediate sign-extended to 32 bits.
    pub fn j_imm(self) -> i32 {
        let imm_20 = self.0 & 0x8000_0000;
        let imm_10_1 = self.0 & 0x7FE0_0000;
        let imm_11 = self.0 & 0x0010_0000;
        let imm_19_12 = self.0 & 0x000F_F000;
        (imm_20 | (imm_19_12 << 11) | (imm_11 << 2) | (imm_10_1 >> 9)) as i32 >> 11
    }
}

/// Returns the 7-bit *opcode* value of the instruction, or `None` if it isn't supported.
fn opcode(raw_instruction: u32) -> Option<Opcode> {
    #[allow(clippy::unusual_byte_groupings)]
    match raw_instruction & 0x7F {
        0b00_000_11 => Some(Opcode::Load),
        0b00_011_11 => Some(Opcode::MiscMem),
        0b00_100_11 => Some(Opcode::OpImm),
        0b00_101_11 => Some(Opcode::Auipc),
        0b01_000_11 => Some(Opcode::Store),
        0b01_100_11 => Some(Opcode::Op),
        0b01_101_11 => Some(Opcode::Lui),
        0b11_000_11 => Some(Opcode::Branch),
        0b11_001_11 => Some(Opcode::Jalr),
        0b11_011_11 => Some(Opcode::Jal),
        0b11_100_11 => Some(Opcode::System),
        _ => None,
    }
}

fn i_funct(fields: Fields) -> Option<RegImmOp> {
    match fields.funct3() {
        0b000 => Some(RegImmOp::Addi),
        0b010 => Some(RegImmOp::Slti),
        0b011 => Some(RegImmOp::Sltiu),
        0b100 => Some(RegImmOp::Xori),
        0b110 => Some(RegImmOp::Ori),
        0b111 => Some(RegImmOp::Andi),
        _ => None,
    }
}

fn i_shfunct(fields: Fields) -> Option<RegShiftImmOp> {
    match (fields.funct7(), fields.funct3()) {
        (0b0000000, 0b001) => Some(RegShiftImmOp::Slli),
        (0b0000000, 0b101) => Some(RegShiftImmOp::Srli),
        (0b0100000, 0b101) => Some(RegShiftImmOp::Srai),
        _ => None,
    }
}

fn i_sys(fields: Fields) -> Option<Instruction> {
    if fields.rd() != Specifier::X0 || fields.rs1() != Specifier::X0 {
        return None;
    }
    match fields.0 >> 20 {
        0x000 => Some(Instruction::Ecall),
        0x001 => Some(Instruction::Ebreak),
        0x302 => Some(Instruction::Mret),
        _ => None,
    }
}

fn i_width(fields: Fields) -> Option<LoadWidth> {
    match fields.funct3() {
        0b000 => Some(LoadWidth::Lb),
        0b001 => Some(LoadWidth::Lh),
        0b010 => Some(LoadWidth::Lw),
        0b100 => Some(LoadWidth::Lbu),
        0b101 => Some(LoadWidth::Lhu),
        _ => None,
    }
}

fn s_width(fields: Fields) -> Option<StoreWidth> {
    match fields.funct3() {
        0b000 => Some(StoreWidth::Sb),
        0b001 => Some(StoreWidth::Sh),
        0b010 => Some(StoreWidth::Sw),
        _ => None,
    }
}

fn r_funct(fields: Fields) -> Option<RegRegOp> {
    match (fields.funct7(), fields.funct3()) {
        (0b0000000, 0b000) => Some(RegRegOp::Add),
        (0b0000000, 0b001) => Some(RegRegOp::Sll),
        (0b0000000, 0b010) => Some(RegRegOp::Slt),
        (0b0000000, 0b011) => Some(RegRegOp::Sltu),
        (0b0000000, 0b100) => Some(RegRegOp::Xor),
        (0b0000000, 0b101) => Some(RegRegOp::Srl),
        (0b0000000, 0b110) => Some(RegRegOp::Or),
        (0b0000000, 0b111) => Some(RegRegOp::And),
        (0b0100000, 0b000) => Some(RegRegOp::Sub),
        (0b0100000, 0b101) => Some(RegRegOp::Sra),
        _ => None,
    }
}

/// Also used by the datapath to evaluate the branch condition of the current instruction.
pub(crate) fn b_funct(fields: Fields) -> Option<BranchCondition> {
    match fields.funct3() {
        0b000 => Some(BranchCondition::Beq),
        0b001 => Some(BranchCondition::Bne),
        0b100 => Some(BranchCondition::Blt),
        0b101 => Some(BranchCondition::Bge),
        0b110 => Some(BranchCondition::Bltu),
        0b111 => Some(BranchCondition::Bgeu),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Opcode {
    OpImm,
    Auipc,
    Lui,
    Op,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    MiscMem,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i_imm() {
        assert_eq!(0, Fields(0x0000_0000).i_imm());
        assert_eq!(-1, Fields(0xFFF0_0000).i_imm());
        assert_eq!(2047, Fields(2047 << 20).i_imm());
        assert_eq!(-2048, Fields(0x8000_0000).i_imm());
        // Check other bits are ignored
        assert_eq!(0, Fields(0x000F_FFFF).i_imm());
        assert_eq!(1209, Fields((1209 << 20) | 0x000C_D10A).i_imm());
    }

    #[test]
    fn test_s_imm() {
        // sw x2, -4(x1)
        assert_eq!(-4, Fields(0xFE20_AE23).s_imm());
        // sw x2, 8(x1)
        assert_eq!(8, Fields(0x0020_A423).s_imm());
    }

    #[test]
    fn test_b_and_j_imm() {
        // beq x0, x0, -4
        assert_eq!(-4, Fields(0xFE00_0EE3).b_imm());
        // jal x0, 2048
        assert_eq!(2048, Fields(0x0010_006F).j_imm());
        // jal x1, -8
        assert_eq!(-8, Fields(0xFF9F_F0EF).j_imm());
    }

    #[test]
    fn test_decode_alu() {
        // addi x1, x0, 5
        assert_eq!(
            Ok(Instruction::OpImm(RegImmOp::Addi)),
            Instruction::decode(0x0050_0093)
        );
        // sub x3, x1, x2
        assert_eq!(
            Ok(Instruction::Op(RegRegOp::Sub)),
            Instruction::decode(0x4020_81B3)
        );
        // srai x1, x1, 3
        assert_eq!(
            Ok(Instruction::OpShiftImm(RegShiftImmOp::Srai)),
            Instruction::decode(0x4030_D093)
        );
        // slli x1, x1, 3 with a nonzero funct7 is reserved
        assert_eq!(
            Err(DecodeError::IllegalInstruction(0x0230_9093)),
            Instruction::decode(0x0230_9093)
        );
    }

    #[test]
    fn test_decode_memory_and_control() {
        // lhu x1, 2(x2)
        assert_eq!(
            Ok(Instruction::Load(LoadWidth::Lhu)),
            Instruction::decode(0x0021_5083)
        );
        // sb x2, 0(x1)
        assert_eq!(
            Ok(Instruction::Store(StoreWidth::Sb)),
            Instruction::decode(0x0020_8023)
        );
        // bgeu x1, x2, 8
        assert_eq!(
            Ok(Instruction::Branch(BranchCondition::Bgeu)),
            Instruction::decode(0x0020_F463)
        );
        // jalr x0, 0(x1)
        assert_eq!(Ok(Instruction::Jalr), Instruction::decode(0x0000_8067));
    }

    #[test]
    fn test_decode_system() {
        assert_eq!(Ok(Instruction::Ecall), Instruction::decode(0x0000_0073));
        assert_eq!(Ok(Instruction::Ebreak), Instruction::decode(0x0010_0073));
        assert_eq!(Ok(Instruction::Mret), Instruction::decode(0x3020_0073));
        // csrrs x5, mstatus, x0
        assert_eq!(
            Ok(Instruction::Csr(CsrOp::ReadSet, CsrSource::Register)),
            Instruction::decode(0x3000_22F3)
        );
        // csrrci x0, mie, 8
        assert_eq!(
            Ok(Instruction::Csr(CsrOp::ReadClear, CsrSource::Immediate)),
            Instruction::decode(0x3044_7073)
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Err(DecodeError::UnsupportedOpcode(0xFFFF_FFFF)),
            Instruction::decode(0xFFFF_FFFF)
        );
        assert_eq!(
            Err(DecodeError::UnsupportedOpcode(0)),
            Instruction::decode(0)
        );
        // funct7 = 0b0100000 with funct3 = 0b001 is not an RV32I encoding
        assert_eq!(
            Err(DecodeError::IllegalInstruction(0x4020_91B3)),
            Instruction::decode(0x4020_91B3)
        );
        // wfi is not supported
        assert_eq!(
            Err(DecodeError::IllegalInstruction(0x1050_0073)),
            Instruction::decode(0x1050_0073)
        );
    }
}
