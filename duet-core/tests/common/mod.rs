//! Shared helpers for the integration tests: a tiny RV32I encoder and board construction.

#![allow(dead_code)]

use duet_core::board::{Board, Config, RAM_BASE};
use duet_core::cs_registers::CsrSpecifier;
use duet_core::image::Image;
use duet_core::interrupt::InterruptLines;
use duet_core::registers::Specifier;
use duet_core::simulator::Simulator;

pub mod asm {
    //! Encoders for the RV32I instructions the test programs use. Registers are plain indices.

    const OP_IMM: u32 = 0b001_0011;
    const OP: u32 = 0b011_0011;
    const LUI: u32 = 0b011_0111;
    const AUIPC: u32 = 0b001_0111;
    const JAL: u32 = 0b110_1111;
    const JALR: u32 = 0b110_0111;
    const BRANCH: u32 = 0b110_0011;
    const LOAD: u32 = 0b000_0011;
    const STORE: u32 = 0b010_0011;
    const SYSTEM: u32 = 0b111_0011;

    pub mod csr {
        pub const MSTATUS: u32 = 0x300;
        pub const MIE: u32 = 0x304;
        pub const MTVEC: u32 = 0x305;
        pub const MSCRATCH: u32 = 0x340;
        pub const MEPC: u32 = 0x341;
        pub const MCAUSE: u32 = 0x342;
        pub const MTVAL: u32 = 0x343;
        pub const MIP: u32 = 0x344;
        pub const CYCLE: u32 = 0xC00;
    }

    fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        funct7 << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
    }

    fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        (imm as u32 & 0xFFF) << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
    }

    fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
        let imm = imm as u32;
        (imm >> 5 & 0x7F) << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | (imm & 0x1F) << 7 | STORE
    }

    fn b_type(offset: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
        let imm = offset as u32;
        (imm >> 12 & 1) << 31
            | (imm >> 5 & 0x3F) << 25
            | rs2 << 20
            | rs1 << 15
            | funct3 << 12
            | (imm >> 1 & 0xF) << 8
            | (imm >> 11 & 1) << 7
            | BRANCH
    }

    pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0b000, rd, OP_IMM)
    }

    pub fn slti(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0b010, rd, OP_IMM)
    }

    pub fn xori(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0b100, rd, OP_IMM)
    }

    pub fn ori(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0b110, rd, OP_IMM)
    }

    pub fn andi(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0b111, rd, OP_IMM)
    }

    pub fn slli(rd: u32, rs1: u32, shamt: u32) -> u32 {
        r_type(0, shamt, rs1, 0b001, rd, OP_IMM)
    }

    pub fn srai(rd: u32, rs1: u32, shamt: u32) -> u32 {
        r_type(0b010_0000, shamt, rs1, 0b101, rd, OP_IMM)
    }

    pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
        r_type(0, rs2, rs1, 0b000, rd, OP)
    }

    pub fn sub(rd: u32, rs1: u32, rs2: u32) -> u32 {
        r_type(0b010_0000, rs2, rs1, 0b000, rd, OP)
    }

    pub fn sltu(rd: u32, rs1: u32, rs2: u32) -> u32 {
        r_type(0, rs2, rs1, 0b011, rd, OP)
    }

    pub fn lui(rd: u32, imm: u32) -> u32 {
        imm & 0xFFFF_F000 | rd << 7 | LUI
    }

    pub fn auipc(rd: u32, imm: u32) -> u32 {
        imm & 0xFFFF_F000 | rd << 7 | AUIPC
    }

    pub fn jal(rd: u32, offset: i32) -> u32 {
        let imm = offset as u32;
        (imm >> 20 & 1) << 31
            | (imm >> 1 & 0x3FF) << 21
            | (imm >> 11 & 1) << 20
            | (imm >> 12 & 0xFF) << 12
            | rd << 7
            | JAL
    }

    pub fn jalr(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b000, rd, JALR)
    }

    pub fn beq(rs1: u32, rs2: u32, offset: i32) -> u32 {
        b_type(offset, rs2, rs1, 0b000)
    }

    pub fn bne(rs1: u32, rs2: u32, offset: i32) -> u32 {
        b_type(offset, rs2, rs1, 0b001)
    }

    pub fn blt(rs1: u32, rs2: u32, offset: i32) -> u32 {
        b_type(offset, rs2, rs1, 0b100)
    }

    pub fn lb(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b000, rd, LOAD)
    }

    pub fn lh(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b001, rd, LOAD)
    }

    pub fn lw(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b010, rd, LOAD)
    }

    pub fn lbu(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b100, rd, LOAD)
    }

    pub fn lhu(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b101, rd, LOAD)
    }

    pub fn sb(rs2: u32, rs1: u32, offset: i32) -> u32 {
        s_type(offset, rs2, rs1, 0b000)
    }

    pub fn sh(rs2: u32, rs1: u32, offset: i32) -> u32 {
        s_type(offset, rs2, rs1, 0b001)
    }

    pub fn sw(rs2: u32, rs1: u32, offset: i32) -> u32 {
        s_type(offset, rs2, rs1, 0b010)
    }

    pub fn csrrw(rd: u32, csr: u32, rs1: u32) -> u32 {
        csr << 20 | rs1 << 15 | 0b001 << 12 | rd << 7 | SYSTEM
    }

    pub fn csrrs(rd: u32, csr: u32, rs1: u32) -> u32 {
        csr << 20 | rs1 << 15 | 0b010 << 12 | rd << 7 | SYSTEM
    }

    pub fn csrrc(rd: u32, csr: u32, rs1: u32) -> u32 {
        csr << 20 | rs1 << 15 | 0b011 << 12 | rd << 7 | SYSTEM
    }

    pub fn csrrwi(rd: u32, csr: u32, uimm: u32) -> u32 {
        csr << 20 | (uimm & 0x1F) << 15 | 0b101 << 12 | rd << 7 | SYSTEM
    }

    pub fn csrrsi(rd: u32, csr: u32, uimm: u32) -> u32 {
        csr << 20 | (uimm & 0x1F) << 15 | 0b110 << 12 | rd << 7 | SYSTEM
    }

    pub fn csrrci(rd: u32, csr: u32, uimm: u32) -> u32 {
        csr << 20 | (uimm & 0x1F) << 15 | 0b111 << 12 | rd << 7 | SYSTEM
    }

    pub const NOP: u32 = 0x0000_0013;
    pub const ECALL: u32 = 0x0000_0073;
    pub const EBREAK: u32 = 0x0010_0073;
    pub const MRET: u32 = 0x3020_0073;
    pub const FENCE: u32 = 0x0FF0_000F;

    /// Load an arbitrary 32-bit constant, as the `li` pseudo-instruction does.
    pub fn li(rd: u32, value: u32) -> Vec<u32> {
        let upper = value.wrapping_add(0x800) & 0xFFFF_F000;
        let lower = value.wrapping_sub(upper) as i32;
        if upper == 0 {
            vec![addi(rd, 0, lower)]
        } else if lower == 0 {
            vec![lui(rd, upper)]
        } else {
            vec![lui(rd, upper), addi(rd, rd, lower)]
        }
    }
}

/// Flattens program fragments into a single RAM image, padding with zeros so that each fragment
/// starts at its address.
#[derive(Debug, Default)]
pub struct Program {
    words: Vec<u32>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address of the next word appended.
    pub fn here(&self) -> u32 {
        RAM_BASE + 4 * self.words.len() as u32
    }

    pub fn push(&mut self, word: u32) -> &mut Self {
        self.words.push(word);
        self
    }

    pub fn extend(&mut self, words: impl IntoIterator<Item = u32>) -> &mut Self {
        self.words.extend(words);
        self
    }

    /// Place `words` at `address`, which must not be before [`here`](Self::here).
    pub fn place(&mut self, address: u32, words: impl IntoIterator<Item = u32>) -> &mut Self {
        assert!(address >= self.here() && address % 4 == 0);
        self.words.resize(((address - RAM_BASE) / 4) as usize, 0);
        self.extend(words)
    }

    pub fn image(&self) -> Image {
        Image::from_words(&self.words)
    }
}

pub fn simulator(image: Image) -> Simulator<Board> {
    simulator_with(Config {
        image,
        ..Config::default()
    })
}

pub fn simulator_with(config: Config) -> Simulator<Board> {
    Simulator::new(Board::new(config).expect("test image fits in RAM"))
}

/// Build a simulator from a straight-line program.
pub fn run_words(words: &[u32], budget: u64) -> Simulator<Board> {
    let mut simulator = simulator(Image::from_words(words));
    simulator.run(budget);
    simulator
}

pub fn x(index: u8) -> Specifier {
    Specifier::new(index).expect("register index below 32")
}

/// Current value of a CSR, as an instruction would read it with all interrupt lines low.
pub fn csr(simulator: &Simulator<Board>, specifier: CsrSpecifier) -> u32 {
    simulator
        .simulatable()
        .core()
        .cs_registers()
        .read(specifier, InterruptLines::default())
        .expect("supported CSR")
}
