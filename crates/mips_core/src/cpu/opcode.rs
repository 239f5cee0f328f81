//! 32-bit MIPS instruction word: field extraction and mnemonic decode.

use std::fmt;

use crate::error::Fault;

/// Raw numeric opcode/funct values, named after the MIPS32/64 encoding
/// tables.
pub mod raw {
    pub const SPECIAL: u32 = 0x00;
    pub const REGIMM: u32 = 0x01;
    pub const J: u32 = 0x02;
    pub const JAL: u32 = 0x03;
    pub const BEQ: u32 = 0x04;
    pub const BNE: u32 = 0x05;
    pub const BLEZ: u32 = 0x06;
    pub const BGTZ: u32 = 0x07;
    pub const ADDI: u32 = 0x08;
    pub const ADDIU: u32 = 0x09;
    pub const SLTI: u32 = 0x0A;
    pub const SLTIU: u32 = 0x0B;
    pub const ANDI: u32 = 0x0C;
    pub const ORI: u32 = 0x0D;
    pub const XORI: u32 = 0x0E;
    pub const LUI: u32 = 0x0F;
    pub const SPECIAL2: u32 = 0x1C;
    pub const LB: u32 = 0x20;
    pub const LH: u32 = 0x21;
    pub const LWL: u32 = 0x22;
    pub const LW: u32 = 0x23;
    pub const LBU: u32 = 0x24;
    pub const LHU: u32 = 0x25;
    pub const LWR: u32 = 0x26;
    pub const LWU: u32 = 0x27;
    pub const SB: u32 = 0x28;
    pub const SH: u32 = 0x29;
    pub const SWL: u32 = 0x2A;
    pub const SW: u32 = 0x2B;
    pub const SWR: u32 = 0x2E;
    pub const LL: u32 = 0x30;
    pub const LDL: u32 = 0x1A;
    pub const LDR: u32 = 0x1B;
    pub const LLD: u32 = 0x34;
    pub const LD: u32 = 0x37;
    pub const SC: u32 = 0x38;
    pub const SCD: u32 = 0x3C;
    pub const SD: u32 = 0x3F;

    // SPECIAL functs.
    pub const SLL: u32 = 0x00;
    pub const SRL: u32 = 0x02;
    pub const SRA: u32 = 0x03;
    pub const SLLV: u32 = 0x04;
    pub const SRLV: u32 = 0x06;
    pub const SRAV: u32 = 0x07;
    pub const JR: u32 = 0x08;
    pub const JALR: u32 = 0x09;
    pub const MOVZ: u32 = 0x0A;
    pub const MOVN: u32 = 0x0B;
    pub const SYSCALL: u32 = 0x0C;
    pub const BREAK: u32 = 0x0D;
    pub const SYNC: u32 = 0x0F;
    pub const MFHI: u32 = 0x10;
    pub const MTHI: u32 = 0x11;
    pub const MFLO: u32 = 0x12;
    pub const MTLO: u32 = 0x13;
    pub const MULT: u32 = 0x18;
    pub const MULTU: u32 = 0x19;
    pub const DIV: u32 = 0x1A;
    pub const DIVU: u32 = 0x1B;
    pub const ADD: u32 = 0x20;
    pub const ADDU: u32 = 0x21;
    pub const SUB: u32 = 0x22;
    pub const SUBU: u32 = 0x23;
    pub const AND: u32 = 0x24;
    pub const OR: u32 = 0x25;
    pub const XOR: u32 = 0x26;
    pub const NOR: u32 = 0x27;
    pub const SLT: u32 = 0x2A;
    pub const SLTU: u32 = 0x2B;

    // REGIMM rt-field selectors.
    pub const BLTZ: u32 = 0x00;
    pub const BGEZ: u32 = 0x01;
    pub const BLTZAL: u32 = 0x10;
    pub const BGEZAL: u32 = 0x11;

    // SPECIAL2 functs.
    pub const MUL: u32 = 0x02;
    pub const CLZ: u32 = 0x20;
    pub const CLO: u32 = 0x21;
}

/// Decoded field view over a raw 32-bit instruction word. Field positions
/// are fixed by the MIPS encoding regardless of which mnemonic they end up
/// meaning.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Instruction(pub u32);

impl Instruction {
    pub fn op(self) -> u32 {
        self.0 >> 26
    }

    pub fn special(self) -> u32 {
        self.0 & 0x3F
    }

    pub fn rs(self) -> usize {
        ((self.0 >> 21) & 0x1F) as usize
    }

    pub fn rt(self) -> usize {
        ((self.0 >> 16) & 0x1F) as usize
    }

    pub fn rd(self) -> usize {
        ((self.0 >> 11) & 0x1F) as usize
    }

    pub fn shamt(self) -> u32 {
        (self.0 >> 6) & 0x1F
    }

    pub fn imm(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn signed_imm(self) -> i32 {
        i32::from(self.imm() as i16)
    }

    /// 26-bit jump target field, used by `J`/`JAL`.
    pub fn target(self) -> u32 {
        self.0 & 0x03FF_FFFF
    }
}

/// Every mnemonic the executor implements. Anything that does not decode
/// into one of these is an [`Fault::InvalidInstruction`] — including
/// COP0/COP1/COP2 and TLB instructions, which are out of scope.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mnemonic {
    Sll,
    Srl,
    Sra,
    Sllv,
    Srlv,
    Srav,
    Jr,
    Jalr,
    Movz,
    Movn,
    Syscall,
    Sync,
    Mfhi,
    Mthi,
    Mflo,
    Mtlo,
    Mult,
    Multu,
    Div,
    Divu,
    Add,
    Addu,
    Sub,
    Subu,
    And,
    Or,
    Xor,
    Nor,
    Slt,
    Sltu,
    Bltz,
    Bgez,
    Bltzal,
    Bgezal,
    Mul,
    Clz,
    Clo,
    J,
    Jal,
    Beq,
    Bne,
    Blez,
    Bgtz,
    Addi,
    Addiu,
    Slti,
    Sltiu,
    Andi,
    Ori,
    Xori,
    Lui,
    Lb,
    Lh,
    Lwl,
    Lw,
    Lbu,
    Lhu,
    Lwr,
    Lwu,
    Sb,
    Sh,
    Swl,
    Sw,
    Swr,
    Ll,
    Lld,
    Ldl,
    Ldr,
    Ld,
    Sc,
    Scd,
    Sd,
}

pub fn decode(word: u32) -> Result<Mnemonic, Fault> {
    use raw::*;
    let instr = Instruction(word);
    let m = match instr.op() {
        SPECIAL => match instr.special() {
            SLL => Mnemonic::Sll,
            SRL => Mnemonic::Srl,
            SRA => Mnemonic::Sra,
            SLLV => Mnemonic::Sllv,
            SRLV => Mnemonic::Srlv,
            SRAV => Mnemonic::Srav,
            JR => Mnemonic::Jr,
            JALR => Mnemonic::Jalr,
            MOVZ => Mnemonic::Movz,
            MOVN => Mnemonic::Movn,
            SYSCALL => Mnemonic::Syscall,
            SYNC => Mnemonic::Sync,
            MFHI => Mnemonic::Mfhi,
            MTHI => Mnemonic::Mthi,
            MFLO => Mnemonic::Mflo,
            MTLO => Mnemonic::Mtlo,
            MULT => Mnemonic::Mult,
            MULTU => Mnemonic::Multu,
            DIV => Mnemonic::Div,
            DIVU => Mnemonic::Divu,
            ADD => Mnemonic::Add,
            ADDU => Mnemonic::Addu,
            SUB => Mnemonic::Sub,
            SUBU => Mnemonic::Subu,
            AND => Mnemonic::And,
            OR => Mnemonic::Or,
            XOR => Mnemonic::Xor,
            NOR => Mnemonic::Nor,
            SLT => Mnemonic::Slt,
            SLTU => Mnemonic::Sltu,
            _ => return Err(Fault::InvalidInstruction),
        },
        REGIMM => match instr.rt() as u32 {
            BLTZ => Mnemonic::Bltz,
            BGEZ => Mnemonic::Bgez,
            BLTZAL => Mnemonic::Bltzal,
            BGEZAL => Mnemonic::Bgezal,
            _ => return Err(Fault::InvalidInstruction),
        },
        SPECIAL2 => match instr.special() {
            MUL => Mnemonic::Mul,
            CLZ => Mnemonic::Clz,
            CLO => Mnemonic::Clo,
            _ => return Err(Fault::InvalidInstruction),
        },
        J => Mnemonic::J,
        JAL => Mnemonic::Jal,
        BEQ => Mnemonic::Beq,
        BNE => Mnemonic::Bne,
        BLEZ => Mnemonic::Blez,
        BGTZ => Mnemonic::Bgtz,
        ADDI => Mnemonic::Addi,
        ADDIU => Mnemonic::Addiu,
        SLTI => Mnemonic::Slti,
        SLTIU => Mnemonic::Sltiu,
        ANDI => Mnemonic::Andi,
        ORI => Mnemonic::Ori,
        XORI => Mnemonic::Xori,
        LUI => Mnemonic::Lui,
        LB => Mnemonic::Lb,
        LH => Mnemonic::Lh,
        LWL => Mnemonic::Lwl,
        LW => Mnemonic::Lw,
        LBU => Mnemonic::Lbu,
        LHU => Mnemonic::Lhu,
        LWR => Mnemonic::Lwr,
        LWU => Mnemonic::Lwu,
        SB => Mnemonic::Sb,
        SH => Mnemonic::Sh,
        SWL => Mnemonic::Swl,
        SW => Mnemonic::Sw,
        SWR => Mnemonic::Swr,
        LL => Mnemonic::Ll,
        LLD => Mnemonic::Lld,
        LDL => Mnemonic::Ldl,
        LDR => Mnemonic::Ldr,
        LD => Mnemonic::Ld,
        SC => Mnemonic::Sc,
        SCD => Mnemonic::Scd,
        SD => Mnemonic::Sd,
        _ => return Err(Fault::InvalidInstruction),
    };
    Ok(m)
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match decode(self.0) {
            Ok(m) => write!(
                f,
                "{:?} rs={} rt={} rd={} imm={:#06x}",
                m,
                self.rs(),
                self.rt(),
                self.rd(),
                self.imm()
            ),
            Err(_) => write!(f, "invalid {:#010x}", self.0),
        }
    }
}
