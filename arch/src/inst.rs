use crate::reg::Reg;
use std::fmt;

/// Size in bytes of one data word in the output listing.
pub const DATA_SIZE: u16 = 2;

/// Size in bytes of one instruction in the output listing.
pub const INST_SIZE: u16 = 4;

/// Returns a hex string of the form "0x0000" for the given value.
pub fn hex(value: u16) -> String {
    format!("0x{:04x}", value)
}

/// Immediate operand: a literal word, or a label left for the
/// downstream assembler to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imm {
    Val(u16),
    Label(String),
}

impl fmt::Display for Imm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imm::Val(v) => write!(f, "{}", hex(*v)),
            Imm::Label(l) => write!(f, "{}", l),
        }
    }
}

/// Second operand of a shift: a register or an immediate shift amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Src {
    Reg(Reg),
    Val(u16),
}

impl fmt::Display for Src {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Src::Reg(r) => write!(f, "{}", r),
            Src::Val(v) => write!(f, "{}", hex(*v)),
        }
    }
}

/// One line of the emitted listing, rendered by `Display` exactly as the
/// downstream assembler expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    MOV(Reg, Reg),
    MOVI(Reg, Imm),

    ADD(Reg, Reg),
    SUB(Reg, Reg),
    MUL(Reg, Reg),
    DIV(Reg, Reg),
    AND(Reg, Reg),
    OR(Reg, Reg),
    XOR(Reg, Reg),
    SHL(Reg, Src),
    SHRL(Reg, Src),

    CMP(Reg, Reg),
    TST(Reg, Reg),

    JMPI(String),
    JEQ(String),
    JNE(String),
    JA(String),
    JAE(String),
    JB(String),
    JBE(String),

    CALL(String),
    /// `RET`, or `RET <n>` where `n` is the byte count of overflow
    /// arguments the callee pops off the stack.
    RET(Option<u16>),
    PUSH(Reg),
    POP(Reg),

    LOAD(Reg, Reg),
    STOR(Reg, Reg),

    // Builtin device instructions
    COLOR(Reg),
    PIXEL(Reg, Reg),
    TIMERST,
    TIME(Reg),
    INPUT(Reg, Reg),
    RND(Reg),
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::MOV(rd, rs) => write!(f, "MOV {} {}", rd, rs),
            Inst::MOVI(rd, imm) => write!(f, "MOVI {} {}", rd, imm),
            Inst::ADD(rd, rs) => write!(f, "ADD {} {}", rd, rs),
            Inst::SUB(rd, rs) => write!(f, "SUB {} {}", rd, rs),
            Inst::MUL(rd, rs) => write!(f, "MUL {} {}", rd, rs),
            Inst::DIV(rd, rs) => write!(f, "DIV {} {}", rd, rs),
            Inst::AND(rd, rs) => write!(f, "AND {} {}", rd, rs),
            Inst::OR(rd, rs) => write!(f, "OR {} {}", rd, rs),
            Inst::XOR(rd, rs) => write!(f, "XOR {} {}", rd, rs),
            Inst::SHL(rd, src) => write!(f, "SHL {} {}", rd, src),
            Inst::SHRL(rd, src) => write!(f, "SHRL {} {}", rd, src),
            Inst::CMP(ra, rb) => write!(f, "CMP {} {}", ra, rb),
            Inst::TST(ra, rb) => write!(f, "TST {} {}", ra, rb),
            Inst::JMPI(l) => write!(f, "JMPI {}", l),
            Inst::JEQ(l) => write!(f, "JEQ {}", l),
            Inst::JNE(l) => write!(f, "JNE {}", l),
            Inst::JA(l) => write!(f, "JA {}", l),
            Inst::JAE(l) => write!(f, "JAE {}", l),
            Inst::JB(l) => write!(f, "JB {}", l),
            Inst::JBE(l) => write!(f, "JBE {}", l),
            Inst::CALL(l) => write!(f, "CALL {}", l),
            Inst::RET(None) => write!(f, "RET"),
            Inst::RET(Some(n)) => write!(f, "RET 0x{:02x}", n),
            Inst::PUSH(r) => write!(f, "PUSH {}", r),
            Inst::POP(r) => write!(f, "POP {}", r),
            Inst::LOAD(rd, ra) => write!(f, "LOAD {} {}", rd, ra),
            Inst::STOR(rs, ra) => write!(f, "STOR {} {}", rs, ra),
            Inst::COLOR(r) => write!(f, "COLOR {}", r),
            Inst::PIXEL(rx, ry) => write!(f, "PIXEL {} {}", rx, ry),
            Inst::TIMERST => write!(f, "TIMERST"),
            Inst::TIME(r) => write!(f, "TIME {}", r),
            Inst::INPUT(rd, rs) => write!(f, "INPUT {} {}", rd, rs),
            Inst::RND(r) => write!(f, "RND {}", r),
        }
    }
}
