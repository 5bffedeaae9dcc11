// SPDX-License-Identifier: Apache-2.0
//! Instruction classification
//!
//! Implements the classifier contract the encoder and decoder consume: given
//! a raw instruction word, whether it is a conditional branch, an
//! unpredictable discontinuity, a return-address-stack event, or an
//! unsupported (hardware-loop) form.

pub mod format;

#[cfg(test)]
mod tests;

/// The bits from which instructions can be disassembled
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bits {
    Bit32(u32),
    Bit16(u16),
}

impl Bits {
    /// Extract [`Bits`] from the beginning of a raw byte slice
    ///
    /// Honors the Base Instruction-Length Encoding (RISC-V ISA manual volume
    /// I, section 1.5). Returns the remaining slice alongside the decoded
    /// bits, or `None` if the beginning is neither a 16- nor 32-bit
    /// instruction or the slice is too short.
    pub fn extract(data: &[u8]) -> Option<(Self, &[u8])> {
        match data {
            [a, b, r @ ..] if a & 0b11 != 0b11 => {
                Some((Self::Bit16(u16::from_le_bytes([*a, *b])), r))
            }
            [a, b, c, d, r @ ..] if a & 0b11100 != 0b11100 => {
                Some((Self::Bit32(u32::from_le_bytes([*a, *b, *c, *d])), r))
            }
            _ => None,
        }
    }
}

#[repr(u32)]
#[derive(Eq, PartialEq)]
enum OpCode {
    MiscMem = 0b0001111,
    Custom0 = 0b0001011,
    Lui = 0b0110111,
    Auipc = 0b0010111,
    Branch = 0b1100011,
    Jalr = 0b1100111,
    Jal = 0b1101111,
    System = 0b1110011,
    Ignored,
}

impl From<u32> for OpCode {
    fn from(value: u32) -> Self {
        use OpCode::*;

        const MASK: u32 = 0x7F;
        match value & MASK {
            x if x == Auipc as u32 => Auipc,
            x if x == Lui as u32 => Lui,
            x if x == MiscMem as u32 => MiscMem,
            x if x == Custom0 as u32 => Custom0,
            x if x == Branch as u32 => Branch,
            x if x == Jalr as u32 => Jalr,
            x if x == Jal as u32 => Jal,
            x if x == System as u32 => System,
            _ => Ignored,
        }
    }
}

/// Return-address-stack action implied by an instruction
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RasKind {
    #[default]
    None,
    /// Push the fall-through address
    Call,
    /// Pop the predicted target
    Ret,
    /// Pop, then push the fall-through address (call-and-return)
    CoRet,
}

/// Control-flow-relevant instructions the tracing algorithm needs to know
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    // SYS (R)
    mret,
    sret,
    uret,
    dret,
    fence,
    sfence_vma,
    wfi,
    // I
    ecall,
    ebreak,
    // Zifencei
    fence_i,
    // B
    beq(format::TypeB),
    bne(format::TypeB),
    blt(format::TypeB),
    bge(format::TypeB),
    bltu(format::TypeB),
    bgeu(format::TypeB),
    // custom PULP immediate branches
    p_beqimm(format::TypeB),
    p_bneimm(format::TypeB),
    // U
    auipc(format::TypeU),
    lui(format::TypeU),
    // CB
    c_beqz(format::TypeB),
    c_bnez(format::TypeB),
    // J
    jal(format::TypeJ),
    // CJ
    c_j(format::TypeJ),
    c_jal(format::TypeJ),
    // CU
    c_lui(format::TypeU),
    // CR
    c_jr(format::TypeR),
    c_jalr(format::TypeR),
    c_ebreak,
    // I
    jalr(format::TypeI),
    /// PULP hardware-loop setup (`lp.setup`/`lp.setupi`/`lp.count`/...)
    ///
    /// Not decoded further: the encoder aborts as soon as it is observed.
    hwloop_setup,
}

impl Kind {
    /// The branch target relative to this instruction, if this is a
    /// conditional branch
    ///
    /// Jump instructions are not considered branch instructions.
    pub fn branch_target(self) -> Option<i16> {
        match self {
            Self::c_beqz(d) => Some(d.imm),
            Self::c_bnez(d) => Some(d.imm),
            Self::beq(d) => Some(d.imm),
            Self::bne(d) => Some(d.imm),
            Self::blt(d) => Some(d.imm),
            Self::bge(d) => Some(d.imm),
            Self::bltu(d) => Some(d.imm),
            Self::bgeu(d) => Some(d.imm),
            Self::p_beqimm(d) => Some(d.imm),
            Self::p_bneimm(d) => Some(d.imm),
            _ => None,
        }
    }

    /// The inferable jump target relative to this instruction
    ///
    /// `jalr` is only ever inferable when its source register is `zero`.
    /// Branch instructions are not considered jump instructions.
    pub fn inferable_jump_target(self) -> Option<i32> {
        match self {
            Self::jal(d) => Some(d.imm),
            Self::c_jal(d) => Some(d.imm),
            Self::c_j(d) => Some(d.imm),
            Self::jalr(format::TypeI { rs1: 0, imm, .. }) => Some(imm.into()),
            _ => None,
        }
    }

    /// The register and offset of an uninferable jump
    pub fn uninferable_jump(self) -> Option<(format::Register, i16)> {
        match self {
            Self::c_jalr(d) => Some((d.rs1, 0)),
            Self::c_jr(d) => Some((d.rs1, 0)),
            Self::jalr(d) => Some((d.rs1, d.imm)),
            _ => None,
        }
        .filter(|(r, _)| *r != 0)
    }

    /// Whether this instruction returns from a trap (`mret`/`sret`/`uret`/`dret`)
    pub fn is_return_from_trap(self) -> bool {
        matches!(self, Self::uret | Self::sret | Self::mret | Self::dret)
    }

    /// Whether this is an `ecall`, `ebreak`, or `c.ebreak`
    pub fn is_ecall_or_ebreak(self) -> bool {
        matches!(self, Self::ecall | Self::ebreak | Self::c_ebreak)
    }

    /// Whether this is a conditional branch, including custom PULP
    /// immediate-branch forms
    pub fn is_branch(self) -> bool {
        self.branch_target().is_some()
    }

    /// Whether this causes an unpredictable PC discontinuity
    ///
    /// An uninferable jump, a trap return, or an `ecall`/`ebreak` always
    /// qualifies. A `ret`/`c.ret`-shaped `jalr`/`c.jr` does not qualify when
    /// `implicit_ret` is set, since the return-address stack predicts it.
    pub fn is_unpred_discontinuity(self, implicit_ret: bool) -> bool {
        if implicit_ret && self.ras_kind() == RasKind::Ret {
            return false;
        }
        self.uninferable_jump().is_some() || self.is_return_from_trap() || self.is_ecall_or_ebreak()
    }

    /// Whether this instruction should abort encoding
    ///
    /// Hardware-loop setup forms are out of scope; see the classifier
    /// contract.
    pub fn is_unsupported(self) -> bool {
        matches!(self, Self::hwloop_setup)
    }

    /// Whether this instruction is a function call (`jal`/`jalr` with `ra` as
    /// `rd`)
    pub fn is_call(self) -> bool {
        matches!(
            self,
            Self::jalr(format::TypeI { rd: 1, .. })
                | Self::c_jalr(_)
                | Self::jal(format::TypeJ { rd: 1, .. })
                | Self::c_jal(_)
        )
    }

    /// Whether this instruction is a function return (`jalr`/`c.jr` with
    /// `ra` as `rs1` and a discarded result)
    pub fn is_return(self) -> bool {
        matches!(
            self,
            Self::jalr(format::TypeI { rd: 0, rs1: 1, .. })
                | Self::c_jr(format::TypeR { rs1: 1, .. })
        )
    }

    /// The return-address-stack action implied by this instruction
    ///
    /// A call-and-return (`rd == rs1 == ra`) pops before pushing, matching
    /// the convention that a call overwrites its own return slot.
    pub fn ras_kind(self) -> RasKind {
        let is_call = self.is_call();
        let is_return = self.is_return();
        match (is_call, is_return) {
            (true, true) => RasKind::CoRet,
            (true, false) => RasKind::Call,
            (false, true) => RasKind::Ret,
            (false, false) => RasKind::None,
        }
    }

    /// Decode a 32-bit ("normal") instruction
    ///
    /// Unknown instructions are not an error: only a small part of the ISA
    /// is relevant to tracing.
    #[allow(clippy::unusual_byte_groupings)]
    pub fn decode_32(insn: u32) -> Option<Self> {
        let funct3 = (insn >> 12) & 0x7;

        match OpCode::from(insn) {
            OpCode::MiscMem => match funct3 {
                0b000 => Some(Self::fence),
                0b001 => Some(Self::fence_i),
                _ => None,
            },
            OpCode::Lui => Some(Self::lui(insn.into())),
            OpCode::Auipc => Some(Self::auipc(insn.into())),
            OpCode::Branch => match funct3 {
                0b000 => Some(Self::beq(insn.into())),
                0b001 => Some(Self::bne(insn.into())),
                0b100 => Some(Self::blt(insn.into())),
                0b101 => Some(Self::bge(insn.into())),
                0b110 => Some(Self::bltu(insn.into())),
                0b111 => Some(Self::bgeu(insn.into())),
                _ => None,
            },
            OpCode::Custom0 => match funct3 {
                0b110 => Some(Self::p_beqimm(insn.into())),
                0b111 => Some(Self::p_bneimm(insn.into())),
                0b000..=0b011 => Some(Self::hwloop_setup),
                _ => None,
            },
            OpCode::Jalr => Some(Self::jalr(insn.into())),
            OpCode::Jal => Some(Self::jal(insn.into())),
            OpCode::System => match insn >> 7 {
                0b000000000000_00000_000_00000 => Some(Self::ecall),
                0b000000000001_00000_000_00000 => Some(Self::ebreak),
                0b000100000010_00000_000_00000 => Some(Self::sret),
                0b001100000010_00000_000_00000 => Some(Self::mret),
                0b000100000101_00000_000_00000 => Some(Self::wfi),
                _ if (insn >> 25) == 0b0001001 => Some(Self::sfence_vma),
                _ => None,
            },
            _ => None,
        }
    }

    /// Decode a 16-bit ("compressed") instruction
    pub fn decode_16(insn: u16) -> Option<Self> {
        let op = insn & 0x3;
        let func3 = insn >> 13;
        match (op, func3) {
            (0b01, 0b001) => Some(Self::c_jal(insn.into())),
            (0b01, 0b011) => {
                let data = format::TypeU::from(insn);
                if data.rd != 0 && data.rd != 2 {
                    Some(Self::c_lui(data))
                } else {
                    None
                }
            }
            (0x01, 0b101) => Some(Self::c_j(insn.into())),
            (0x01, 0b110) => Some(Self::c_beqz(insn.into())),
            (0x01, 0b111) => Some(Self::c_bnez(insn.into())),
            (0b10, 0b100) => {
                let data = format::TypeR::from(insn);
                let bit12 = (insn >> 12) & 0x1;
                match (bit12, data.rs1, data.rs2) {
                    (0, r, 0) if r != 0 => Some(Self::c_jr(data)),
                    (1, r, 0) if r != 0 => Some(Self::c_jalr(data)),
                    (1, 0, 0) => Some(Self::c_ebreak),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Byte length of a single RISC-V instruction: either 4 or 2
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Size {
    Compressed = 2,
    Normal = 4,
}

impl Default for Size {
    fn default() -> Self {
        Self::Normal
    }
}

impl From<Size> for u64 {
    fn from(size: Size) -> Self {
        size as u64
    }
}

/// A single decoded RISC-V instruction
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub size: Size,
    /// `None` if the word did not decode to a known control-flow-relevant
    /// instruction
    pub kind: Option<Kind>,
}

impl From<Bits> for Instruction {
    fn from(bits: Bits) -> Self {
        match bits {
            Bits::Bit32(bits) => Self {
                size: Size::Normal,
                kind: Kind::decode_32(bits),
            },
            Bits::Bit16(bits) => Self {
                size: Size::Compressed,
                kind: Kind::decode_16(bits),
            },
        }
    }
}
