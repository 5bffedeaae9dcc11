// SPDX-License-Identifier: Apache-2.0

use super::*;

#[test]
fn extract_picks_compressed_for_low_two_bits_not_11() {
    let data = [0x01, 0x00, 0xff, 0xff];
    let (bits, rest) = Bits::extract(&data).unwrap();
    assert_eq!(bits, Bits::Bit16(0x0001));
    assert_eq!(rest, &[0xff, 0xff]);
}

#[test]
fn extract_picks_normal_for_low_bits_not_11100() {
    // beq x0, x0, +0: opcode 0b1100011, low 5 bits 0b00011 != 0b11100
    let data = [0x63, 0x00, 0x00, 0x00, 0xaa];
    let (bits, rest) = Bits::extract(&data).unwrap();
    assert_eq!(bits, Bits::Bit32(0x00000063));
    assert_eq!(rest, &[0xaa]);
}

#[test]
fn extract_fails_on_short_slice() {
    assert!(Bits::extract(&[0x01]).is_none());
}

fn beq(rs1: format::Register, rs2: format::Register, imm: i16) -> u32 {
    let imm_u = imm as u16 as u32;
    let bit11 = (imm_u >> 11) & 1;
    let bits4_1 = (imm_u >> 1) & 0xf;
    let bits10_5 = (imm_u >> 5) & 0x3f;
    let bit12 = (imm_u >> 12) & 1;
    (bit12 << 31)
        | (bits10_5 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (0b000 << 12)
        | (bits4_1 << 8)
        | (bit11 << 7)
        | 0b1100011
}

#[test]
fn decode_32_beq_roundtrips_immediate() {
    let word = beq(1, 2, 16);
    let kind = Kind::decode_32(word).unwrap();
    assert_eq!(kind.branch_target(), Some(16));
    assert!(kind.is_branch());
}

#[test]
fn mret_is_return_from_trap_not_ras() {
    assert!(Kind::mret.is_return_from_trap());
    assert_eq!(Kind::mret.ras_kind(), RasKind::None);
    assert!(Kind::mret.is_unpred_discontinuity(false));
    assert!(Kind::mret.is_unpred_discontinuity(true));
}

#[test]
fn jalr_ra_ra_is_call_and_return() {
    let jalr = Kind::jalr(format::TypeI {
        rd: 1,
        rs1: 1,
        imm: 0,
    });
    assert_eq!(jalr.ras_kind(), RasKind::CoRet);
}

#[test]
fn jalr_zero_ra_is_plain_return() {
    let jalr = Kind::jalr(format::TypeI {
        rd: 0,
        rs1: 1,
        imm: 0,
    });
    assert_eq!(jalr.ras_kind(), RasKind::Ret);
    assert!(jalr.is_unpred_discontinuity(false));
    assert!(!jalr.is_unpred_discontinuity(true));
}

#[test]
fn jalr_nonzero_source_is_uninferable_jump() {
    let jalr = Kind::jalr(format::TypeI {
        rd: 5,
        rs1: 6,
        imm: 4,
    });
    assert_eq!(jalr.uninferable_jump(), Some((6, 4)));
    assert_eq!(jalr.ras_kind(), RasKind::None);
}

#[test]
fn jalr_zero_source_is_inferable() {
    let jalr = Kind::jalr(format::TypeI {
        rd: 0,
        rs1: 0,
        imm: 100,
    });
    assert_eq!(jalr.inferable_jump_target(), Some(100));
    assert!(jalr.uninferable_jump().is_none());
}

#[test]
fn hwloop_setup_is_unsupported() {
    assert!(Kind::hwloop_setup.is_unsupported());
    assert!(!Kind::mret.is_unsupported());
}

#[test]
fn from_kind_sizes() {
    let normal: Instruction = Bits::Bit32(0).into();
    assert_eq!(normal.size, Size::Normal);
    let compressed: Instruction = Bits::Bit16(0).into();
    assert_eq!(compressed.size, Size::Compressed);
}
