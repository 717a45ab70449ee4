//! # Instruction Encoding Constants and Pattern Tables
//!
//! Centralized bit layout for the 63-bit CASM instruction word, shared by the
//! assembler's encoder and the disassembler's decoder.
//!
//! ## Instruction Word
//!
//! ```text
//! bits  0..16  off0 + 2^15
//! bits 16..32  off1 + 2^15
//! bits 32..48  off2 + 2^15
//! bits 48..64  flags
//!
//! flag  0      dst register  (0 = ap, 1 = fp)
//! flag  1      op0 register
//! flags 2..5   op1 source    (000 op0, 001 imm, 010 fp, 100 ap)
//! flags 5..7   res logic     (00 op1, 01 add, 10 mul, 11 symbolic)
//! flags 7..10  pc update     (000 regular, 001 jump, 010 jump_rel, 100 jnz)
//! flags 10..12 ap update     (00 regular, 01 add, 10 add1)
//! flags 12..15 opcode        (000 nop, 001 call, 010 ret, 100 assert_eq)
//! flag  15     reserved, always 0
//! ```
//!
//! Every categorical field maps through an explicit pattern table. The res
//! table is versioned: [`EncodingVersion::Legacy`] knows three patterns,
//! [`EncodingVersion::Symbolic`] adds `0b11`, which no legacy word can carry.

use crate::instruction::{ApUpdate, Op1Addr, Opcode, PcUpdate, Res};
use serde::{Deserialize, Serialize};

// ============================================================================
// Bit Position Constants
// ============================================================================

/// Width of each offset lane
pub const OFFSET_BITS: u32 = 16;

/// Bias added to a signed offset to make its lane non-negative
pub const OFFSET_BIAS: i32 = 1 << 15;

pub const OFF0_SHIFT: u32 = 0;
pub const OFF1_SHIFT: u32 = 16;
pub const OFF2_SHIFT: u32 = 32;
pub const FLAGS_SHIFT: u32 = 48;

pub const DST_REG_BIT: u32 = 0;
pub const OP0_REG_BIT: u32 = 1;
pub const OP1_SRC_SHIFT: u32 = 2;
pub const RES_SHIFT: u32 = 5;
pub const PC_UPDATE_SHIFT: u32 = 7;
pub const AP_UPDATE_SHIFT: u32 = 10;
pub const OPCODE_SHIFT: u32 = 12;
pub const RESERVED_BIT: u32 = 15;

// ============================================================================
// Field Masks
// ============================================================================

pub const OFFSET_MASK: u64 = 0xFFFF;
pub const FLAGS_MASK: u64 = 0xFFFF;
pub const OP1_SRC_MASK: u64 = 0b111;
pub const RES_MASK: u64 = 0b11;
pub const PC_UPDATE_MASK: u64 = 0b111;
pub const AP_UPDATE_MASK: u64 = 0b11;
pub const OPCODE_MASK: u64 = 0b111;

// ============================================================================
// Pattern Tables
// ============================================================================

pub const OP1_SRC_TABLE: [(u64, Op1Addr); 4] = [
    (0b000, Op1Addr::Op0),
    (0b001, Op1Addr::Imm),
    (0b010, Op1Addr::Fp),
    (0b100, Op1Addr::Ap),
];

pub const PC_UPDATE_TABLE: [(u64, PcUpdate); 4] = [
    (0b000, PcUpdate::Regular),
    (0b001, PcUpdate::Jump),
    (0b010, PcUpdate::JumpRel),
    (0b100, PcUpdate::Jnz),
];

/// `Add2` is not stored; it is implied by `call` and written as `0b00`
pub const AP_UPDATE_TABLE: [(u64, ApUpdate); 3] = [
    (0b00, ApUpdate::Regular),
    (0b01, ApUpdate::Add),
    (0b10, ApUpdate::Add1),
];

pub const OPCODE_TABLE: [(u64, Opcode); 4] = [
    (0b000, Opcode::Nop),
    (0b001, Opcode::Call),
    (0b010, Opcode::Ret),
    (0b100, Opcode::AssertEq),
];

/// What a res bit pattern selects before `pc_update` is taken into account
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResLogic {
    /// `Res::Op1`, or `Res::Unconstrained` under `jnz`
    Op1,
    Add,
    Mul,
    Symbolic,
}

pub const LEGACY_RES_TABLE: [(u64, ResLogic); 3] = [
    (0b00, ResLogic::Op1),
    (0b01, ResLogic::Add),
    (0b10, ResLogic::Mul),
];

pub const SYMBOLIC_RES_TABLE: [(u64, ResLogic); 4] = [
    (0b00, ResLogic::Op1),
    (0b01, ResLogic::Add),
    (0b10, ResLogic::Mul),
    (0b11, ResLogic::Symbolic),
];

/// Revision of the res pattern table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncodingVersion {
    /// Four result modes: op1, add, mul, unconstrained
    Legacy,
    /// Legacy plus `symbolic` on the previously invalid pattern `0b11`
    #[default]
    Symbolic,
}

impl EncodingVersion {
    pub const CURRENT: Self = Self::Symbolic;

    pub fn res_table(self) -> &'static [(u64, ResLogic)] {
        match self {
            Self::Legacy => &LEGACY_RES_TABLE,
            Self::Symbolic => &SYMBOLIC_RES_TABLE,
        }
    }

    pub fn supports(self, res: Res) -> bool {
        let logic = res_logic(res);
        self.res_table().iter().any(|&(_, l)| l == logic)
    }
}

// ============================================================================
// Table Lookups
// ============================================================================

fn lookup_bits<T: PartialEq + Copy>(table: &[(u64, T)], value: T) -> Option<u64> {
    table.iter().find(|&&(_, v)| v == value).map(|&(bits, _)| bits)
}

fn lookup_value<T: Copy>(table: &[(u64, T)], bits: u64) -> Option<T> {
    table.iter().find(|&&(b, _)| b == bits).map(|&(_, v)| v)
}

pub fn res_logic(res: Res) -> ResLogic {
    match res {
        Res::Op1 | Res::Unconstrained => ResLogic::Op1,
        Res::Add => ResLogic::Add,
        Res::Mul => ResLogic::Mul,
        Res::Symbolic => ResLogic::Symbolic,
    }
}

/// Res bit pattern, or None if `version` has no pattern for `res`
pub fn res_to_bits(res: Res, version: EncodingVersion) -> Option<u64> {
    lookup_bits(version.res_table(), res_logic(res))
}

/// Res member for a bit pattern; `pc_update` disambiguates op1/unconstrained
///
/// Returns None for patterns outside the table and for any non-op1 pattern
/// under `jnz`.
pub fn res_from_bits(bits: u64, pc_update: PcUpdate, version: EncodingVersion) -> Option<Res> {
    let logic = lookup_value(version.res_table(), bits)?;
    match (logic, pc_update) {
        (ResLogic::Op1, PcUpdate::Jnz) => Some(Res::Unconstrained),
        (_, PcUpdate::Jnz) => None,
        (ResLogic::Op1, _) => Some(Res::Op1),
        (ResLogic::Add, _) => Some(Res::Add),
        (ResLogic::Mul, _) => Some(Res::Mul),
        (ResLogic::Symbolic, _) => Some(Res::Symbolic),
    }
}

pub fn op1_addr_to_bits(op1_addr: Op1Addr) -> u64 {
    lookup_bits(&OP1_SRC_TABLE, op1_addr).unwrap_or(0)
}

pub fn op1_addr_from_bits(bits: u64) -> Option<Op1Addr> {
    lookup_value(&OP1_SRC_TABLE, bits)
}

pub fn pc_update_to_bits(pc_update: PcUpdate) -> u64 {
    lookup_bits(&PC_UPDATE_TABLE, pc_update).unwrap_or(0)
}

pub fn pc_update_from_bits(bits: u64) -> Option<PcUpdate> {
    lookup_value(&PC_UPDATE_TABLE, bits)
}

pub fn ap_update_to_bits(ap_update: ApUpdate) -> u64 {
    // Add2 is implied by the call opcode
    lookup_bits(&AP_UPDATE_TABLE, ap_update).unwrap_or(0)
}

pub fn ap_update_from_bits(bits: u64) -> Option<ApUpdate> {
    lookup_value(&AP_UPDATE_TABLE, bits)
}

pub fn opcode_to_bits(opcode: Opcode) -> u64 {
    lookup_bits(&OPCODE_TABLE, opcode).unwrap_or(0)
}

pub fn opcode_from_bits(bits: u64) -> Option<Opcode> {
    lookup_value(&OPCODE_TABLE, bits)
}

// ============================================================================
// Field Extraction Functions
// ============================================================================

/// Bias a signed offset into its lane (caller checks the range)
#[inline]
pub const fn encode_offset(offset: i32) -> u64 {
    ((offset + OFFSET_BIAS) as u64) & OFFSET_MASK
}

/// Remove the bias from an offset lane
#[inline]
pub const fn decode_offset(lane: u64) -> i32 {
    (lane & OFFSET_MASK) as i32 - OFFSET_BIAS
}

#[inline]
pub const fn extract_off0(word: u64) -> i32 {
    decode_offset(word >> OFF0_SHIFT)
}

#[inline]
pub const fn extract_off1(word: u64) -> i32 {
    decode_offset(word >> OFF1_SHIFT)
}

#[inline]
pub const fn extract_off2(word: u64) -> i32 {
    decode_offset(word >> OFF2_SHIFT)
}

#[inline]
pub const fn extract_flags(word: u64) -> u64 {
    (word >> FLAGS_SHIFT) & FLAGS_MASK
}

/// Bits of `flags` selected by `mask` after shifting right by `shift`
#[inline]
pub const fn flag_span(flags: u64, shift: u32, mask: u64) -> u64 {
    (flags >> shift) & mask
}
