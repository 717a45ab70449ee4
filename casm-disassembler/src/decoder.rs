//! Instruction decoder
//!
//! Exact inverse of the assembler's encoder. Every flag span is mapped back
//! through the pattern tables in [`casm_spec::encoding`]; a pattern with no
//! table entry is an error, never a best guess.

use crate::error::{DisassemblerError, Result};
use casm_spec::encoding::*;
use casm_spec::{
    short_string, ApUpdate, EncodingVersion, Felt252, Instruction, Op1Addr, Opcode, Register,
    WORD_BITS,
};
use tracing::trace;

/// Decode with the current encoding
///
/// `imm` is the memory word following `word`; it is only consumed when op1
/// is an immediate.
pub fn decode(word: u64, imm: Option<Felt252>) -> Result<Instruction> {
    decode_with(word, imm, EncodingVersion::CURRENT)
}

/// Decode with an explicit res table revision
pub fn decode_with(
    word: u64,
    imm: Option<Felt252>,
    version: EncodingVersion,
) -> Result<Instruction> {
    if word >> WORD_BITS != 0 {
        return Err(DisassemblerError::ReservedBit(word));
    }

    let flags = extract_flags(word);
    let span = |shift: u32, mask: u64| flag_span(flags, shift, mask);

    let bits = span(OP1_SRC_SHIFT, OP1_SRC_MASK);
    let op1_addr = op1_addr_from_bits(bits).ok_or_else(|| undefined(word, "op1_src", bits))?;

    let bits = span(PC_UPDATE_SHIFT, PC_UPDATE_MASK);
    let pc_update = pc_update_from_bits(bits).ok_or_else(|| undefined(word, "pc_update", bits))?;

    let bits = span(RES_SHIFT, RES_MASK);
    let res = res_from_bits(bits, pc_update, version).ok_or_else(|| undefined(word, "res", bits))?;

    let bits = span(AP_UPDATE_SHIFT, AP_UPDATE_MASK);
    let ap_update = ap_update_from_bits(bits).ok_or_else(|| undefined(word, "ap_update", bits))?;

    let bits = span(OPCODE_SHIFT, OPCODE_MASK);
    let opcode = opcode_from_bits(bits).ok_or_else(|| undefined(word, "opcode", bits))?;

    // Add2 is stored as 00 and implied by call
    let ap_update = match (opcode, ap_update) {
        (Opcode::Call, ApUpdate::Regular) => ApUpdate::Add2,
        (_, ap_update) => ap_update,
    };

    let imm = match op1_addr {
        Op1Addr::Imm => Some(imm.ok_or(DisassemblerError::MissingImmediate { word })?),
        _ => None,
    };

    let instr = Instruction {
        off0: extract_off0(word),
        off1: extract_off1(word),
        off2: extract_off2(word),
        imm,
        dst_register: Register::from_bit(flags >> DST_REG_BIT),
        op0_register: Register::from_bit(flags >> OP0_REG_BIT),
        op1_addr,
        res,
        pc_update,
        ap_update,
        fp_update: opcode.implied_fp_update(),
        opcode,
    };
    instr
        .validate(version)
        .map_err(|source| DisassemblerError::InconsistentFields { word, source })?;

    trace!(word = format_args!("{:#018x}", word), res = ?instr.res, "decoded instruction");
    Ok(instr)
}

fn undefined(word: u64, field: &'static str, bits: u64) -> DisassemblerError {
    DisassemblerError::UndefinedPattern { word, field, bits }
}

/// Interpret a memory word as an instruction word
pub fn instruction_word(value: Felt252) -> Result<u64> {
    value
        .to_u64()
        .filter(|word| word >> WORD_BITS == 0)
        .ok_or(DisassemblerError::WordOutOfRange(value))
}

/// One instruction found in a word stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub pc: u64,
    pub word: u64,
    pub instruction: Instruction,
}

/// Walk a word stream with the current encoding
pub fn decode_program(words: &[Felt252]) -> Result<Vec<DecodedInstruction>> {
    decode_program_with(words, EncodingVersion::CURRENT)
}

/// Walk a word stream, stopping at the first word that does not decode
pub fn decode_program_with(
    words: &[Felt252],
    version: EncodingVersion,
) -> Result<Vec<DecodedInstruction>> {
    let mut decoded = Vec::new();
    let mut pc = 0;
    while pc < words.len() {
        let word = instruction_word(words[pc])?;
        let instruction = decode_with(word, words.get(pc + 1).copied(), version)?;
        decoded.push(DecodedInstruction {
            pc: pc as u64,
            word,
            instruction,
        });
        pc += instruction.size();
    }
    Ok(decoded)
}

/// Recover the tag of a symbolic load
///
/// Returns `Ok(None)` for every other instruction. Decoding never does this
/// on its own; callers that care about tags ask for them.
pub fn recover_symbolic_tag(instr: &Instruction) -> Result<Option<String>> {
    match instr.imm {
        Some(imm) if instr.is_symbolic() => Ok(Some(short_string::decode(imm)?)),
        _ => Ok(None),
    }
}
