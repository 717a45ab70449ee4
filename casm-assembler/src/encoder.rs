//! Instruction encoding to the 63-bit CASM word
//!
//! Every categorical field goes through the pattern tables in
//! [`casm_spec::encoding`]; the res field uses the table of the requested
//! [`EncodingVersion`].

use casm_spec::encoding::*;
use casm_spec::{EncodingVersion, Felt252, FieldError, Instruction};
use tracing::trace;

/// An encoded instruction: the word and, when op1 is immediate, the word after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedInstruction {
    pub word: u64,
    pub imm: Option<Felt252>,
}

impl EncodedInstruction {
    /// Memory words in order
    pub fn words(&self) -> impl Iterator<Item = Felt252> {
        std::iter::once(Felt252::from_u64(self.word)).chain(self.imm)
    }
}

/// Encode with the current encoding
pub fn encode(instr: &Instruction) -> Result<EncodedInstruction, FieldError> {
    encode_with(instr, EncodingVersion::CURRENT)
}

/// Encode with an explicit res table revision
pub fn encode_with(
    instr: &Instruction,
    version: EncodingVersion,
) -> Result<EncodedInstruction, FieldError> {
    instr.validate(version)?;

    let res_bits = res_to_bits(instr.res, version).ok_or(FieldError::UnsupportedRes {
        res: instr.res,
        version,
    })?;

    let flags = (instr.dst_register.bit() << DST_REG_BIT)
        | (instr.op0_register.bit() << OP0_REG_BIT)
        | (op1_addr_to_bits(instr.op1_addr) << OP1_SRC_SHIFT)
        | (res_bits << RES_SHIFT)
        | (pc_update_to_bits(instr.pc_update) << PC_UPDATE_SHIFT)
        | (ap_update_to_bits(instr.ap_update) << AP_UPDATE_SHIFT)
        | (opcode_to_bits(instr.opcode) << OPCODE_SHIFT);

    let word = (encode_offset(instr.off0) << OFF0_SHIFT)
        | (encode_offset(instr.off1) << OFF1_SHIFT)
        | (encode_offset(instr.off2) << OFF2_SHIFT)
        | (flags << FLAGS_SHIFT);

    trace!(word = format_args!("{:#018x}", word), res = ?instr.res, "encoded instruction");
    Ok(EncodedInstruction {
        word,
        imm: instr.imm,
    })
}
