//! # Error Types for CASM

use crate::config::ConfigError;
use crate::encoding::EncodingVersion;
use crate::instruction::{ApUpdate, FpUpdate, Op1Addr, Opcode, PcUpdate, Res};
use thiserror::Error;

/// Field element parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeltError {
    #[error("Empty numeric literal")]
    Empty,

    #[error("Invalid digit '{0}' in numeric literal")]
    InvalidDigit(char),

    #[error("Value {0} is out of range for a field element")]
    OutOfRange(String),
}

/// Short string codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortStringError {
    /// TAG_TOO_LONG
    #[error("Short string '{text}' has length {len}, maximum is {max}")]
    TooLong { text: String, len: usize, max: usize },

    /// ENCODING_ERROR on the encode side
    #[error("Short string contains non-printable or non-ASCII character {0:?}")]
    NonAscii(char),

    /// ENCODING_ERROR on the decode side: a lane outside printable ASCII
    #[error("Byte {byte:#04x} at lane {lane} is not printable ASCII")]
    Unprintable { byte: u8, lane: usize },

    /// ENCODING_ERROR on the decode side: the value needs more than 31 lanes
    #[error("Value {0:#x} does not fit in a short string")]
    Overflow(crate::Felt252),
}

/// Ill-formed logical instruction handed to the encoder (INVALID_FIELD)
///
/// This is an internal error: the code generator never produces such values
/// from valid source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Offset {field} = {value} is outside [-32768, 32767]")]
    OffsetOutOfRange { field: &'static str, value: i32 },

    #[error("Immediate presence does not match op1 source {op1_addr:?} (immediate present: {has_imm})")]
    ImmediateMismatch { op1_addr: Op1Addr, has_imm: bool },

    #[error("Result {res:?} is incompatible with pc update {pc_update:?}")]
    ResPcMismatch { res: Res, pc_update: PcUpdate },

    #[error("Symbolic result requires assert_eq with an immediate (got {opcode:?} with {op1_addr:?})")]
    SymbolicShape { opcode: Opcode, op1_addr: Op1Addr },

    #[error("Opcode {opcode:?} is incompatible with ap update {ap_update:?}")]
    ApUpdateMismatch { opcode: Opcode, ap_update: ApUpdate },

    #[error("Opcode {opcode:?} requires fp update {expected:?}, got {found:?}")]
    FpUpdateMismatch {
        opcode: Opcode,
        expected: FpUpdate,
        found: FpUpdate,
    },

    #[error("Result {res:?} has no encoding in {version:?}")]
    UnsupportedRes { res: Res, version: EncodingVersion },
}

/// Program format errors
#[derive(Debug, Error)]
pub enum CasmError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Invalid program magic: expected 0x4D534143, got {0:#010x}")]
    InvalidMagic(u32),

    #[error("Invalid program version: expected {expected:#010x}, found {found:#010x}")]
    InvalidVersion { expected: u32, found: u32 },

    #[error("Program truncated: expected at least {expected} bytes, found {found} bytes")]
    Truncated { expected: usize, found: usize },

    #[error("Word stream length {0} is not a multiple of 32 bytes")]
    UnalignedWordStream(usize),

    #[error("Word {index} is not a canonical field element")]
    NonCanonicalWord { index: usize },

    #[error("Checksum mismatch: program body was modified")]
    ChecksumMismatch,

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
