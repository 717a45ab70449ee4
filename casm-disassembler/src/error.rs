//! Disassembler errors

use casm_spec::{Felt252, FieldError, ShortStringError};
use thiserror::Error;

/// Decoding failures (INVALID_ENCODING) and tag recovery failures
///
/// Decoding runs on possibly foreign input, so none of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassemblerError {
    #[error("Word {0:#x} does not fit in 63 bits")]
    WordOutOfRange(Felt252),

    #[error("Reserved bit set in word {0:#018x}")]
    ReservedBit(u64),

    #[error("Undefined {field} pattern {bits:#b} in word {word:#018x}")]
    UndefinedPattern {
        word: u64,
        field: &'static str,
        bits: u64,
    },

    #[error("Inconsistent fields in word {word:#018x}: {source}")]
    InconsistentFields {
        word: u64,
        #[source]
        source: FieldError,
    },

    #[error("Word {word:#018x} reads an immediate past the end of the program")]
    MissingImmediate { word: u64 },

    #[error("Symbolic tag does not decode: {0}")]
    InvalidTag(#[from] ShortStringError),
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
