//! # CASM Specification
//!
//! Shared definitions for the CASM assembler and disassembler.
//!
//! ## Key Features
//! - Field elements modulo the STARK prime (2^251 + 17·2^192 + 1)
//! - Logical instruction model with five result modes, including `symbolic`
//! - Versioned 63-bit instruction word layout
//! - Short string codec for literals and symbolic tags
//! - Program artifact with SHA-256 checksum

pub mod config;
pub mod encoding;
pub mod error;
pub mod field;
pub mod instruction;
pub mod program;
pub mod register;
pub mod short_string;

pub use config::{Config, ConfigError};
pub use encoding::EncodingVersion;
pub use error::{CasmError, FeltError, FieldError, ShortStringError};
pub use field::{Felt252, FELT_BYTES, STARK_PRIME};
pub use instruction::{
    ApUpdate, FpUpdate, Instruction, Op1Addr, Opcode, PcUpdate, Res, OFFSET_MAX, OFFSET_MIN,
};
pub use program::{InstructionLocation, Program, MAGIC, VERSION};
pub use register::Register;
pub use short_string::MAX_SHORT_STRING_LEN;

/// Instruction words occupy the low 63 bits of a field element
pub const WORD_BITS: u32 = 63;
