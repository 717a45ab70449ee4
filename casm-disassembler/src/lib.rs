//! # CASM Disassembler
//!
//! Decode instruction words back into logical instructions and render
//! programs as casm text.
//!
//! Decoding accepts words from either res table revision: a word written
//! before `symbolic` existed decodes to the same instruction under
//! [`casm_spec::EncodingVersion::Legacy`] and
//! [`casm_spec::EncodingVersion::Symbolic`]. Symbolic tags are never
//! recovered implicitly; call [`recover_symbolic_tag`].
//!
//! ## Example
//!
//! ```rust
//! use casm_disassembler::{decode, format, recover_symbolic_tag};
//! use casm_spec::{short_string, Res};
//!
//! let tag = short_string::encode("sym0").unwrap();
//! let instr = decode(0x4866_8001_7fff_8000, Some(tag)).unwrap();
//!
//! assert_eq!(instr.res, Res::Symbolic);
//! assert_eq!(recover_symbolic_tag(&instr).unwrap().as_deref(), Some("sym0"));
//! assert_eq!(format(&instr), "[ap] = symbolic(felt, 'sym0'); ap++");
//! ```

pub mod error;
pub mod decoder;
pub mod formatter;
pub mod disassembler;

pub use error::{DisassemblerError, Result};
pub use disassembler::disassemble;
pub use decoder::{
    decode, decode_program, decode_program_with, decode_with, instruction_word,
    recover_symbolic_tag, DecodedInstruction,
};
pub use formatter::format;
