//! CASM Assembler
//!
//! Assemble CASM source into a program of 252-bit field element words.
//!
//! ## Example
//!
//! ```rust
//! use casm_assembler::assemble;
//!
//! let source = r#"
//!     [ap] = symbolic(felt, 'sym0'); ap++
//!     verify [ap - 1] != 0
//!     ret
//! "#;
//!
//! let program = assemble(source).unwrap();
//! assert_eq!(program.len(), 7);
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod codegen;
pub mod encoder;
pub mod assembler;
pub mod error;

pub use assembler::{assemble, assemble_with, lower, Assembler};
pub use codegen::{LoweredInstruction, SYMBOLIC_PLACEHOLDER};
pub use encoder::{encode, encode_with, EncodedInstruction};
pub use error::{AssemblerError, CodegenError, ParseError, Result};
pub use lexer::Span;
pub use parser::parse;
pub use types::{ResolvedType, TypeError, TypeTable};
