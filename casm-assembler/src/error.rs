//! Assembler errors

use crate::lexer::Span;
use crate::types::TypeError;
use casm_spec::{ConfigError, EncodingVersion, FeltError, FieldError, ShortStringError};
use thiserror::Error;

/// Syntax errors (PARSE_ERROR), always with a source position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid token '{text}' at {span}")]
    InvalidToken { text: String, span: Span },

    #[error("unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input at {span}: expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("invalid integer literal at {span}: {source}")]
    InvalidLiteral { source: FeltError, span: Span },

    #[error("invalid short string at {span}: {source}")]
    ShortString {
        source: ShortStringError,
        span: Span,
    },

    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },
}

impl ParseError {
    /// Source position of the error
    pub fn span(&self) -> Span {
        match self {
            ParseError::InvalidToken { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::InvalidLiteral { span, .. }
            | ParseError::ShortString { span, .. }
            | ParseError::InvalidSyntax { span, .. } => *span,
        }
    }
}

/// Errors raised while lowering statements to instructions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("undefined label '{name}' at {span}")]
    UndefinedLabel { name: String, span: Span },

    #[error("duplicate label '{name}' at {span}")]
    DuplicateLabel { name: String, span: Span },

    #[error("invalid operand at {span}: {message}")]
    InvalidOperand { message: String, span: Span },

    #[error("offset {value} at {span} is outside [-32768, 32767]")]
    OffsetOutOfRange { value: String, span: Span },

    /// TAG_TOO_LONG / ENCODING_ERROR attributed to the literal or `symbolic(...)`
    #[error("short string at {span}: {source}")]
    ShortString {
        source: ShortStringError,
        span: Span,
    },

    #[error("symbolic result at {span} cannot be encoded with {version:?}")]
    SymbolicUnsupported {
        version: EncodingVersion,
        span: Span,
    },

    /// The type resolver's own error, passed through unchanged
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CodegenError {
    pub fn span(&self) -> Span {
        match self {
            CodegenError::UndefinedLabel { span, .. }
            | CodegenError::DuplicateLabel { span, .. }
            | CodegenError::InvalidOperand { span, .. }
            | CodegenError::OffsetOutOfRange { span, .. }
            | CodegenError::ShortString { span, .. }
            | CodegenError::SymbolicUnsupported { span, .. } => *span,
            CodegenError::Type(err) => err.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("code generation error: {0}")]
    Codegen(#[from] CodegenError),

    /// INVALID_FIELD: the code generator produced an ill-formed instruction
    #[error("internal encoder error at {span}: {source}")]
    Field { source: FieldError, span: Span },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl AssemblerError {
    /// Source position, if the error stems from source text
    pub fn span(&self) -> Option<Span> {
        match self {
            AssemblerError::Parse(err) => Some(err.span()),
            AssemblerError::Codegen(err) => Some(err.span()),
            AssemblerError::Field { span, .. } => Some(*span),
            AssemblerError::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
