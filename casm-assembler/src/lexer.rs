//! # Lexer for CASM assembly
//!
//! Tokens come from a `logos` enum; [`tokenize`] attaches a [`Span`] with a
//! 1-indexed line and column to each of them.

use crate::error::ParseError;
use logos::Logos;
use std::fmt;

/// A region of source text
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in characters)
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering both `self` and `other`
    pub fn merge(self, other: Self) -> Self {
        let first = if self.start <= other.start { self } else { other };
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Tokens for CASM assembly
///
/// `verify` and `symbolic` are not keywords here; the parser recognizes them
/// from [`Token::Ident`] so they stay usable as label names.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"(#|//)[^\n]*")]
pub enum Token {
    #[token("\n")]
    Newline,

    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("+=")]
    PlusEq,
    #[token("++")]
    PlusPlus,

    #[token("ap")]
    Ap,
    #[token("fp")]
    Fp,
    #[token("jmp")]
    Jmp,
    #[token("call")]
    Call,
    #[token("ret")]
    Ret,
    #[token("abs")]
    Abs,
    #[token("rel")]
    Rel,
    #[token("if")]
    If,
    #[token("assert")]
    Assert,

    /// Labels, type names and contextual keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Decimal digits; range-checked by the parser
    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    Int(String),

    /// Hex digits without the `0x` prefix
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice()[2..].to_string())]
    Hex(String),

    /// Short string contents without the quotes
    #[regex(r"'[^'\n]*'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    ShortString(String),
}

impl Token {
    /// Human readable name used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            Token::Newline => "end of line".to_string(),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Int(digits) => format!("integer {}", digits),
            Token::Hex(digits) => format!("integer 0x{}", digits),
            Token::ShortString(text) => format!("short string '{}'", text),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::PlusEq => "+=",
            Token::PlusPlus => "++",
            Token::Ap => "ap",
            Token::Fp => "fp",
            Token::Jmp => "jmp",
            Token::Call => "call",
            Token::Ret => "ret",
            Token::Abs => "abs",
            Token::Rel => "rel",
            Token::If => "if",
            Token::Assert => "assert",
            Token::Newline
            | Token::Ident(_)
            | Token::Int(_)
            | Token::Hex(_)
            | Token::ShortString(_) => "",
        }
    }
}

/// A token with its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Split `source` into spanned tokens
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    let span_of = |range: std::ops::Range<usize>| {
        let line = line_starts.partition_point(|&start| start <= range.start);
        let line_start = line_starts[line - 1];
        let column = source[line_start..range.start].chars().count() + 1;
        Span::new(range.start, range.end, line, column)
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = span_of(lexer.span());
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(ParseError::InvalidToken {
                    text: lexer.slice().to_string(),
                    span,
                })
            }
        }
    }
    Ok(tokens)
}
