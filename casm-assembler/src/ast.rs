//! Abstract syntax tree for CASM source
//!
//! Nodes only carry what the parser validated plus a [`Span`]; all semantic
//! checks happen in the code generator.

use crate::lexer::Span;
use casm_spec::{Felt252, Register};

/// A parsed source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Label(Label),
    Statement(Statement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub span: Span,
}

/// One line of code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Trailing `; ap++`
    pub ap_pp: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `<dst> = <res>`
    AssertEq { dst: Expr, res: Expr },
    /// `jmp ...`, optionally conditional
    Jump {
        target: JumpTarget,
        condition: Option<Expr>,
    },
    /// `call ...`
    Call { target: JumpTarget },
    Ret,
    /// `ap += <op1>`
    AddAp { value: Expr },
    /// `assert <lhs> <op> <rhs>`
    Assert(AssertStmt),
    /// `verify <lhs> <op> <rhs>`
    Verify(VerifyStmt),
}

impl StatementKind {
    /// Whether a trailing `; ap++` is accepted
    pub fn allows_ap_pp(&self) -> bool {
        match self {
            StatementKind::AssertEq { .. } | StatementKind::Jump { .. } => true,
            StatementKind::Assert(stmt) => stmt.op == RelOp::Eq,
            StatementKind::Verify(stmt) => stmt.op == RelOp::Eq,
            StatementKind::Call { .. } | StatementKind::Ret | StatementKind::AddAp { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Abs(Expr),
    Rel(Expr),
    /// Relative jump to a label
    Label(String, Span),
}

/// Relational operator of `assert` and `verify`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertStmt {
    pub lhs: Expr,
    pub op: RelOp,
    pub rhs: Expr,
}

/// `verify lhs op rhs`; lowered exactly like [`AssertStmt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyStmt {
    pub lhs: Expr,
    pub op: RelOp,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Strip redundant parentheses
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Integer literal, already reduced into the field
    Int(Felt252),
    /// `'text'`
    ShortString(String),
    /// Bare `ap` / `fp`
    Register(Register),
    /// Label reference
    Ident(String),
    /// `[inner]`
    Deref(Box<Expr>),
    Neg(Box<Expr>),
    Paren(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Symbolic(SymbolicExpr),
}

/// `symbolic(<type>, '<tag>')`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicExpr {
    pub ty: TypeExpr,
    pub tag: String,
    pub span: Span,
}

/// A type name followed by zero or more `*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
    pub pointer_depth: usize,
    pub span: Span,
}
