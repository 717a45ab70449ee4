//! Recursive descent parser for CASM assembly
//!
//! One statement per line. `verify` and `symbolic` are matched on identifier
//! text, so `verify:` is still a label and `call symbolic` still calls one.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, Span, SpannedToken, Token};
use casm_spec::{short_string, Felt252, Register};

pub type ParseResult<T> = Result<T, ParseError>;

const VERIFY: &str = "verify";
const SYMBOLIC: &str = "symbolic";

/// Deepest expression tree accepted, counting brackets, parentheses,
/// unary minus and binary operators
pub const MAX_EXPR_DEPTH: usize = 256;

/// Parser over a tokenized source file
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(source: &str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            nesting: 0,
        })
    }

    /// Parse the whole file
    pub fn parse_file(&mut self) -> ParseResult<SourceFile> {
        let mut items = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Newline => self.advance(),
                Token::Ident(name) if self.peek_ahead(1) == Some(&Token::Colon) => {
                    let label = Label {
                        name: name.clone(),
                        span: self.current_span(),
                    };
                    self.advance();
                    self.advance();
                    items.push(Item::Label(label));
                }
                _ => items.push(Item::Statement(self.parse_statement()?)),
            }
        }
        Ok(SourceFile { items })
    }

    /// Parse one statement including its line terminator
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();

        let kind = match self.peek() {
            Some(Token::Jmp) => self.parse_jump()?,
            Some(Token::Call) => self.parse_call()?,
            Some(Token::Ret) => {
                self.advance();
                StatementKind::Ret
            }
            Some(Token::Ap) => {
                self.advance();
                self.expect(Token::PlusEq)?;
                StatementKind::AddAp {
                    value: self.parse_expr()?,
                }
            }
            Some(Token::Assert) => {
                self.advance();
                let (lhs, op, rhs) = self.parse_comparison()?;
                StatementKind::Assert(AssertStmt { lhs, op, rhs })
            }
            Some(Token::Ident(name)) if name == VERIFY => {
                self.advance();
                let (lhs, op, rhs) = self.parse_comparison()?;
                let span = start.merge(self.prev_span());
                StatementKind::Verify(VerifyStmt { lhs, op, rhs, span })
            }
            _ => {
                let dst = self.parse_expr()?;
                self.expect(Token::Assign)?;
                let res = self.parse_expr()?;
                StatementKind::AssertEq { dst, res }
            }
        };

        let ap_pp = self.parse_ap_pp()?;
        if ap_pp && !kind.allows_ap_pp() {
            return Err(ParseError::InvalidSyntax {
                message: "'ap++' is only allowed after an assert-equal or a jump".to_string(),
                span: self.prev_span(),
            });
        }

        let span = start.merge(self.prev_span());
        self.expect_end_of_line()?;
        Ok(Statement { kind, ap_pp, span })
    }

    fn parse_ap_pp(&mut self) -> ParseResult<bool> {
        if !self.match_token(&Token::Semicolon) {
            return Ok(false);
        }
        self.expect(Token::Ap)?;
        self.expect(Token::PlusPlus)?;
        Ok(true)
    }

    fn expect_end_of_line(&mut self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Newline) => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "end of line".to_string(),
                found: other.describe(),
                span: self.current_span(),
            }),
        }
    }

    /// `<expr> (== | !=) <expr>`
    fn parse_comparison(&mut self) -> ParseResult<(Expr, RelOp, Expr)> {
        let lhs = self.parse_expr()?;
        let op = self.parse_relop()?;
        let rhs = self.parse_expr()?;
        Ok((lhs, op, rhs))
    }

    fn parse_relop(&mut self) -> ParseResult<RelOp> {
        let op = match self.peek() {
            Some(Token::EqEq) => RelOp::Eq,
            Some(Token::NotEq) => RelOp::Ne,
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "'==' or '!='".to_string(),
                    found: describe(other),
                    span: self.current_span(),
                })
            }
        };
        self.advance();
        Ok(op)
    }

    fn parse_jump(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Jmp)?;
        let target = self.parse_jump_target()?;

        let condition = if self.match_token(&Token::If) {
            if matches!(target, JumpTarget::Abs(_)) {
                return Err(ParseError::InvalidSyntax {
                    message: "conditional jumps must be relative".to_string(),
                    span: self.prev_span(),
                });
            }
            let condition = self.parse_expr()?;
            self.expect(Token::NotEq)?;
            let zero_span = self.current_span();
            let zero = self.parse_primary()?;
            if zero.kind != ExprKind::Int(Felt252::ZERO) {
                return Err(ParseError::InvalidSyntax {
                    message: "jump condition must compare against 0".to_string(),
                    span: zero_span,
                });
            }
            Some(condition)
        } else {
            None
        };

        Ok(StatementKind::Jump { target, condition })
    }

    fn parse_call(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Call)?;
        Ok(StatementKind::Call {
            target: self.parse_jump_target()?,
        })
    }

    fn parse_jump_target(&mut self) -> ParseResult<JumpTarget> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Abs) => {
                self.advance();
                Ok(JumpTarget::Abs(self.parse_expr()?))
            }
            Some(Token::Rel) => {
                self.advance();
                Ok(JumpTarget::Rel(self.parse_expr()?))
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(JumpTarget::Label(name, span))
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "'abs', 'rel' or a label".to_string(),
                found: describe(other),
                span,
            }),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parse an expression (`+` and `-` bind looser than `*`)
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.expr().map(|(expr, _)| expr)
    }

    // Each expression parser returns the height of the tree it built

    fn expr(&mut self) -> ParseResult<(Expr, usize)> {
        let (mut lhs, mut height) = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let (rhs, rhs_height) = self.term()?;
            lhs = binary(op, lhs, rhs);
            height = check_height(height.max(rhs_height) + 1, lhs.span)?;
        }
        Ok((lhs, height))
    }

    fn term(&mut self) -> ParseResult<(Expr, usize)> {
        let (mut lhs, mut height) = self.unary()?;
        while self.match_token(&Token::Star) {
            let (rhs, rhs_height) = self.unary()?;
            lhs = binary(BinOp::Mul, lhs, rhs);
            height = check_height(height.max(rhs_height) + 1, lhs.span)?;
        }
        Ok((lhs, height))
    }

    fn unary(&mut self) -> ParseResult<(Expr, usize)> {
        let start = self.current_span();
        if self.match_token(&Token::Minus) {
            self.enter(start)?;
            let (operand, height) = self.unary()?;
            self.nesting -= 1;
            let span = start.merge(operand.span);
            let expr = Expr::new(ExprKind::Neg(Box::new(operand)), span);
            return Ok((expr, check_height(height + 1, span)?));
        }
        self.primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        self.primary().map(|(expr, _)| expr)
    }

    fn primary(&mut self) -> ParseResult<(Expr, usize)> {
        let span = self.current_span();
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => {
                return Err(ParseError::UnexpectedEof {
                    expected: "expression".to_string(),
                    span,
                })
            }
        };

        let leaf = |kind: ExprKind| -> ParseResult<(Expr, usize)> {
            Ok((Expr::new(kind, span), 1))
        };
        match token {
            Token::Int(digits) => {
                self.advance();
                let value = Felt252::from_dec_str(&digits)
                    .map_err(|source| ParseError::InvalidLiteral { source, span })?;
                leaf(ExprKind::Int(value))
            }
            Token::Hex(digits) => {
                self.advance();
                let value = Felt252::from_hex_str(&digits)
                    .map_err(|source| ParseError::InvalidLiteral { source, span })?;
                leaf(ExprKind::Int(value))
            }
            Token::ShortString(text) => {
                self.advance();
                short_string::encode(&text)
                    .map_err(|source| ParseError::ShortString { source, span })?;
                leaf(ExprKind::ShortString(text))
            }
            Token::Ap => {
                self.advance();
                leaf(ExprKind::Register(Register::Ap))
            }
            Token::Fp => {
                self.advance();
                leaf(ExprKind::Register(Register::Fp))
            }
            Token::LBracket => self.grouped(span, Token::RBracket, ExprKind::Deref),
            Token::LParen => self.grouped(span, Token::RParen, ExprKind::Paren),
            Token::Ident(name) if name == SYMBOLIC && self.peek_ahead(1) == Some(&Token::LParen) => {
                let symbolic = self.parse_symbolic()?;
                let span = symbolic.span;
                Ok((Expr::new(ExprKind::Symbolic(symbolic), span), 1))
            }
            Token::Ident(name) => {
                self.advance();
                leaf(ExprKind::Ident(name))
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other.describe(),
                span,
            }),
        }
    }

    /// `[ <expr> ]` or `( <expr> )`, opening token not yet consumed
    fn grouped(
        &mut self,
        open: Span,
        close: Token,
        wrap: fn(Box<Expr>) -> ExprKind,
    ) -> ParseResult<(Expr, usize)> {
        self.advance();
        self.enter(open)?;
        let (inner, height) = self.expr()?;
        self.expect(close)?;
        self.nesting -= 1;
        let span = open.merge(self.prev_span());
        Ok((Expr::new(wrap(Box::new(inner)), span), check_height(height + 1, span)?))
    }

    fn enter(&mut self, span: Span) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_EXPR_DEPTH {
            return Err(too_deep(span));
        }
        Ok(())
    }

    /// `symbolic ( <type> , '<tag>' )`
    fn parse_symbolic(&mut self) -> ParseResult<SymbolicExpr> {
        let start = self.current_span();
        self.advance();
        self.expect(Token::LParen)?;
        let ty = self.parse_type()?;
        self.expect(Token::Comma)?;

        let tag_span = self.current_span();
        let tag = match self.peek() {
            Some(Token::ShortString(text)) => text.clone(),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "short string tag".to_string(),
                    found: describe(other),
                    span: tag_span,
                })
            }
        };
        self.advance();
        short_string::encode(&tag).map_err(|source| ParseError::ShortString {
            source,
            span: start,
        })?;

        self.expect(Token::RParen)?;
        Ok(SymbolicExpr {
            ty,
            tag,
            span: start.merge(self.prev_span()),
        })
    }

    /// `<name> *...`
    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.current_span();
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "type name".to_string(),
                    found: describe(other),
                    span: start,
                })
            }
        };
        self.advance();

        let mut pointer_depth = 0;
        while self.match_token(&Token::Star) {
            pointer_depth += 1;
        }
        Ok(TypeExpr {
            name,
            pointer_depth,
            span: start.merge(self.prev_span()),
        })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span,
            None => self.end_span(),
        }
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn end_span(&self) -> Span {
        match self.tokens.last() {
            Some(last) => {
                let width = last.span.end - last.span.start;
                Span::new(last.span.end, last.span.end, last.span.line, last.span.column + width)
            }
            None => Span::new(0, 0, 1, 1),
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.match_token(&token) {
            return Ok(());
        }
        let span = self.current_span();
        match self.peek() {
            Some(found) => Err(ParseError::UnexpectedToken {
                expected: token.describe(),
                found: found.describe(),
                span,
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: token.describe(),
                span,
            }),
        }
    }
}

fn describe(token: Option<&Token>) -> String {
    token
        .map(Token::describe)
        .unwrap_or_else(|| "end of input".to_string())
}

fn too_deep(span: Span) -> ParseError {
    ParseError::InvalidSyntax {
        message: format!("expression nested deeper than {} levels", MAX_EXPR_DEPTH),
        span,
    }
}

fn check_height(height: usize, span: Span) -> ParseResult<usize> {
    if height > MAX_EXPR_DEPTH {
        return Err(too_deep(span));
    }
    Ok(height)
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span.merge(rhs.span);
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}

/// Parse source text into a [`SourceFile`]
pub fn parse(source: &str) -> ParseResult<SourceFile> {
    Parser::new(source)?.parse_file()
}
