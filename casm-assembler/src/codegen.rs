//! # Code generation
//!
//! Lowers parsed statements to logical [`Instruction`]s.
//!
//! Generation runs twice over the source: the first pass only lays out pcs
//! and collects labels (instruction sizes never depend on label values), the
//! second pass resolves every label and produces the final output.
//!
//! ## Lowerings
//! - `<dst> = <res>` is one `assert_eq`.
//! - `assert a == b` and `verify a == b` are `a = b` (sides swapped when only
//!   `b` is a memory reference).
//! - `assert a != b` and `verify a != b` share the not-zero idiom:
//!   `jmp rel 4 if a != 0; a = 1` when `b` is the literal `0`, otherwise
//!   `a = [ap] + b; ap++`, `jmp rel 4 if [ap - 1] != 0`, `[ap - 1] = 1`.
//! - `<dst> = symbolic(T, 'tag')` is the load of `'tag'` with `res = Symbolic`.
//!   Inside a larger constant expression `symbolic(...)` folds to
//!   [`SYMBOLIC_PLACEHOLDER`].

use crate::ast::*;
use crate::error::CodegenError;
use crate::lexer::Span;
use crate::types::TypeTable;
use casm_spec::{
    short_string, ApUpdate, Config, Felt252, Instruction, Op1Addr, Opcode, PcUpdate, Register,
    Res, OFFSET_MAX, OFFSET_MIN,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Value of `symbolic(...)` when it appears inside a constant expression
pub const SYMBOLIC_PLACEHOLDER: Felt252 = Felt252::ZERO;

/// Size in words of `jnz` plus the following `assert_eq` with an immediate
const NOT_ZERO_SKIP: u64 = 4;

/// An instruction together with where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoweredInstruction {
    pub instruction: Instruction,
    pub pc: u64,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenOutput {
    pub instructions: Vec<LoweredInstruction>,
    pub labels: BTreeMap<String, u64>,
}

/// `[register + offset]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemRef {
    register: Register,
    offset: i32,
}

impl MemRef {
    const fn new(register: Register, offset: i32) -> Self {
        Self { register, offset }
    }
}

/// Filler for dst/op0 slots an instruction does not use
const UNUSED: MemRef = MemRef::new(Register::Fp, -1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand1 {
    Imm(Felt252),
    Mem(MemRef),
    /// `[[base] + offset]`
    Indirect { base: MemRef, offset: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResForm {
    Op1(Operand1),
    Binary { res: Res, op0: MemRef, op1: Operand1 },
    Symbolic(Felt252),
}

fn instruction(
    dst: MemRef,
    op0: MemRef,
    op1: Operand1,
    res: Res,
    pc_update: PcUpdate,
    ap_update: ApUpdate,
    opcode: Opcode,
) -> Instruction {
    let (op0, op1_addr, off2, imm) = match op1 {
        Operand1::Imm(value) => (op0, Op1Addr::Imm, 1, Some(value)),
        Operand1::Mem(mem) => {
            let addr = match mem.register {
                Register::Ap => Op1Addr::Ap,
                Register::Fp => Op1Addr::Fp,
            };
            (op0, addr, mem.offset, None)
        }
        Operand1::Indirect { base, offset } => (base, Op1Addr::Op0, offset, None),
    };

    Instruction {
        off0: dst.offset,
        off1: op0.offset,
        off2,
        imm,
        dst_register: dst.register,
        op0_register: op0.register,
        op1_addr,
        res,
        pc_update,
        ap_update,
        fp_update: opcode.implied_fp_update(),
        opcode,
    }
}

fn jnz(condition: MemRef, offset: u64) -> Instruction {
    instruction(
        condition,
        UNUSED,
        Operand1::Imm(Felt252::from_u64(offset)),
        Res::Unconstrained,
        PcUpdate::Jnz,
        ApUpdate::Regular,
        Opcode::Nop,
    )
}

fn ret() -> Instruction {
    instruction(
        MemRef::new(Register::Fp, -2),
        UNUSED,
        Operand1::Mem(UNUSED),
        Res::Op1,
        PcUpdate::Jump,
        ApUpdate::Regular,
        Opcode::Ret,
    )
}

fn invalid(span: Span, message: &str) -> CodegenError {
    CodegenError::InvalidOperand {
        message: message.to_string(),
        span,
    }
}

// ============================================================================
// Structural expression queries
// ============================================================================

/// No register or memory access anywhere inside
fn is_constant(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Int(_) | ExprKind::ShortString(_) | ExprKind::Ident(_) | ExprKind::Symbolic(_) => {
            true
        }
        ExprKind::Register(_) | ExprKind::Deref(_) => false,
        ExprKind::Neg(inner) | ExprKind::Paren(inner) => is_constant(inner),
        ExprKind::Binary { lhs, rhs, .. } => is_constant(lhs) && is_constant(rhs),
    }
}

/// Constant made of literals only (no labels, no `symbolic`)
fn is_literal(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Int(_) | ExprKind::ShortString(_) => true,
        ExprKind::Neg(inner) | ExprKind::Paren(inner) => is_literal(inner),
        ExprKind::Binary { lhs, rhs, .. } => is_literal(lhs) && is_literal(rhs),
        _ => false,
    }
}

/// Split `base ± c ± c ...` into the base and its signed offset terms
fn split_offset(inner: &Expr) -> (&Expr, Vec<(bool, &Expr)>) {
    let mut base = inner.unparen();
    let mut terms = Vec::new();
    while let ExprKind::Binary { op, lhs, rhs } = &base.kind {
        if !matches!(op, BinOp::Add | BinOp::Sub) || !is_constant(rhs) {
            break;
        }
        terms.push((*op == BinOp::Sub, rhs.as_ref()));
        base = lhs.unparen();
    }
    (base, terms)
}

/// `[ap + c]` or `[fp + c]`
fn is_simple_deref(expr: &Expr) -> bool {
    match &expr.unparen().kind {
        ExprKind::Deref(inner) => matches!(split_offset(inner).0.kind, ExprKind::Register(_)),
        _ => false,
    }
}

// ============================================================================
// Code generator
// ============================================================================

pub struct CodeGenerator<'a> {
    config: &'a Config,
    types: &'a TypeTable,
    labels: BTreeMap<String, u64>,
    final_pass: bool,
    pc: u64,
    output: Vec<LoweredInstruction>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(config: &'a Config, types: &'a TypeTable) -> Self {
        Self {
            config,
            types,
            labels: BTreeMap::new(),
            final_pass: false,
            pc: 0,
            output: Vec::new(),
        }
    }

    /// Lower a whole file
    pub fn generate(mut self, file: &SourceFile) -> CodegenResult<CodegenOutput> {
        self.run(file)?;

        self.final_pass = true;
        self.pc = 0;
        self.output.clear();
        self.run(file)?;

        debug!(
            instructions = self.output.len(),
            words = self.pc,
            labels = self.labels.len(),
            "code generation finished"
        );
        Ok(CodegenOutput {
            instructions: self.output,
            labels: self.labels,
        })
    }

    fn run(&mut self, file: &SourceFile) -> CodegenResult<()> {
        for item in &file.items {
            match item {
                Item::Label(label) => {
                    if self.final_pass {
                        continue;
                    }
                    if self.labels.insert(label.name.clone(), self.pc).is_some() {
                        return Err(CodegenError::DuplicateLabel {
                            name: label.name.clone(),
                            span: label.span,
                        });
                    }
                }
                Item::Statement(stmt) => self.lower_statement(stmt)?,
            }
        }
        Ok(())
    }

    fn emit(&mut self, instruction: Instruction, span: Span) {
        self.output.push(LoweredInstruction {
            instruction,
            pc: self.pc,
            span,
        });
        self.pc += instruction.size() as u64;
    }

    fn lower_statement(&mut self, stmt: &Statement) -> CodegenResult<()> {
        let first = self.output.len();
        let span = stmt.span;
        let ap_update = if stmt.ap_pp {
            ApUpdate::Add1
        } else {
            ApUpdate::Regular
        };

        match &stmt.kind {
            StatementKind::AssertEq { dst, res } => {
                let dst = self.mem_ref(dst)?;
                let res = self.res_form(res)?;
                self.emit_assert_eq(dst, res, ap_update, span)?;
            }
            StatementKind::Jump { target, condition } => {
                let (pc_update, op1) = self.jump_target(target, true)?;
                let instr = match condition {
                    None => instruction(UNUSED, UNUSED, op1, Res::Op1, pc_update, ap_update, Opcode::Nop),
                    Some(condition) => {
                        let dst = self.mem_ref(condition)?;
                        instruction(dst, UNUSED, op1, Res::Unconstrained, PcUpdate::Jnz, ap_update, Opcode::Nop)
                    }
                };
                self.emit(instr, span);
            }
            StatementKind::Call { target } => {
                let (pc_update, op1) = self.jump_target(target, false)?;
                let instr = instruction(
                    MemRef::new(Register::Ap, 0),
                    MemRef::new(Register::Ap, 1),
                    op1,
                    Res::Op1,
                    pc_update,
                    ApUpdate::Add2,
                    Opcode::Call,
                );
                self.emit(instr, span);
            }
            StatementKind::Ret => self.emit(ret(), span),
            StatementKind::AddAp { value } => {
                let op1 = self.operand1(value)?;
                let instr = instruction(UNUSED, UNUSED, op1, Res::Op1, PcUpdate::Regular, ApUpdate::Add, Opcode::Nop);
                self.emit(instr, span);
            }
            StatementKind::Assert(stmt) => {
                self.lower_comparison(&stmt.lhs, stmt.op, &stmt.rhs, ap_update, span)?
            }
            StatementKind::Verify(stmt) => {
                self.lower_comparison(&stmt.lhs, stmt.op, &stmt.rhs, ap_update, span)?
            }
        }

        if self.final_pass {
            debug!(
                line = span.line,
                instructions = self.output.len() - first,
                "lowered statement"
            );
        }
        Ok(())
    }

    fn emit_assert_eq(
        &mut self,
        dst: MemRef,
        res: ResForm,
        ap_update: ApUpdate,
        span: Span,
    ) -> CodegenResult<()> {
        let instr = match res {
            ResForm::Op1(op1) => instruction(dst, UNUSED, op1, Res::Op1, PcUpdate::Regular, ap_update, Opcode::AssertEq),
            ResForm::Binary { res, op0, op1 } => {
                instruction(dst, op0, op1, res, PcUpdate::Regular, ap_update, Opcode::AssertEq)
            }
            ResForm::Symbolic(tag) => {
                if !self.config.encoding.supports(Res::Symbolic) {
                    return Err(CodegenError::SymbolicUnsupported {
                        version: self.config.encoding,
                        span,
                    });
                }
                instruction(
                    dst,
                    UNUSED,
                    Operand1::Imm(tag),
                    Res::Symbolic,
                    PcUpdate::Regular,
                    ap_update,
                    Opcode::AssertEq,
                )
            }
        };
        self.emit(instr, span);
        Ok(())
    }

    /// Shared lowering of `assert` and `verify`
    fn lower_comparison(
        &mut self,
        lhs: &Expr,
        op: RelOp,
        rhs: &Expr,
        ap_update: ApUpdate,
        span: Span,
    ) -> CodegenResult<()> {
        let (lhs, rhs) = (lhs.unparen(), rhs.unparen());
        let (a, b) = if is_simple_deref(lhs) {
            (lhs, rhs)
        } else if is_simple_deref(rhs) {
            (rhs, lhs)
        } else {
            return Err(invalid(
                lhs.span.merge(rhs.span),
                "one side of the comparison must be '[ap + c]' or '[fp + c]'",
            ));
        };
        let dst = self.mem_ref(a)?;
        let against_zero = op == RelOp::Ne && is_literal(b) && self.fold(b)?.is_zero();

        match op {
            RelOp::Eq => {
                let res = self.res_form(b)?;
                self.emit_assert_eq(dst, res, ap_update, span)
            }
            RelOp::Ne if against_zero => {
                self.emit(jnz(dst, NOT_ZERO_SKIP), span);
                let one = instruction(
                    dst,
                    UNUSED,
                    Operand1::Imm(Felt252::ONE),
                    Res::Op1,
                    PcUpdate::Regular,
                    ApUpdate::Regular,
                    Opcode::AssertEq,
                );
                self.emit(one, span);
                Ok(())
            }
            RelOp::Ne => {
                // [ap] holds a - b
                let op1 = self.direct_operand(b)?;
                let diff = instruction(
                    dst,
                    MemRef::new(Register::Ap, 0),
                    op1,
                    Res::Add,
                    PcUpdate::Regular,
                    ApUpdate::Add1,
                    Opcode::AssertEq,
                );
                self.emit(diff, span);

                let slot = MemRef::new(Register::Ap, -1);
                self.emit(jnz(slot, NOT_ZERO_SKIP), span);
                let one = instruction(
                    slot,
                    UNUSED,
                    Operand1::Imm(Felt252::ONE),
                    Res::Op1,
                    PcUpdate::Regular,
                    ApUpdate::Regular,
                    Opcode::AssertEq,
                );
                self.emit(one, span);
                Ok(())
            }
        }
    }

    fn jump_target(
        &self,
        target: &JumpTarget,
        allow_indirect: bool,
    ) -> CodegenResult<(PcUpdate, Operand1)> {
        let operand = |expr: &Expr| {
            if allow_indirect {
                self.operand1(expr)
            } else {
                self.direct_operand(expr)
            }
        };
        match target {
            JumpTarget::Abs(expr) => Ok((PcUpdate::Jump, operand(expr)?)),
            JumpTarget::Rel(expr) => Ok((PcUpdate::JumpRel, operand(expr)?)),
            JumpTarget::Label(name, span) => {
                let target = self.label(name, *span)?;
                let delta = Felt252::from_u64(target) - Felt252::from_u64(self.pc);
                Ok((PcUpdate::JumpRel, Operand1::Imm(delta)))
            }
        }
    }

    // ========================================================================
    // Operands
    // ========================================================================

    fn res_form(&self, expr: &Expr) -> CodegenResult<ResForm> {
        let expr = expr.unparen();
        match &expr.kind {
            ExprKind::Symbolic(symbolic) => Ok(ResForm::Symbolic(self.symbolic_tag(symbolic)?)),
            _ if is_constant(expr) => Ok(ResForm::Op1(Operand1::Imm(self.fold(expr)?))),
            ExprKind::Deref(_) => Ok(ResForm::Op1(self.operand1(expr)?)),
            ExprKind::Binary { op, lhs, rhs } => self.binary_res(*op, lhs, rhs, expr.span),
            _ => Err(invalid(expr.span, "unsupported result expression")),
        }
    }

    fn binary_res(&self, op: BinOp, lhs: &Expr, rhs: &Expr, span: Span) -> CodegenResult<ResForm> {
        let (lhs, rhs) = (lhs.unparen(), rhs.unparen());
        match op {
            BinOp::Sub => {
                if !is_simple_deref(lhs) || !is_constant(rhs) {
                    return Err(invalid(span, "subtraction must have the form '<memory> - <constant>'"));
                }
                Ok(ResForm::Binary {
                    res: Res::Add,
                    op0: self.mem_ref(lhs)?,
                    op1: Operand1::Imm(-self.fold(rhs)?),
                })
            }
            BinOp::Add | BinOp::Mul => {
                let res = if op == BinOp::Add { Res::Add } else { Res::Mul };
                let (op0, op1) = if is_simple_deref(lhs) {
                    (lhs, rhs)
                } else if is_simple_deref(rhs) {
                    (rhs, lhs)
                } else {
                    return Err(invalid(span, "one operand must be '[ap + c]' or '[fp + c]'"));
                };
                Ok(ResForm::Binary {
                    res,
                    op0: self.mem_ref(op0)?,
                    op1: self.direct_operand(op1)?,
                })
            }
        }
    }

    /// Constant, `[reg + c]` or `[[reg + c] + c]`
    fn operand1(&self, expr: &Expr) -> CodegenResult<Operand1> {
        let expr = expr.unparen();
        if is_constant(expr) {
            return Ok(Operand1::Imm(self.fold(expr)?));
        }
        let ExprKind::Deref(inner) = &expr.kind else {
            return Err(invalid(expr.span, "expected a constant or a memory reference"));
        };

        let (base, terms) = split_offset(inner);
        let offset = self.offset(&terms)?;
        match &base.kind {
            ExprKind::Register(register) => Ok(Operand1::Mem(MemRef::new(*register, offset))),
            ExprKind::Deref(_) => Ok(Operand1::Indirect {
                base: self.mem_ref(base)?,
                offset,
            }),
            _ => Err(invalid(
                expr.span,
                "expected '[ap + c]', '[fp + c]' or '[[reg + c] + c]'",
            )),
        }
    }

    /// Constant or `[reg + c]`
    fn direct_operand(&self, expr: &Expr) -> CodegenResult<Operand1> {
        match self.operand1(expr)? {
            Operand1::Indirect { .. } => Err(invalid(
                expr.span,
                "double dereference is not allowed here",
            )),
            operand => Ok(operand),
        }
    }

    fn mem_ref(&self, expr: &Expr) -> CodegenResult<MemRef> {
        match self.operand1(expr) {
            Ok(Operand1::Mem(mem)) => Ok(mem),
            Ok(_) => Err(invalid(expr.span, "expected '[ap + c]' or '[fp + c]'")),
            Err(err) => Err(err),
        }
    }

    /// Sum of the signed terms, range checked
    fn offset(&self, terms: &[(bool, &Expr)]) -> CodegenResult<i32> {
        let mut value = Felt252::ZERO;
        let mut span: Option<Span> = None;
        for &(negate, term) in terms {
            let folded = self.fold(term)?;
            value = if negate { value - folded } else { value + folded };
            span = Some(span.map_or(term.span, |s| s.merge(term.span)));
        }
        let Some(span) = span else {
            return Ok(0);
        };
        match value.to_i64() {
            Some(v) if (OFFSET_MIN as i64..=OFFSET_MAX as i64).contains(&v) => Ok(v as i32),
            Some(v) => Err(CodegenError::OffsetOutOfRange {
                value: v.to_string(),
                span,
            }),
            None => Err(CodegenError::OffsetOutOfRange {
                value: value.to_string(),
                span,
            }),
        }
    }

    // ========================================================================
    // Constants
    // ========================================================================

    /// Evaluate a constant expression in the field
    fn fold(&self, expr: &Expr) -> CodegenResult<Felt252> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(*value),
            ExprKind::ShortString(text) => {
                short_string::encode_bounded(text, self.config.short_string_max_len).map_err(
                    |source| CodegenError::ShortString {
                        source,
                        span: expr.span,
                    },
                )
            }
            ExprKind::Ident(name) => Ok(Felt252::from_u64(self.label(name, expr.span)?)),
            ExprKind::Neg(inner) => Ok(-self.fold(inner)?),
            ExprKind::Paren(inner) => self.fold(inner),
            ExprKind::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (self.fold(lhs)?, self.fold(rhs)?);
                Ok(match op {
                    BinOp::Add => lhs + rhs,
                    BinOp::Sub => lhs - rhs,
                    BinOp::Mul => lhs * rhs,
                })
            }
            ExprKind::Symbolic(symbolic) => {
                self.symbolic_tag(symbolic)?;
                if self.final_pass {
                    warn!(
                        tag = %symbolic.tag,
                        line = symbolic.span.line,
                        column = symbolic.span.column,
                        "symbolic value used inside a constant expression, folding to placeholder"
                    );
                }
                Ok(SYMBOLIC_PLACEHOLDER)
            }
            ExprKind::Register(_) | ExprKind::Deref(_) => {
                Err(invalid(expr.span, "expected a constant expression"))
            }
        }
    }

    /// Resolve the declared type and encode the tag
    fn symbolic_tag(&self, symbolic: &SymbolicExpr) -> CodegenResult<Felt252> {
        let ty = self.types.resolve(&symbolic.ty)?;
        let tag = short_string::encode_bounded(&symbolic.tag, self.config.short_string_max_len)
            .map_err(|source| CodegenError::ShortString {
                source,
                span: symbolic.span,
            })?;
        if self.final_pass {
            debug!(tag = %symbolic.tag, ty = %ty, "symbolic value");
        }
        Ok(tag)
    }

    fn label(&self, name: &str, span: Span) -> CodegenResult<u64> {
        match self.labels.get(name) {
            Some(&pc) => Ok(pc),
            // Forward references are unknown during layout
            None if !self.final_pass => Ok(0),
            None => Err(CodegenError::UndefinedLabel {
                name: name.to_string(),
                span,
            }),
        }
    }
}

/// Lower a parsed file with the given configuration and types
pub fn generate(
    file: &SourceFile,
    config: &Config,
    types: &TypeTable,
) -> CodegenResult<CodegenOutput> {
    CodeGenerator::new(config, types).generate(file)
}
