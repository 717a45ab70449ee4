//! CASM logical instruction
//!
//! One instruction is three signed offsets plus a set of categorical fields,
//! and an optional immediate that follows the instruction word in memory.
//!
//! ## Shape
//! - `dst = [dst_register + off0]`
//! - `op0 = [op0_register + off1]`
//! - `op1 = [op1_base + off2]` where the base is pc (immediate), ap, fp or op0
//! - `res` combines op0 and op1; `opcode` says what is asserted about dst/res

use crate::encoding::EncodingVersion;
use crate::error::FieldError;
use crate::field::Felt252;
use crate::register::Register;
use serde::{Deserialize, Serialize};

/// Smallest encodable offset (-2^15)
pub const OFFSET_MIN: i32 = -(1 << 15);

/// Largest encodable offset (2^15 - 1)
pub const OFFSET_MAX: i32 = (1 << 15) - 1;

/// Where operand 1 is read from
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Op1Addr {
    /// `[pc + 1]`, the word following the instruction
    Imm = 0,
    Ap = 1,
    Fp = 2,
    /// `[op0 + off2]`
    Op0 = 3,
}

/// Result computation mode
///
/// Ordinals of the first four members predate `Symbolic` and never change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Res {
    Op1 = 0,
    Add = 1,
    Mul = 2,
    Unconstrained = 3,
    /// Immediate load marked for symbolic-execution tooling
    Symbolic = 4,
}

impl Res {
    pub const ALL: [Res; 5] = [
        Res::Op1,
        Res::Add,
        Res::Mul,
        Res::Unconstrained,
        Res::Symbolic,
    ];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PcUpdate {
    Regular = 0,
    /// Absolute jump: pc = res
    Jump = 1,
    /// Relative jump: pc += res
    JumpRel = 2,
    /// pc += op1 if dst != 0
    Jnz = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ApUpdate {
    Regular = 0,
    /// ap += res
    Add = 1,
    Add1 = 2,
    /// Implied by `call`
    Add2 = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FpUpdate {
    Regular = 0,
    /// fp = ap + 2 (call)
    ApPlus2 = 1,
    /// fp = dst (ret)
    Dst = 2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    AssertEq = 1,
    Call = 2,
    Ret = 3,
}

impl Opcode {
    /// The fp update the opcode implies; never stored in the word
    pub fn implied_fp_update(self) -> FpUpdate {
        match self {
            Opcode::Call => FpUpdate::ApPlus2,
            Opcode::Ret => FpUpdate::Dst,
            Opcode::Nop | Opcode::AssertEq => FpUpdate::Regular,
        }
    }
}

/// Logical form of one CASM instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub off0: i32,
    pub off1: i32,
    pub off2: i32,
    /// Present iff `op1_addr == Op1Addr::Imm`
    pub imm: Option<Felt252>,
    pub dst_register: Register,
    pub op0_register: Register,
    pub op1_addr: Op1Addr,
    pub res: Res,
    pub pc_update: PcUpdate,
    pub ap_update: ApUpdate,
    pub fp_update: FpUpdate,
    pub opcode: Opcode,
}

impl Instruction {
    /// Number of memory words the instruction occupies
    #[inline]
    pub fn size(&self) -> usize {
        if self.imm.is_some() {
            2
        } else {
            1
        }
    }

    #[inline]
    pub fn is_symbolic(&self) -> bool {
        self.res == Res::Symbolic
    }

    /// Check every cross-field rule the word encoding relies on
    pub fn validate(&self, version: EncodingVersion) -> Result<(), FieldError> {
        for (field, value) in [("off0", self.off0), ("off1", self.off1), ("off2", self.off2)] {
            if !(OFFSET_MIN..=OFFSET_MAX).contains(&value) {
                return Err(FieldError::OffsetOutOfRange { field, value });
            }
        }

        if self.imm.is_some() != (self.op1_addr == Op1Addr::Imm) {
            return Err(FieldError::ImmediateMismatch {
                op1_addr: self.op1_addr,
                has_imm: self.imm.is_some(),
            });
        }

        if (self.res == Res::Unconstrained) != (self.pc_update == PcUpdate::Jnz) {
            return Err(FieldError::ResPcMismatch {
                res: self.res,
                pc_update: self.pc_update,
            });
        }

        if self.res == Res::Symbolic {
            if !version.supports(Res::Symbolic) {
                return Err(FieldError::UnsupportedRes {
                    res: self.res,
                    version,
                });
            }
            if self.opcode != Opcode::AssertEq || self.op1_addr != Op1Addr::Imm {
                return Err(FieldError::SymbolicShape {
                    opcode: self.opcode,
                    op1_addr: self.op1_addr,
                });
            }
        }

        if (self.opcode == Opcode::Call) != (self.ap_update == ApUpdate::Add2) {
            return Err(FieldError::ApUpdateMismatch {
                opcode: self.opcode,
                ap_update: self.ap_update,
            });
        }

        let expected = self.opcode.implied_fp_update();
        if self.fp_update != expected {
            return Err(FieldError::FpUpdateMismatch {
                opcode: self.opcode,
                expected,
                found: self.fp_update,
            });
        }

        Ok(())
    }
}
