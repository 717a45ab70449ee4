//! Register definitions for CASM

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base register of a memory reference
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Register {
    /// Allocation pointer
    Ap = 0,
    /// Frame pointer
    Fp = 1,
}

impl Register {
    #[inline]
    pub fn from_bit(bit: u64) -> Self {
        if bit & 1 == 0 {
            Self::Ap
        } else {
            Self::Fp
        }
    }

    #[inline]
    pub fn bit(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ap => "ap",
            Self::Fp => "fp",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
