//! # Assembled Program
//!
//! The assembler's output: a flat word stream plus labels and debug locations.
//!
//! Binary artifact format:
//! ```text
//! Offset  Size  Field
//! ──────────────────────────────────
//! 0x00    4     magic ("CASM")
//! 0x04    4     format version
//! 0x08    32    SHA-256 of the raw word stream
//! 0x28    ...   bincode body
//! ```

use crate::encoding::EncodingVersion;
use crate::error::CasmError;
use crate::field::{Felt252, FELT_BYTES};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Magic number for CASM artifacts: "CASM" = 0x4D534143 little-endian
pub const MAGIC: u32 = 0x4D53_4143;

/// Artifact format version
pub const VERSION: u32 = 0x0001_0000;

const HEADER_SIZE: usize = 4 + 4 + 32;

/// Source location of the instruction starting at `pc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionLocation {
    pub pc: u64,
    pub line: usize,
    pub column: usize,
}

/// An assembled program
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Res table revision the words were encoded with
    pub encoding: EncodingVersion,
    /// Instruction words and immediates, in memory order
    pub data: Vec<Felt252>,
    /// Label name to pc
    pub labels: BTreeMap<String, u64>,
    /// Empty when debug info is disabled
    pub debug_info: Vec<InstructionLocation>,
}

impl Program {
    pub fn new(encoding: EncodingVersion) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }

    /// Number of memory words
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn lookup_label(&self, name: &str) -> Option<u64> {
        self.labels.get(name).copied()
    }

    /// Location of the instruction starting at `pc`, if recorded
    pub fn location(&self, pc: u64) -> Option<&InstructionLocation> {
        self.debug_info
            .binary_search_by_key(&pc, |loc| loc.pc)
            .ok()
            .map(|i| &self.debug_info[i])
    }

    /// Raw word stream: each word as 32 little-endian bytes
    pub fn to_word_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() * FELT_BYTES);
        for word in &self.data {
            bytes.extend_from_slice(&word.to_bytes_le());
        }
        bytes
    }

    /// Parse a raw word stream
    pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<Felt252>, CasmError> {
        if bytes.len() % FELT_BYTES != 0 {
            return Err(CasmError::UnalignedWordStream(bytes.len()));
        }
        bytes
            .chunks_exact(FELT_BYTES)
            .enumerate()
            .map(|(index, chunk)| {
                let mut word = [0u8; FELT_BYTES];
                word.copy_from_slice(chunk);
                Felt252::from_bytes_le(&word).ok_or(CasmError::NonCanonicalWord { index })
            })
            .collect()
    }

    /// SHA-256 of the raw word stream
    pub fn checksum(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_word_bytes());
        hasher.finalize().into()
    }

    /// Serialize to the artifact format
    pub fn to_bytes(&self) -> Result<Vec<u8>, CasmError> {
        let body = bincode::serialize(self)?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&self.checksum());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Deserialize from the artifact format, verifying magic, version and checksum
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CasmError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CasmError::Truncated {
                expected: HEADER_SIZE,
                found: bytes.len(),
            });
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != MAGIC {
            return Err(CasmError::InvalidMagic(magic));
        }

        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != VERSION {
            return Err(CasmError::InvalidVersion {
                expected: VERSION,
                found: version,
            });
        }

        let program: Program = bincode::deserialize(&bytes[HEADER_SIZE..])?;
        if program.checksum()[..] != bytes[8..HEADER_SIZE] {
            return Err(CasmError::ChecksumMismatch);
        }
        Ok(program)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CASM Program")?;
        writeln!(f, "  Encoding:    {:?}", self.encoding)?;
        writeln!(f, "  Words:       {}", self.data.len())?;
        writeln!(f, "  Labels:      {}", self.labels.len())?;
        write!(f, "  Debug info:  {} entries", self.debug_info.len())
    }
}
