//! # Configuration for the CASM toolchain
//!
//! Settings shared by the assembler and disassembler: the short string bound,
//! the res table revision to encode with, and whether debug locations are kept.

use crate::encoding::EncodingVersion;
use crate::short_string::MAX_SHORT_STRING_LEN;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Toolchain configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Config {
    /// Longest accepted short string literal / symbolic tag (1-31)
    pub short_string_max_len: usize,
    /// Res table revision used by the encoder
    pub encoding: EncodingVersion,
    /// Keep per-instruction source locations in the assembled program
    pub debug_info: bool,
}

impl Config {
    /// Default configuration
    /// - Short strings up to 31 characters
    /// - Current encoding (symbolic results enabled)
    /// - Debug locations kept
    pub const DEFAULT: Self = Self {
        short_string_max_len: MAX_SHORT_STRING_LEN,
        encoding: EncodingVersion::CURRENT,
        debug_info: true,
    };

    /// Output readable by toolchains that predate symbolic results
    pub const LEGACY: Self = Self {
        short_string_max_len: MAX_SHORT_STRING_LEN,
        encoding: EncodingVersion::Legacy,
        debug_info: true,
    };

    /// Create a new configuration with validation
    pub const fn new(
        short_string_max_len: usize,
        encoding: EncodingVersion,
        debug_info: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            short_string_max_len,
            encoding,
            debug_info,
        };

        match config.validate() {
            Ok(()) => Ok(config),
            Err(e) => Err(e),
        }
    }

    /// Validate configuration
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.short_string_max_len == 0 {
            return Err(ConfigError::EmptyShortStrings);
        }
        if self.short_string_max_len > MAX_SHORT_STRING_LEN {
            return Err(ConfigError::ShortStringTooWide(self.short_string_max_len));
        }
        Ok(())
    }

    pub fn with_encoding(mut self, encoding: EncodingVersion) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_debug_info(mut self, debug_info: bool) -> Self {
        self.debug_info = debug_info;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Short string bound must be at least 1")]
    EmptyShortStrings,

    #[error("Short string bound {0} exceeds the field capacity of 31 characters")]
    ShortStringTooWide(usize),
}
