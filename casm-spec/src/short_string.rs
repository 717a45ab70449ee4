//! # Short String Codec
//!
//! Packs up to 31 printable ASCII characters into one field element, most
//! significant character first: `'ab'` is `0x6162`. Used for ordinary short
//! string literals and for the tags of `symbolic(...)` values, so the same
//! [`decode`] recovers both.

use crate::error::ShortStringError;
use crate::field::{Felt252, FELT_BYTES};

/// Longest short string that fits below 2^248
pub const MAX_SHORT_STRING_LEN: usize = 31;

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

/// Encode `text` with the default bound of [`MAX_SHORT_STRING_LEN`]
pub fn encode(text: &str) -> Result<Felt252, ShortStringError> {
    encode_bounded(text, MAX_SHORT_STRING_LEN)
}

/// Encode `text`, rejecting strings longer than `max_len`
///
/// `max_len` is clamped to [`MAX_SHORT_STRING_LEN`].
pub fn encode_bounded(text: &str, max_len: usize) -> Result<Felt252, ShortStringError> {
    if let Some(c) = text.chars().find(|&c| !c.is_ascii() || !is_printable(c as u8)) {
        return Err(ShortStringError::NonAscii(c));
    }

    let max = max_len.min(MAX_SHORT_STRING_LEN);
    if text.len() > max {
        return Err(ShortStringError::TooLong {
            text: text.to_string(),
            len: text.len(),
            max,
        });
    }

    // At most 31 lanes, so the value stays below 2^248 < p and never wraps
    let lane = Felt252::from_u64(256);
    Ok(text
        .bytes()
        .fold(Felt252::ZERO, |acc, byte| acc * lane + Felt252::from_u64(byte as u64)))
}

/// Decode a field element back into its short string
///
/// Leading zero lanes are dropped; every remaining lane must be printable.
pub fn decode(value: Felt252) -> Result<String, ShortStringError> {
    let bytes = value.to_bytes_be();
    if bytes[0] != 0 {
        return Err(ShortStringError::Overflow(value));
    }

    let start = bytes.iter().position(|&b| b != 0).unwrap_or(FELT_BYTES);
    let mut text = String::with_capacity(FELT_BYTES - start);
    for (lane, &byte) in bytes[start..].iter().enumerate() {
        if !is_printable(byte) {
            return Err(ShortStringError::Unprintable { byte, lane });
        }
        text.push(byte as char);
    }
    Ok(text)
}
