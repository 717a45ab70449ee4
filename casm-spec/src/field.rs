//! Stark field arithmetic for CASM
//!
//! p = 2^251 + 17 * 2^192 + 1
//!
//! Properties:
//! - 252-bit prime, stored as four little-endian 64-bit limbs
//! - Every memory word, immediate and encoded instruction is a field element
//! - Short strings of up to 31 characters always fit (< 2^248 < p)

use crate::error::FeltError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Stark prime p = 2^251 + 17 * 2^192 + 1, little-endian limbs
pub const STARK_PRIME: [u64; 4] = [1, 0, 0, 0x0800_0000_0000_0011];

/// Byte width of a serialized field element
pub const FELT_BYTES: usize = 32;

/// Stark field element
///
/// Values are stored in canonical form: 0 ≤ value < p
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "[u64; 4]", into = "[u64; 4]")]
pub struct Felt252([u64; 4]);

#[inline]
const fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = a as u128 + b as u128 + carry as u128;
    (t as u64, (t >> 64) as u64)
}

#[inline]
const fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let t = (a as u128).wrapping_sub(b as u128 + borrow as u128);
    (t as u64, (t >> 127) as u64)
}

fn add_limbs(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], u64) {
    let mut out = [0u64; 4];
    let mut carry = 0;
    for i in 0..4 {
        let (v, c) = adc(a[i], b[i], carry);
        out[i] = v;
        carry = c;
    }
    (out, carry)
}

fn sub_limbs(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], u64) {
    let mut out = [0u64; 4];
    let mut borrow = 0;
    for i in 0..4 {
        let (v, b) = sbb(a[i], b[i], borrow);
        out[i] = v;
        borrow = b;
    }
    (out, borrow)
}

fn cmp_limbs(a: &[u64; 4], b: &[u64; 4]) -> Ordering {
    for i in (0..4).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// limbs * m + add, or None on 256-bit overflow
fn mul_small_add(limbs: &[u64; 4], m: u64, add: u64) -> Option<[u64; 4]> {
    let mut out = [0u64; 4];
    let mut carry = add as u128;
    for i in 0..4 {
        let t = limbs[i] as u128 * m as u128 + carry;
        out[i] = t as u64;
        carry = t >> 64;
    }
    if carry != 0 {
        None
    } else {
        Some(out)
    }
}

/// (limbs / d, limbs % d)
fn div_rem_small(limbs: &[u64; 4], d: u64) -> ([u64; 4], u64) {
    let mut out = [0u64; 4];
    let mut rem = 0u128;
    for i in (0..4).rev() {
        let cur = (rem << 64) | limbs[i] as u128;
        out[i] = (cur / d as u128) as u64;
        rem = cur % d as u128;
    }
    (out, rem as u64)
}

impl Felt252 {
    pub const ZERO: Self = Felt252([0, 0, 0, 0]);
    pub const ONE: Self = Felt252([1, 0, 0, 0]);
    /// p - 1, i.e. -1
    pub const MAX: Self = Felt252([0, 0, 0, 0x0800_0000_0000_0011]);

    /// Create from a u64 (always canonical)
    #[inline]
    pub const fn from_u64(value: u64) -> Self {
        Felt252([value, 0, 0, 0])
    }

    /// Create from an i64, mapping negatives to p - |value|
    pub fn from_i64(value: i64) -> Self {
        let magnitude = Self::from_u64(value.unsigned_abs());
        if value < 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Create from little-endian limbs, rejecting values ≥ p
    pub fn from_limbs(limbs: [u64; 4]) -> Option<Self> {
        if cmp_limbs(&limbs, &STARK_PRIME) == Ordering::Less {
            Some(Felt252(limbs))
        } else {
            None
        }
    }

    /// Little-endian limbs
    #[inline]
    pub const fn limbs(&self) -> [u64; 4] {
        self.0
    }

    /// Create from 32 big-endian bytes, rejecting values ≥ p
    pub fn from_bytes_be(bytes: &[u8; FELT_BYTES]) -> Option<Self> {
        let mut limbs = [0u64; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            limbs[3 - i] = u64::from_be_bytes(word);
        }
        Self::from_limbs(limbs)
    }

    /// 32 big-endian bytes
    pub fn to_bytes_be(&self) -> [u8; FELT_BYTES] {
        let mut bytes = [0u8; FELT_BYTES];
        for i in 0..4 {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&self.0[3 - i].to_be_bytes());
        }
        bytes
    }

    /// Create from 32 little-endian bytes, rejecting values ≥ p
    pub fn from_bytes_le(bytes: &[u8; FELT_BYTES]) -> Option<Self> {
        let mut be = *bytes;
        be.reverse();
        Self::from_bytes_be(&be)
    }

    /// 32 little-endian bytes
    pub fn to_bytes_le(&self) -> [u8; FELT_BYTES] {
        let mut bytes = self.to_bytes_be();
        bytes.reverse();
        bytes
    }

    /// The value as a u64, if it fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0 {
            Some(self.0[0])
        } else {
            None
        }
    }

    /// Signed interpretation: values in (p/2, p) are negative
    ///
    /// Returns None when neither `self` nor `-self` fits in an i64.
    pub fn to_i64(&self) -> Option<i64> {
        if let Some(v) = self.to_u64() {
            if v <= i64::MAX as u64 {
                return Some(v as i64);
            }
        }
        match (-*self).to_u64() {
            Some(n) if n <= 1u64 << 63 => Some((n as i64).wrapping_neg()),
            _ => None,
        }
    }

    /// Check if this is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Parse a decimal string (no sign, no prefix)
    pub fn from_dec_str(text: &str) -> Result<Self, FeltError> {
        Self::parse_radix(text, 10)
    }

    /// Parse a hexadecimal string (no `0x` prefix)
    pub fn from_hex_str(text: &str) -> Result<Self, FeltError> {
        Self::parse_radix(text, 16)
    }

    fn parse_radix(text: &str, radix: u32) -> Result<Self, FeltError> {
        if text.is_empty() {
            return Err(FeltError::Empty);
        }
        let mut limbs = [0u64; 4];
        for c in text.chars() {
            let digit = c
                .to_digit(radix)
                .ok_or_else(|| FeltError::InvalidDigit(c))?;
            limbs = mul_small_add(&limbs, radix as u64, digit as u64)
                .ok_or_else(|| FeltError::OutOfRange(text.to_string()))?;
        }
        Self::from_limbs(limbs).ok_or_else(|| FeltError::OutOfRange(text.to_string()))
    }
}

impl TryFrom<[u64; 4]> for Felt252 {
    type Error = FeltError;

    fn try_from(limbs: [u64; 4]) -> Result<Self, Self::Error> {
        Self::from_limbs(limbs).ok_or_else(|| FeltError::OutOfRange(format!("{:?}", limbs)))
    }
}

impl From<Felt252> for [u64; 4] {
    fn from(f: Felt252) -> [u64; 4] {
        f.0
    }
}

impl From<u64> for Felt252 {
    #[inline]
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<i64> for Felt252 {
    #[inline]
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl FromStr for Felt252 {
    type Err = FeltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => Self::from_hex_str(hex),
            None => Self::from_dec_str(s),
        }
    }
}

impl PartialOrd for Felt252 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Felt252 {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_limbs(&self.0, &other.0)
    }
}

// Arithmetic implementations

impl Add for Felt252 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        // Both operands are < 2^252, so the sum never carries out of 256 bits
        let (sum, _) = add_limbs(&self.0, &rhs.0);
        if cmp_limbs(&sum, &STARK_PRIME) != Ordering::Less {
            Felt252(sub_limbs(&sum, &STARK_PRIME).0)
        } else {
            Felt252(sum)
        }
    }
}

impl AddAssign for Felt252 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Felt252 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (diff, borrow) = sub_limbs(&self.0, &rhs.0);
        if borrow != 0 {
            Felt252(add_limbs(&diff, &STARK_PRIME).0)
        } else {
            Felt252(diff)
        }
    }
}

impl SubAssign for Felt252 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Felt252 {
    type Output = Self;

    /// Double-and-add over the bits of `rhs`
    fn mul(self, rhs: Self) -> Self {
        let mut acc = Self::ZERO;
        for i in (0..256).rev() {
            acc = acc + acc;
            if (rhs.0[i / 64] >> (i % 64)) & 1 == 1 {
                acc = acc + self;
            }
        }
        acc
    }
}

impl MulAssign for Felt252 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Neg for Felt252 {
    type Output = Self;

    fn neg(self) -> Self {
        if self.is_zero() {
            self
        } else {
            Felt252(sub_limbs(&STARK_PRIME, &self.0).0)
        }
    }
}

// Display

impl fmt::Display for Felt252 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        let mut chunks = Vec::new();
        let mut rest = self.0;
        while rest != [0, 0, 0, 0] {
            let (q, r) = div_rem_small(&rest, CHUNK);
            chunks.push(r);
            rest = q;
        }
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
        }
        for chunk in iter {
            write!(f, "{:019}", chunk)?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for Felt252 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        let top = (0..4).rev().find(|&i| self.0[i] != 0).unwrap_or(0);
        write!(f, "{:x}", self.0[top])?;
        for i in (0..top).rev() {
            write!(f, "{:016x}", self.0[i])?;
        }
        Ok(())
    }
}

impl fmt::Debug for Felt252 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt252({:#x})", self)
    }
}
