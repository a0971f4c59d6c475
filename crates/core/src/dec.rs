//! A signed fixed precision decimal type with [`DECIMAL_PRECISION`] places.
//! Used for tax rates, exchange rates, split ratios and commission rates.
//! Any computation that exceeds the precision is truncated towards zero,
//! except for the explicit `mul_*` helpers on [`Amount`] which state their
//! rounding.

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use eyre::eyre;
use serde::{Deserialize, Serialize};

use crate::coin::Amount;
use crate::uint::Uint;

/// The number of decimal places
pub const DECIMAL_PRECISION: u8 = 18;

const SCALE: i128 = 1_000_000_000_000_000_000;

#[derive(thiserror::Error, Debug)]
#[error(transparent)]
/// Generic error [`Dec`] operations can return
pub struct Error(#[from] eyre::Error);

/// Generic result type for fallible [`Dec`] operations
pub type Result<T> = std::result::Result<T, Error>;

/// A decimal number represented by a mantissa `m` such that the value is
/// `m * 10 ^ (-DECIMAL_PRECISION)`.
#[derive(
    Clone,
    Copy,
    Default,
    BorshSerialize,
    BorshDeserialize,
    PartialEq,
    Serialize,
    Deserialize,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Dec(i128);

impl Dec {
    /// The representation of 0
    pub const fn zero() -> Self {
        Self(0)
    }

    /// The representation of 1
    pub const fn one() -> Self {
        Self(SCALE)
    }

    /// The representation of 100
    pub const fn hundred() -> Self {
        Self(100 * SCALE)
    }

    /// Create a new [`Dec`] from a mantissa and a number of decimal places,
    /// e.g. `Dec::new(5, 3)` is `0.005`. Returns `None` when `scale` exceeds
    /// the precision or the value overflows.
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        let diff = DECIMAL_PRECISION.checked_sub(scale)?;
        10i128
            .checked_pow(u32::from(diff))
            .and_then(|exp| mantissa.checked_mul(exp))
            .map(Self)
    }

    /// The raw mantissa
    pub const fn raw(&self) -> i128 {
        self.0
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if value is negative
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Multiplication truncated to the precision
    pub fn checked_mul(&self, rhs: Self) -> Option<Self> {
        let is_neg = self.is_negative() ^ rhs.is_negative();
        let prod = Uint::from(self.0.unsigned_abs())
            .checked_mul(Uint::from(rhs.0.unsigned_abs()))?
            / Uint::from(SCALE as u128);
        Self::from_parts(prod, is_neg)
    }

    /// Division truncated to the precision. `None` on division by zero.
    pub fn checked_div(&self, rhs: Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        let is_neg = self.is_negative() ^ rhs.is_negative();
        let quot = Uint::from(self.0.unsigned_abs())
            .checked_mul(Uint::from(SCALE as u128))?
            / Uint::from(rhs.0.unsigned_abs());
        Self::from_parts(quot, is_neg)
    }

    fn from_parts(abs: Uint, is_neg: bool) -> Option<Self> {
        let abs = i128::try_from(abs.to_u128()?).ok()?;
        Some(Self(if is_neg { -abs } else { abs }))
    }

    /// The smaller of two values
    pub fn min(self, other: Self) -> Self {
        std::cmp::min(self, other)
    }

    /// The larger of two values
    pub fn max(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }

    /// Ratio of two unsigned integers, truncated to the precision.
    pub fn from_ratio(num: Uint, den: Uint) -> Option<Self> {
        if den.is_zero() {
            return None;
        }
        let quot = num.checked_mul(Uint::from(SCALE as u128))? / den;
        Self::from_parts(quot, false)
    }

    fn mul_amount_with(
        &self,
        amount: Amount,
        bias: impl FnOnce(Uint) -> Uint,
    ) -> Option<Amount> {
        if self.is_negative() {
            return None;
        }
        let scale = Uint::from(SCALE as u128);
        let prod = amount.raw().checked_mul(Uint::from(self.0 as u128))?;
        let biased = prod.checked_add(bias(scale))?;
        Some(Amount::from_uint(biased / scale))
    }

    /// `floor(self * amount)`. `None` for a negative rate or on overflow.
    pub fn mul_floor(&self, amount: Amount) -> Option<Amount> {
        self.mul_amount_with(amount, |_| Uint::zero())
    }

    /// `ceil(self * amount)`. `None` for a negative rate or on overflow.
    pub fn mul_ceil(&self, amount: Amount) -> Option<Amount> {
        self.mul_amount_with(amount, |scale| scale - Uint::one())
    }

    /// `self * amount` rounded half up. `None` for a negative rate or on
    /// overflow.
    pub fn mul_round(&self, amount: Amount) -> Option<Amount> {
        self.mul_amount_with(amount, |scale| scale / Uint::from(2u64))
    }
}

impl From<u64> for Dec {
    fn from(num: u64) -> Self {
        Self(i128::from(num) * SCALE)
    }
}

impl TryFrom<String> for Dec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_str(&value)
    }
}

impl From<Dec> for String {
    fn from(value: Dec) -> String {
        value.to_string()
    }
}

impl FromStr for Dec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (digits, is_neg) = match s.strip_prefix('-') {
            Some(strip) => (strip, true),
            None => (s, false),
        };
        let (large, small) = digits.split_once('.').unwrap_or((digits, "0"));

        if large.is_empty() || small.is_empty() {
            return Err(eyre!("Could not parse {s:?} as a decimal").into());
        }
        if !large.chars().chain(small.chars()).all(|c| c.is_ascii_digit()) {
            return Err(eyre!("Invalid characters in decimal {s:?}").into());
        }
        if small.len() > usize::from(DECIMAL_PRECISION) {
            return Err(eyre!(
                "Too many decimal places in {s:?}, at most {} are allowed",
                DECIMAL_PRECISION
            )
            .into());
        }

        let num_large = i128::from_str(large)
            .map_err(|e| eyre!("Could not parse {large} as an integer: {e}"))?;
        let len_diff = usize::from(DECIMAL_PRECISION) - small.len();
        let padded = format!("{small}{}", "0".repeat(len_diff));
        let num_small = i128::from_str(&padded)
            .map_err(|e| eyre!("Could not parse .{small} as decimals: {e}"))?;

        let inner = num_large
            .checked_mul(SCALE)
            .and_then(|int_part| int_part.checked_add(num_small))
            .ok_or_else(|| {
                eyre!("The number {s} is too large to fit in the Dec type")
            })?;
        Ok(Dec(if is_neg { -inner } else { inner }))
    }
}

impl Display for Dec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u128;
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / scale,
            abs % scale,
            width = usize::from(DECIMAL_PRECISION)
        )
    }
}

impl Debug for Dec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(any(test, feature = "testing"))]
/// Testing helpers
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    /// Parse a decimal literal, panicking on malformed input
    pub fn dec(s: &str) -> Dec {
        Dec::from_str(s).expect("Test decimal literal must be valid")
    }

    /// Generate an arbitrary rate in `[0, 1]`
    pub fn arb_rate() -> impl Strategy<Value = Dec> {
        (0..=SCALE).prop_map(Dec)
    }
}
