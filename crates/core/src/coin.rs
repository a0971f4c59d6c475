//! Coin amounts and multi-denomination coin sets

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::uint::Uint;

static DENOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9/:._-]{2,127}$")
        .expect("Denomination regex must compile")
});

static COIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)([a-zA-Z][a-zA-Z0-9/:._-]{2,127})$")
        .expect("Coin regex must compile")
});

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinParseError {
    #[error("Invalid denomination: {0}")]
    InvalidDenom(String),
    #[error("Invalid coin expression: {0}")]
    InvalidCoin(String),
    #[error("Amount overflow while parsing {0}")]
    Overflow(String),
}

/// Check that a denomination is well formed
pub fn validate_denom(denom: &str) -> Result<(), CoinParseError> {
    if DENOM_RE.is_match(denom) {
        Ok(())
    } else {
        Err(CoinParseError::InvalidDenom(denom.to_string()))
    }
}

/// A non-negative coin amount
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Amount(Uint);

impl Amount {
    /// Zero amount
    pub const fn zero() -> Self {
        Self(Uint::from_u64(0))
    }

    /// Wrap a raw integer
    pub const fn from_uint(raw: Uint) -> Self {
        Self(raw)
    }

    /// The raw integer
    pub const fn raw(&self) -> Uint {
        self.0
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction. `None` when the result would be negative.
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(&self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Integer division. `None` on division by zero.
    pub fn checked_div_u64(&self, rhs: u64) -> Option<Self> {
        self.0.checked_div(Uint::from_u64(rhs)).map(Self)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(Uint::from_u64(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(Uint::from(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoinParseError::InvalidCoin(s.to_string()));
        }
        Uint::from_dec_str(s)
            .map(Self)
            .map_err(|_| CoinParseError::Overflow(s.to_string()))
    }
}

impl TryFrom<String> for Amount {
    type Error = CoinParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

/// A single coin
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct Coin {
    /// Denomination
    pub denom: String,
    /// Amount
    pub amount: Amount,
}

impl Coin {
    /// Build a new coin
    pub fn new(denom: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = COIN_RE
            .captures(s.trim())
            .ok_or_else(|| CoinParseError::InvalidCoin(s.to_string()))?;
        Ok(Coin {
            amount: Amount::from_str(&captures[1])?,
            denom: captures[2].to_string(),
        })
    }
}

/// A set of coins keyed by denomination. Zero amounts are never stored, so
/// an empty set is the zero value.
#[derive(
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Coins(BTreeMap<String, Amount>);

impl Coins {
    /// The empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one coin
    pub fn single(denom: impl Into<String>, amount: impl Into<Amount>) -> Self {
        let mut coins = Self::new();
        coins.insert(denom.into(), amount.into());
        coins
    }

    fn insert(&mut self, denom: String, amount: Amount) {
        if amount.is_zero() {
            self.0.remove(&denom);
        } else {
            self.0.insert(denom, amount);
        }
    }

    /// Add a coin into the set. `None` on overflow.
    pub fn checked_add_coin(&self, coin: &Coin) -> Option<Self> {
        let mut sum = self.clone();
        let total = sum.amount_of(&coin.denom).checked_add(coin.amount)?;
        sum.insert(coin.denom.clone(), total);
        Some(sum)
    }

    /// The amount held of a denomination, zero if absent
    pub fn amount_of(&self, denom: &str) -> Amount {
        self.0.get(denom).copied().unwrap_or_default()
    }

    /// Check if the set holds nothing
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of denominations held
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set holds nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the coins in denomination order
    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0.iter().map(|(denom, amount)| Coin {
            denom: denom.clone(),
            amount: *amount,
        })
    }

    /// The denominations held, in order
    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Sum coins into a set, adding up repeated denominations. `None` on
    /// overflow.
    pub fn checked_sum<I>(coins: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coin>,
    {
        coins
            .into_iter()
            .try_fold(Coins::new(), |acc, coin| acc.checked_add_coin(&coin))
    }

    /// Checked addition. `None` on overflow.
    pub fn checked_add(&self, rhs: &Coins) -> Option<Self> {
        rhs.iter()
            .try_fold(self.clone(), |acc, coin| acc.checked_add_coin(&coin))
    }

    /// Checked subtraction. `None` when any denomination would go negative.
    pub fn checked_sub(&self, rhs: &Coins) -> Option<Self> {
        match self.safe_sub(rhs) {
            (diff, false) => Some(diff),
            (_, true) => None,
        }
    }

    /// Subtraction that reports whether any denomination would go
    /// negative. Negative denominations are dropped from the result.
    pub fn safe_sub(&self, rhs: &Coins) -> (Self, bool) {
        let mut diff = self.clone();
        let mut has_neg = false;
        for (denom, amount) in &rhs.0 {
            match diff.amount_of(denom).checked_sub(*amount) {
                Some(rem) => diff.insert(denom.clone(), rem),
                None => {
                    has_neg = true;
                    diff.0.remove(denom);
                }
            }
        }
        (diff, has_neg)
    }

    /// True if for at least one denomination of `other`, `self` holds an
    /// amount greater than or equal to it. False when `other` is empty.
    pub fn is_any_gte(&self, other: &Coins) -> bool {
        other
            .0
            .iter()
            .any(|(denom, amount)| self.amount_of(denom) >= *amount)
    }

    /// True if `self` covers every denomination of `other`. True when
    /// `other` is empty.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other
            .0
            .iter()
            .all(|(denom, amount)| self.amount_of(denom) >= *amount)
    }

    /// Check every denomination is well formed
    pub fn validate(&self) -> Result<(), CoinParseError> {
        self.denoms().try_for_each(validate_denom)
    }
}

impl Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> =
            self.iter().map(|coin| coin.to_string()).collect();
        write!(f, "{}", rendered.join(","))
    }
}

impl fmt::Debug for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coins({self})")
    }
}

impl FromStr for Coins {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Coins::new());
        }
        let mut coins = Coins::new();
        for part in s.split(',') {
            let coin = Coin::from_str(part)?;
            coins = coins
                .checked_add_coin(&coin)
                .ok_or_else(|| CoinParseError::Overflow(s.to_string()))?;
        }
        Ok(coins)
    }
}

impl TryFrom<String> for Coins {
    type Error = CoinParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Coins> for String {
    fn from(value: Coins) -> Self {
        value.to_string()
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Coins::single(coin.denom, coin.amount)
    }
}

#[cfg(any(test, feature = "testing"))]
/// Testing helpers
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    /// Parse a coin set literal such as `"1000uusd,5uluna"`
    pub fn coins(s: &str) -> Coins {
        Coins::from_str(s).expect("Test coins literal must be valid")
    }

    /// Generate an arbitrary coin set over a few stable denominations
    pub fn arb_coins() -> impl Strategy<Value = Coins> {
        proptest::collection::btree_map(
            prop_oneof![
                Just("uluna".to_string()),
                Just("usdr".to_string()),
                Just("uusd".to_string()),
                Just("ukrw".to_string()),
            ],
            0..1_000_000_000u64,
            0..4,
        )
        .prop_map(|map| {
            map.into_iter()
                .map(|(denom, amount)| Coins::single(denom, amount))
                .fold(Coins::new(), |acc, coin| {
                    acc.checked_add(&coin)
                        .expect("Distinct denominations can't overflow")
                })
        })
    }
}
