//! Gas accounting module to track the gas usage of a transaction while it
//! passes through the admission pipeline.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_lossless,
    clippy::arithmetic_side_effects
)]

use std::fmt::Display;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(
        "out of gas in location: {descriptor}; gasWanted: {limit}, gasUsed: \
         {used}"
    )]
    OutOfGas {
        descriptor: String,
        limit: Gas,
        used: Gas,
    },
    #[error("Overflow during gas operations")]
    GasOverflow,
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Descriptor for the gas charged per byte of an encoded transaction
pub const TX_SIZE_DESCRIPTOR: &str = "txSize";
/// Descriptor for the gas charged per signature verification
pub const SIG_VERIFY_DESCRIPTOR: &str = "ante verify";

/// Representation of gas in sub-units
#[derive(
    Debug,
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
#[serde(transparent)]
pub struct Gas(u64);

impl Gas {
    /// Checked add of `Gas`. Returns `None` on overflow
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked sub of `Gas`. Returns `None` on underflow
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// The raw amount
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Gas {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Gas> for u64 {
    fn from(value: Gas) -> Self {
        value.0
    }
}

impl Display for Gas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait to share gas operations for transactions and simulations
pub trait GasMetering {
    /// Add gas cost. It will return error when the consumed gas exceeds the
    /// limit, but the state will still be updated
    fn consume(&mut self, gas: u64, descriptor: &str) -> Result<()>;

    /// Add the cost proportionate to an encoded tx length
    fn consume_tx_size(
        &mut self,
        bytes_len: u64,
        cost_per_byte: u64,
    ) -> Result<()> {
        self.consume(
            bytes_len
                .checked_mul(cost_per_byte)
                .ok_or(Error::GasOverflow)?,
            TX_SIZE_DESCRIPTOR,
        )
    }

    /// Get the gas consumed so far
    fn get_consumed_gas(&self) -> Gas;

    /// Get the gas limit. `None` when the meter is infinite
    fn get_gas_limit(&self) -> Option<Gas>;
}

/// Gas metering in a transaction
#[derive(Debug, Clone)]
pub struct TxGasMeter {
    /// Track gas overflow
    gas_overflow: bool,
    /// The gas limit for a transaction, `None` for an infinite meter
    tx_gas_limit: Option<Gas>,
    transaction_gas: Gas,
}

impl TxGasMeter {
    /// Initialize a new Tx gas meter. Requires a gas limit for the specific
    /// transaction
    pub fn new(tx_gas_limit: impl Into<Gas>) -> Self {
        Self {
            gas_overflow: false,
            tx_gas_limit: Some(tx_gas_limit.into()),
            transaction_gas: Gas::default(),
        }
    }

    /// Initialize a meter that tracks consumption without a limit, used
    /// while applying genesis
    pub fn new_infinite() -> Self {
        Self {
            gas_overflow: false,
            tx_gas_limit: None,
            transaction_gas: Gas::default(),
        }
    }

    /// Check if the meter enforces no limit
    pub fn is_infinite(&self) -> bool {
        self.tx_gas_limit.is_none()
    }

    /// Check if the consumed gas went past the limit
    pub fn is_past_limit(&self) -> bool {
        self.gas_overflow
            || self
                .tx_gas_limit
                .map(|limit| self.transaction_gas > limit)
                .unwrap_or_default()
    }

    /// Gas still available, saturating at zero. `None` for an infinite meter
    pub fn remaining(&self) -> Option<Gas> {
        self.tx_gas_limit.map(|limit| {
            limit.checked_sub(self.transaction_gas).unwrap_or_default()
        })
    }
}

impl GasMetering for TxGasMeter {
    fn consume(&mut self, gas: u64, descriptor: &str) -> Result<()> {
        if self.gas_overflow {
            return Err(Error::GasOverflow);
        }

        self.transaction_gas = self
            .transaction_gas
            .checked_add(gas.into())
            .ok_or_else(|| {
                self.gas_overflow = true;
                Error::GasOverflow
            })?;

        match self.tx_gas_limit {
            Some(limit) if self.transaction_gas > limit => {
                Err(Error::OutOfGas {
                    descriptor: descriptor.to_string(),
                    limit,
                    used: self.transaction_gas,
                })
            }
            _ => Ok(()),
        }
    }

    fn get_consumed_gas(&self) -> Gas {
        if !self.gas_overflow {
            self.transaction_gas
        } else {
            u64::MAX.into()
        }
    }

    fn get_gas_limit(&self) -> Option<Gas> {
        self.tx_gas_limit
    }
}
