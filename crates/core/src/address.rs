//! Account addresses. Addresses are 20 raw bytes shown as bech32 strings
//! with the `terra` human readable part.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Human readable part of every address
pub const HRP: Hrp = Hrp::parse_unchecked("terra");

/// Length of the raw address in bytes
pub const ADDRESS_LEN: usize = 20;

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Error decoding address from bech32: {0}")]
    DecodeBech32(String),
    #[error("Unexpected bech32m human-readable part {0}, expected {1}")]
    UnexpectedHrp(String, String),
    #[error("Invalid address length {0}, expected {ADDRESS_LEN}")]
    InvalidLength(usize),
}

/// Result of a function that may fail
pub type Result<T> = std::result::Result<T, DecodeError>;

/// An account address
#[derive(
    Clone,
    Copy,
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
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Build an address from its raw bytes
    pub const fn from_raw(raw: [u8; ADDRESS_LEN]) -> Self {
        Self(raw)
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive an address from a hash preimage, keeping the first 20 bytes
    /// of its sha256 digest.
    pub fn from_hash_of(preimage: impl AsRef<[u8]>) -> Self {
        let digest = crate::sha256(preimage);
        let mut raw = [0u8; ADDRESS_LEN];
        raw.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(raw)
    }

    /// The address of a module account
    pub fn module(name: &str) -> Self {
        Self::from_hash_of(name.as_bytes())
    }

    /// Encode the address as a bech32 string
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode an address from a bech32 string
    pub fn decode(string: impl AsRef<str>) -> Result<Self> {
        let (hrp, data) = bech32::decode(string.as_ref())
            .map_err(|err| DecodeError::DecodeBech32(err.to_string()))?;
        if hrp != HRP {
            return Err(DecodeError::UnexpectedHrp(
                hrp.to_string(),
                HRP.to_string(),
            ));
        }
        let raw: [u8; ADDRESS_LEN] = data
            .as_slice()
            .try_into()
            .map_err(|_| DecodeError::InvalidLength(data.len()))?;
        Ok(Self(raw))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded =
            bech32::encode::<Bech32>(HRP, &self.0).map_err(|_| fmt::Error)?;
        write!(f, "{encoded}")
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl TryFrom<String> for Address {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self> {
        Self::decode(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// Helpers for testing with addresses.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    /// Derive a deterministic address from a seed string
    pub fn gen_address(seed: &str) -> Address {
        Address::from_hash_of(seed.as_bytes())
    }

    /// A sampled address for tests
    pub fn address_1() -> Address {
        gen_address("such randomness, much wow 1")
    }

    /// A sampled address for tests
    pub fn address_2() -> Address {
        gen_address("such randomness, much wow 2")
    }

    /// A sampled address for tests
    pub fn address_3() -> Address {
        gen_address("such randomness, much wow 3")
    }

    /// A sampled address for tests
    pub fn address_4() -> Address {
        gen_address("such randomness, much wow 4")
    }

    /// Generate an arbitrary address
    pub fn arb_address() -> impl Strategy<Value = Address> {
        any::<[u8; ADDRESS_LEN]>().prop_map(Address::from_raw)
    }
}

#[cfg(test)]
mod test_address {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::testing::*;
    use super::*;

    #[test]
    fn test_address_bech32_prefix() {
        let addr = address_1();
        assert!(addr.encode().starts_with("terra1"));
        assert_eq!(Address::decode(addr.encode()).unwrap(), addr);
    }

    #[test]
    fn test_address_decode_errors() {
        let other_hrp =
            bech32::encode::<Bech32>(Hrp::parse_unchecked("cosmos"), &[0; 20])
                .unwrap();
        assert_matches!(
            Address::decode(other_hrp),
            Err(DecodeError::UnexpectedHrp(_, _))
        );
        let short = bech32::encode::<Bech32>(HRP, &[0; 4]).unwrap();
        assert_matches!(
            Address::decode(short),
            Err(DecodeError::InvalidLength(4))
        );
        assert_matches!(
            Address::decode("not an address"),
            Err(DecodeError::DecodeBech32(_))
        );
    }

    #[test]
    fn test_module_addresses_are_distinct() {
        assert_ne!(Address::module("fee_collector"), Address::module("burn"));
        assert_eq!(Address::module("burn"), Address::module("burn"));
    }

    proptest! {
        #[test]
        fn test_address_parses_its_display(addr in arb_address()) {
            prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        }
    }
}
