//! Chain identity and height types

use std::fmt::{self, Display};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// The mainnet chain id whose historical genesis must never be re-ingested
pub const MAINNET_CHAIN_ID: &str = "columbus-5";

/// Height of a block. The `default` is the genesis height, at which no
/// block has been applied yet.
#[derive(
    Clone,
    Copy,
    Default,
    Debug,
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
pub struct BlockHeight(pub u64);

impl BlockHeight {
    /// Check if this is the genesis height
    pub fn is_genesis(&self) -> bool {
        self.0 == 0
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockHeight {
    fn from(height: u64) -> Self {
        BlockHeight(height)
    }
}

/// Treasury epoch number
#[derive(
    Clone,
    Copy,
    Default,
    Debug,
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
pub struct Epoch(pub u64);

impl Epoch {
    /// The epoch a block height belongs to. Zero length epochs collapse
    /// into epoch 0.
    pub fn of_height(height: BlockHeight, blocks_per_epoch: u64) -> Self {
        Epoch(height.0.checked_div(blocks_per_epoch).unwrap_or_default())
    }

    /// Check if `height` is the last block of its epoch
    pub fn is_last_block(height: BlockHeight, blocks_per_epoch: u64) -> bool {
        blocks_per_epoch > 0
            && height.0.checked_add(1).map(|h| h % blocks_per_epoch == 0)
                == Some(true)
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain identifier
#[derive(
    Clone,
    Debug,
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
pub struct ChainId(pub String);

impl ChainId {
    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the historical mainnet chain id
    pub fn is_mainnet(&self) -> bool {
        self.0 == MAINNET_CHAIN_ID
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        ChainId(id.to_string())
    }
}

#[cfg(test)]
mod test_chain {
    use super::*;

    #[test]
    fn test_epoch_boundaries() {
        assert_eq!(Epoch::of_height(BlockHeight(0), 10), Epoch(0));
        assert_eq!(Epoch::of_height(BlockHeight(19), 10), Epoch(1));
        assert_eq!(Epoch::of_height(BlockHeight(19), 0), Epoch(0));
        assert!(Epoch::is_last_block(BlockHeight(9), 10));
        assert!(!Epoch::is_last_block(BlockHeight(10), 10));
        assert!(!Epoch::is_last_block(BlockHeight(9), 0));
    }

    #[test]
    fn test_mainnet_chain_id() {
        assert!(ChainId::from("columbus-5").is_mainnet());
        assert!(!ChainId::from("localterra").is_mainnet());
    }
}
