//! Governance proposals that manage the zones

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use terra_core::address::Address;
use terra_storage::{StorageRead, StorageWrite};

use crate::{Result, Zone};

/// A passed tax exemption proposal
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxExemptionProposal {
    /// Create a zone with initial members
    AddZone {
        /// The new zone
        zone: Zone,
        /// Its initial members
        addresses: Vec<Address>,
    },
    /// Replace the flags of a zone
    ModifyZone {
        /// The zone with its new flags
        zone: Zone,
    },
    /// Delete a zone and its memberships
    RemoveZone {
        /// The zone name
        zone: String,
    },
    /// Add members to a zone
    AddAddresses {
        /// The zone name
        zone: String,
        /// The new members
        addresses: Vec<Address>,
    },
    /// Remove members from a zone
    RemoveAddresses {
        /// The zone name
        zone: String,
        /// The members to remove
        addresses: Vec<Address>,
    },
}

impl TaxExemptionProposal {
    /// Apply the proposal's changes
    pub fn execute<S>(self, storage: &mut S) -> Result<()>
    where
        S: StorageRead + StorageWrite,
    {
        match self {
            TaxExemptionProposal::AddZone { zone, addresses } => {
                crate::add_zone(storage, zone, &addresses)
            }
            TaxExemptionProposal::ModifyZone { zone } => {
                crate::modify_zone(storage, zone)
            }
            TaxExemptionProposal::RemoveZone { zone } => {
                crate::remove_zone(storage, &zone)
            }
            TaxExemptionProposal::AddAddresses { zone, addresses } => {
                crate::add_addresses(storage, &zone, &addresses)
            }
            TaxExemptionProposal::RemoveAddresses { zone, addresses } => {
                crate::remove_addresses(storage, &zone, &addresses)
            }
        }
    }
}
