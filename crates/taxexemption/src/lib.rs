//! Tax exemption zones. Transfers between accounts of a zone, and across
//! its boundary when the zone's flags allow, are exempt from the burn tax.
//! Zones are managed by governance, see [`proposal`].

#![warn(missing_docs)]

pub mod proposal;
pub mod storage_key;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use terra_core::address::Address;
use terra_storage::{self as storage, StorageRead, StorageWrite};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] storage::Error),
    #[error("Invalid zone name: {0}")]
    InvalidZoneName(#[from] terra_core::storage::Error),
    #[error("zone {0} already exists")]
    ZoneExists(String),
    #[error("zone {0} does not exist")]
    ZoneNotFound(String),
    #[error("address {address} is already in zone {zone}")]
    AddressInOtherZone { address: Address, zone: String },
    #[error("address {address} is not in zone {zone}")]
    AddressNotInZone { address: Address, zone: String },
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// A named exemption scope
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Zone {
    /// Unique name
    pub name: String,
    /// Sends from members to addresses outside any zone are exempt
    pub outgoing: bool,
    /// Sends from addresses outside any zone to members are exempt
    pub incoming: bool,
    /// Sends between members of different zones may be exempt
    pub cross_zone: bool,
}

/// How a send between members of two different zones is decided
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CrossZoneRule {
    /// Exempt iff both zones allow cross-zone sends, the sender's zone
    /// allows outgoing and the recipient's zone allows incoming sends
    #[default]
    AllFlags,
    /// Cross-zone sends are always taxed
    Never,
}

impl CrossZoneRule {
    /// Decide a send from a member of `from` to a member of `to`, two
    /// distinct zones
    pub fn allows(&self, from: &Zone, to: &Zone) -> bool {
        match self {
            CrossZoneRule::AllFlags => {
                from.cross_zone && to.cross_zone && from.outgoing && to.incoming
            }
            CrossZoneRule::Never => false,
        }
    }
}

/// Read a zone by name
pub fn read_zone<S>(storage: &S, name: &str) -> Result<Option<Zone>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&storage_key::zone_key(name)?)?)
}

/// All zones, ordered by name
pub fn zones<S>(storage: &S) -> Result<Vec<Zone>>
where
    S: StorageRead,
{
    storage::iter_prefix::<Zone>(storage, &storage_key::zones_prefix())?
        .map(|item| Ok(item?.1))
        .collect()
}

/// The members of a zone, ordered by address
pub fn zone_addresses<S>(storage: &S, name: &str) -> Result<Vec<Address>>
where
    S: StorageRead,
{
    let prefix = storage_key::members_prefix(name)?;
    storage::iter_prefix::<Address>(storage, &prefix)?
        .map(|item| Ok(item?.1))
        .collect()
}

/// The zone an address belongs to, if any
pub fn zone_of<S>(storage: &S, address: &Address) -> Result<Option<Zone>>
where
    S: StorageRead + ?Sized,
{
    let key = storage_key::address_zone_key(address);
    match storage.read::<String>(&key)? {
        Some(name) => read_zone(storage, &name),
        None => Ok(None),
    }
}

/// Create a new zone holding the given addresses
pub fn add_zone<S>(
    storage: &mut S,
    zone: Zone,
    addresses: &[Address],
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let key = storage_key::zone_key(&zone.name)?;
    if storage.has_key(&key)? {
        return Err(Error::ZoneExists(zone.name));
    }
    storage.write(&key, &zone)?;
    tracing::info!(zone = %zone.name, "Added tax exemption zone");
    add_addresses(storage, &zone.name, addresses)
}

/// Replace the flags of an existing zone
pub fn modify_zone<S>(storage: &mut S, zone: Zone) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let key = storage_key::zone_key(&zone.name)?;
    if !storage.has_key(&key)? {
        return Err(Error::ZoneNotFound(zone.name));
    }
    storage.write(&key, &zone)?;
    tracing::info!(zone = %zone.name, "Modified tax exemption zone");
    Ok(())
}

/// Delete a zone together with its memberships
pub fn remove_zone<S>(storage: &mut S, name: &str) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let key = storage_key::zone_key(name)?;
    if !storage.has_key(&key)? {
        return Err(Error::ZoneNotFound(name.to_string()));
    }
    for address in zone_addresses(storage, name)? {
        storage.delete(&storage_key::address_zone_key(&address))?;
    }
    storage::delete_prefix(storage, &storage_key::members_prefix(name)?)?;
    storage.delete(&key)?;
    tracing::info!(zone = name, "Removed tax exemption zone");
    Ok(())
}

/// Add addresses to a zone. Addresses already in the zone are skipped; an
/// address in another zone is an error.
pub fn add_addresses<S>(
    storage: &mut S,
    name: &str,
    addresses: &[Address],
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if read_zone(storage, name)?.is_none() {
        return Err(Error::ZoneNotFound(name.to_string()));
    }
    for address in addresses {
        let key = storage_key::address_zone_key(address);
        match storage.read::<String>(&key)? {
            Some(zone) if zone == name => continue,
            Some(zone) => {
                return Err(Error::AddressInOtherZone {
                    address: *address,
                    zone,
                });
            }
            None => {}
        }
        storage.write(&key, name.to_string())?;
        storage.write(&storage_key::member_key(name, address)?, address)?;
        tracing::debug!(%address, zone = name, "Added address to zone");
    }
    Ok(())
}

/// Remove addresses from a zone
pub fn remove_addresses<S>(
    storage: &mut S,
    name: &str,
    addresses: &[Address],
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if read_zone(storage, name)?.is_none() {
        return Err(Error::ZoneNotFound(name.to_string()));
    }
    for address in addresses {
        let key = storage_key::address_zone_key(address);
        if storage.read::<String>(&key)?.as_deref() != Some(name) {
            return Err(Error::AddressNotInZone {
                address: *address,
                zone: name.to_string(),
            });
        }
        storage.delete(&key)?;
        storage.delete(&storage_key::member_key(name, address)?)?;
        tracing::debug!(%address, zone = name, "Removed address from zone");
    }
    Ok(())
}

/// Decide the exemption of a send between two optional zones
pub fn is_pair_exempt(
    from: Option<&Zone>,
    to: Option<&Zone>,
    rule: CrossZoneRule,
) -> bool {
    match (from, to) {
        (None, None) => false,
        (None, Some(to)) => to.incoming,
        (Some(from), None) => from.outgoing,
        (Some(from), Some(to)) if from.name == to.name => true,
        (Some(from), Some(to)) => rule.allows(from, to),
    }
}

/// Check if a send from `from` to every one of `recipients` is exempt.
/// A send without recipients is never exempt.
pub fn is_exempt<S>(
    storage: &S,
    from: &Address,
    recipients: &[Address],
    rule: CrossZoneRule,
) -> Result<bool>
where
    S: StorageRead + ?Sized,
{
    if recipients.is_empty() {
        return Ok(false);
    }
    let zone_from = zone_of(storage, from)?;
    for to in recipients {
        let zone_to = zone_of(storage, to)?;
        if !is_pair_exempt(zone_from.as_ref(), zone_to.as_ref(), rule) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Helpers for testing with zones.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    /// A zone with the given flags
    pub fn zone(
        name: &str,
        outgoing: bool,
        incoming: bool,
        cross_zone: bool,
    ) -> Zone {
        Zone {
            name: name.to_string(),
            outgoing,
            incoming,
            cross_zone,
        }
    }

    /// Generate an arbitrary zone with the given name
    pub fn arb_zone(name: &'static str) -> impl Strategy<Value = Zone> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            move |(outgoing, incoming, cross_zone)| {
                zone(name, outgoing, incoming, cross_zone)
            },
        )
    }
}
