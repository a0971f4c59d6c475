//! Tax exemption storage keys

use terra_core::address::Address;
use terra_core::storage::{self as key, Key};

const MODULE_SEG: &str = "taxexemption";
const ZONE_SEG: &str = "zone";
const ADDRESS_SEG: &str = "address";
const MEMBER_SEG: &str = "member";

/// Obtain the storage key prefix of all zones
pub fn zones_prefix() -> Key {
    Key::from_seg(&MODULE_SEG).push(&ZONE_SEG)
}

/// Obtain the storage key of a zone record
pub fn zone_key(name: &str) -> key::Result<Key> {
    zones_prefix().push_checked(&name)
}

/// Obtain the storage key of the zone an address belongs to
pub fn address_zone_key(address: &Address) -> Key {
    Key::from_seg(&MODULE_SEG).push(&ADDRESS_SEG).push(address)
}

/// Obtain the storage key prefix of a zone's members
pub fn members_prefix(name: &str) -> key::Result<Key> {
    Key::from_seg(&MODULE_SEG)
        .push(&MEMBER_SEG)
        .push_checked(&name)
}

/// Obtain the storage key of a zone's member
pub fn member_key(name: &str, address: &Address) -> key::Result<Key> {
    Ok(members_prefix(name)?.push(address))
}
