//! Bank storage keys

use terra_core::address::Address;
use terra_core::storage::Key;

const BANK_SEG: &str = "bank";
const BALANCE_SEG: &str = "balance";
const SUPPLY_SEG: &str = "supply";
const COMMUNITY_POOL_SEG: &str = "community_pool";

/// Obtain the storage key prefix of all the balances of an owner
pub fn balance_prefix(owner: &Address) -> Key {
    Key::from_seg(&BANK_SEG).push(&BALANCE_SEG).push(owner)
}

/// Obtain the storage key of an owner's balance of a denomination
pub fn balance_key(owner: &Address, denom: &str) -> Key {
    balance_prefix(owner).push(&denom)
}

/// Obtain the storage key of the total supply of a denomination
pub fn supply_key(denom: &str) -> Key {
    Key::from_seg(&BANK_SEG).push(&SUPPLY_SEG).push(&denom)
}

/// Obtain the storage key of the community pool record
pub fn community_pool_key() -> Key {
    Key::from_seg(&"distribution").push(&COMMUNITY_POOL_SEG)
}
