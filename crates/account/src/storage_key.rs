use terra_core::address::Address;
use terra_core::storage::Key;

const AUTH_SEG: &str = "auth";
const ACCOUNT_SEG: &str = "account";
const NEXT_ACCOUNT_NUMBER_SEG: &str = "next_account_number";
const FEEGRANT_SEG: &str = "feegrant";
const AUTHZ_SEG: &str = "authz";

/// Obtain the storage key of an account
pub fn account_key(owner: &Address) -> Key {
    Key::from_seg(&AUTH_SEG).push(&ACCOUNT_SEG).push(owner)
}

/// Obtain the storage key of the global account number counter
pub fn next_account_number_key() -> Key {
    Key::from_seg(&AUTH_SEG).push(&NEXT_ACCOUNT_NUMBER_SEG)
}

/// Obtain the storage key of the allowance a granter gives a grantee
pub fn allowance_key(granter: &Address, grantee: &Address) -> Key {
    Key::from_seg(&FEEGRANT_SEG).push(granter).push(grantee)
}

/// Obtain the storage key of the authz grants a granter gives a grantee
pub fn authz_key(granter: &Address, grantee: &Address) -> Key {
    Key::from_seg(&AUTHZ_SEG).push(granter).push(grantee)
}
