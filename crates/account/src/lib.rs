//! Accounts of transaction signers: the account number, the sequence that
//! protects against replays and the public key once it is known. Also hosts
//! fee grant allowances and authz grants.

pub mod authz;
pub mod feegrant;
mod storage_key;

use borsh::{BorshDeserialize, BorshSerialize};
use terra_core::address::Address;
use terra_core::key::PublicKey;
pub use storage_key::*;
use terra_storage::{StorageRead, StorageWrite};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] terra_storage::Error),
    #[error("account {0} does not exist")]
    UnknownAddress(Address),
    #[error("pubKey does not match signer address {0}")]
    PubKeyMismatch(Address),
    #[error("{0}")]
    FeeGrant(#[from] feegrant::Error),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
/// Account data
pub struct BaseAccount {
    /// The address of the account owner
    pub address: Address,
    /// Public key, stored on the first signed tx
    pub pub_key: Option<PublicKey>,
    /// Unique number assigned at creation
    pub account_number: u64,
    /// Number of txs signed by the account so far
    pub sequence: u64,
}

/// Read an account
pub fn read_account<S>(
    storage: &S,
    owner: &Address,
) -> Result<Option<BaseAccount>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&account_key(owner))?)
}

/// Write an account
pub fn write_account<S>(storage: &mut S, account: &BaseAccount) -> Result<()>
where
    S: StorageWrite + ?Sized,
{
    Ok(storage.write(&account_key(&account.address), account)?)
}

/// Read an account, creating it with the next free account number when it
/// doesn't exist yet
pub fn get_or_create_account<S>(
    storage: &mut S,
    owner: &Address,
) -> Result<BaseAccount>
where
    S: StorageRead + StorageWrite,
{
    if let Some(account) = read_account(storage, owner)? {
        return Ok(account);
    }
    let key = next_account_number_key();
    let account_number: u64 = storage.read(&key)?.unwrap_or_default();
    storage.write(&key, account_number.saturating_add(1))?;
    let account = BaseAccount {
        address: *owner,
        pub_key: None,
        account_number,
        sequence: 0,
    };
    write_account(storage, &account)?;
    tracing::debug!(address = %owner, account_number, "Created new account");
    Ok(account)
}

/// Store the public key of an account if it has none yet. The key must
/// derive to the account address.
pub fn set_pub_key_if_missing<S>(
    storage: &mut S,
    owner: &Address,
    pub_key: &PublicKey,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if pub_key.address() != *owner {
        return Err(Error::PubKeyMismatch(*owner));
    }
    let mut account = get_or_create_account(storage, owner)?;
    if account.pub_key.is_none() {
        account.pub_key = Some(pub_key.clone());
        write_account(storage, &account)?;
    }
    Ok(())
}

/// Increment the sequence of an account
pub fn increment_sequence<S>(storage: &mut S, owner: &Address) -> Result<u64>
where
    S: StorageRead + StorageWrite,
{
    let mut account =
        read_account(storage, owner)?.ok_or(Error::UnknownAddress(*owner))?;
    account.sequence = account.sequence.saturating_add(1);
    write_account(storage, &account)?;
    Ok(account.sequence)
}
