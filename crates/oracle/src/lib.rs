//! The parts of the oracle module the admission pipeline consumes: who may
//! vote on behalf of a validator, and the latest exchange rates.

use terra_core::address::Address;
use terra_core::dec::Dec;
use terra_core::storage::Key;
use terra_storage::{self as storage, StorageRead, StorageWrite};
use thiserror::Error;

const ORACLE_SEG: &str = "oracle";
const FEEDER_SEG: &str = "feeder";
const EXCHANGE_RATE_SEG: &str = "exchange_rate";

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] storage::Error),
    #[error("Staking error: {0}")]
    StakingError(#[from] terra_staking::Error),
    #[error("validator {0} is not active set")]
    NotActive(Address),
    #[error("unauthorized voter; wanted: {wanted}, got: {got}")]
    NoVotingPermission { wanted: Address, got: Address },
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Obtain the storage key of a validator's feeder delegation
pub fn feeder_key(validator: &Address) -> Key {
    Key::from_seg(&ORACLE_SEG).push(&FEEDER_SEG).push(validator)
}

/// Obtain the storage key of a denomination's exchange rate
pub fn exchange_rate_key(denom: &str) -> Key {
    Key::from_seg(&ORACLE_SEG)
        .push(&EXCHANGE_RATE_SEG)
        .push(&denom)
}

/// Delegate a validator's oracle votes to a feeder account
pub fn set_feeder_delegation<S>(
    storage: &mut S,
    validator: &Address,
    feeder: &Address,
) -> Result<()>
where
    S: StorageWrite + ?Sized,
{
    Ok(storage.write(&feeder_key(validator), feeder)?)
}

/// The account allowed to vote for a validator: its delegated feeder, or
/// the operator itself
pub fn feeder_delegation<S>(storage: &S, validator: &Address) -> Result<Address>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&feeder_key(validator))?.unwrap_or(*validator))
}

/// Check `feeder` may submit oracle votes for `validator`, which must be
/// bonded
pub fn validate_feeder<S>(
    storage: &S,
    feeder: &Address,
    validator: &Address,
) -> Result<()>
where
    S: StorageRead + ?Sized,
{
    let bonded = terra_staking::read_validator(storage, validator)?
        .map(|v| v.is_bonded())
        .unwrap_or_default();
    if !bonded {
        return Err(Error::NotActive(*validator));
    }
    let wanted = feeder_delegation(storage, validator)?;
    if wanted != *feeder {
        return Err(Error::NoVotingPermission {
            wanted,
            got: *feeder,
        });
    }
    Ok(())
}

/// Record an exchange rate
pub fn set_exchange_rate<S>(
    storage: &mut S,
    denom: &str,
    rate: Dec,
) -> Result<()>
where
    S: StorageWrite + ?Sized,
{
    Ok(storage.write(&exchange_rate_key(denom), rate)?)
}

/// The latest exchange rate of a denomination against the bond denom
pub fn exchange_rate<S>(storage: &S, denom: &str) -> Result<Option<Dec>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&exchange_rate_key(denom))?)
}
