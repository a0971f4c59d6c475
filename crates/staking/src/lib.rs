//! Validator records. Delegation accounting lives in the staking module
//! proper; the core only reads voting power and commission and raises the
//! commission to its dynamic floor.

use borsh::{BorshDeserialize, BorshSerialize};
use terra_core::address::Address;
use terra_core::dec::Dec;
use terra_core::storage::Key;
use terra_core::uint::Uint;
use terra_storage::{self as storage, StorageRead, StorageWrite};
use thiserror::Error;

const STAKING_SEG: &str = "staking";
const VALIDATOR_SEG: &str = "validator";

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] storage::Error),
    #[error("validator {0} does not exist")]
    ValidatorNotFound(Address),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Bonding state of a validator
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize,
)]
pub enum ValidatorState {
    /// In the active set
    Bonded,
    /// Leaving the active set
    Unbonding,
    /// Out of the active set
    Unbonded,
}

/// A validator record
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    /// Operator address
    pub operator: Address,
    /// Consensus voting power
    pub power: u64,
    /// Current commission rate
    pub commission_rate: Dec,
    /// Maximum commission rate the validator may charge
    pub max_commission_rate: Dec,
    /// Bonding state
    pub state: ValidatorState,
}

impl Validator {
    /// Check if the validator is in the active set
    pub fn is_bonded(&self) -> bool {
        self.state == ValidatorState::Bonded
    }
}

/// Obtain the storage key prefix of all validators
pub fn validators_prefix() -> Key {
    Key::from_seg(&STAKING_SEG).push(&VALIDATOR_SEG)
}

/// Obtain the storage key of a validator
pub fn validator_key(operator: &Address) -> Key {
    validators_prefix().push(operator)
}

/// Read a validator
pub fn read_validator<S>(
    storage: &S,
    operator: &Address,
) -> Result<Option<Validator>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&validator_key(operator))?)
}

/// Write a validator
pub fn write_validator<S>(storage: &mut S, validator: &Validator) -> Result<()>
where
    S: StorageWrite + ?Sized,
{
    Ok(storage.write(&validator_key(&validator.operator), validator)?)
}

/// All bonded validators, ordered by operator key
pub fn bonded_validators<S>(storage: &S) -> Result<Vec<Validator>>
where
    S: StorageRead,
{
    let mut bonded = vec![];
    let prefix = validators_prefix();
    for item in storage::iter_prefix::<Validator>(storage, &prefix)? {
        let (_, validator) = item?;
        if validator.is_bonded() {
            bonded.push(validator);
        }
    }
    Ok(bonded)
}

/// Total voting power of the bonded validators
pub fn total_bonded_power<S>(storage: &S) -> Result<Uint>
where
    S: StorageRead,
{
    Ok(bonded_validators(storage)?
        .iter()
        .fold(Uint::zero(), |acc, v| acc + Uint::from_u64(v.power)))
}

/// Raise a validator's commission and max commission to at least `floor`.
/// Returns whether anything changed.
pub fn raise_commission_to<S>(
    storage: &mut S,
    operator: &Address,
    floor: Dec,
) -> Result<bool>
where
    S: StorageRead + StorageWrite,
{
    let mut validator = read_validator(storage, operator)?
        .ok_or(Error::ValidatorNotFound(*operator))?;
    let mut changed = false;
    if validator.max_commission_rate < floor {
        validator.max_commission_rate = floor;
        changed = true;
    }
    if validator.commission_rate < floor {
        validator.commission_rate = floor;
        changed = true;
    }
    if changed {
        write_validator(storage, &validator)?;
    }
    Ok(changed)
}

/// Helpers for testing with validators.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    /// A bonded validator with the given power and commission
    pub fn bonded_validator(
        operator: Address,
        power: u64,
        commission_rate: Dec,
    ) -> Validator {
        Validator {
            operator,
            power,
            commission_rate,
            max_commission_rate: Dec::one(),
            state: ValidatorState::Bonded,
        }
    }
}
