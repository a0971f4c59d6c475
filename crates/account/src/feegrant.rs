//! Fee grant allowances: a granter pays the fees of a grantee's txs up to a
//! spend limit and until an expiration height.

use borsh::{BorshDeserialize, BorshSerialize};
use terra_core::address::Address;
use terra_core::chain::BlockHeight;
use terra_core::coin::Coins;
use terra_storage::{StorageRead, StorageWrite};
use thiserror::Error;

use crate::allowance_key;

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("fee-grant not found")]
    NotFound,
    #[error("fee allowance expired")]
    Expired,
    #[error("basic allowance: fee limit exceeded")]
    LimitExceeded,
}

/// A basic fee allowance
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize,
)]
pub struct BasicAllowance {
    /// Fees left to spend, unlimited when `None`
    pub spend_limit: Option<Coins>,
    /// Last height the allowance can be used at, never expires when `None`
    pub expiration: Option<BlockHeight>,
}

/// Grant an allowance, replacing any existing one
pub fn grant_allowance<S>(
    storage: &mut S,
    granter: &Address,
    grantee: &Address,
    allowance: &BasicAllowance,
) -> crate::Result<()>
where
    S: StorageWrite + ?Sized,
{
    Ok(storage.write(&allowance_key(granter, grantee), allowance)?)
}

/// Read an allowance
pub fn read_allowance<S>(
    storage: &S,
    granter: &Address,
    grantee: &Address,
) -> crate::Result<Option<BasicAllowance>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&allowance_key(granter, grantee))?)
}

/// Consume `fee` from the allowance `granter` gave to `grantee`. Allowances
/// that expired or are used up are pruned.
pub fn use_grant<S>(
    storage: &mut S,
    granter: &Address,
    grantee: &Address,
    fee: &Coins,
    height: BlockHeight,
) -> crate::Result<()>
where
    S: StorageRead + StorageWrite,
{
    let key = allowance_key(granter, grantee);
    let mut allowance: BasicAllowance =
        storage.read(&key)?.ok_or(Error::NotFound)?;

    if matches!(allowance.expiration, Some(expiration) if height > expiration)
    {
        storage.delete(&key)?;
        return Err(Error::Expired.into());
    }

    if let Some(limit) = &allowance.spend_limit {
        let remaining = limit.checked_sub(fee).ok_or(Error::LimitExceeded)?;
        if remaining.is_zero() {
            storage.delete(&key)?;
            tracing::debug!(%granter, %grantee, "Fee allowance used up");
            return Ok(());
        }
        allowance.spend_limit = Some(remaining);
    }
    storage.write(&key, allowance)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use terra_core::address::testing::*;
    use terra_core::coin::testing::coins;
    use terra_storage::MockStore;

    use super::*;

    #[test]
    fn test_spend_limit_is_consumed() {
        let mut storage = MockStore::default();
        let allowance = BasicAllowance {
            spend_limit: Some(coins("100uusd")),
            expiration: None,
        };
        grant_allowance(&mut storage, &address_1(), &address_2(), &allowance)
            .unwrap();
        use_grant(
            &mut storage,
            &address_1(),
            &address_2(),
            &coins("60uusd"),
            BlockHeight(1),
        )
        .unwrap();
        assert_eq!(
            read_allowance(&storage, &address_1(), &address_2())
                .unwrap()
                .unwrap()
                .spend_limit,
            Some(coins("40uusd"))
        );
        assert_matches!(
            use_grant(
                &mut storage,
                &address_1(),
                &address_2(),
                &coins("41uusd"),
                BlockHeight(1),
            ),
            Err(crate::Error::FeeGrant(Error::LimitExceeded))
        );
        use_grant(
            &mut storage,
            &address_1(),
            &address_2(),
            &coins("40uusd"),
            BlockHeight(1),
        )
        .unwrap();
        assert_eq!(
            read_allowance(&storage, &address_1(), &address_2()).unwrap(),
            None
        );
    }

    #[test]
    fn test_expired_and_missing_grants() {
        let mut storage = MockStore::default();
        assert_matches!(
            use_grant(
                &mut storage,
                &address_1(),
                &address_2(),
                &coins("1uusd"),
                BlockHeight(1),
            ),
            Err(crate::Error::FeeGrant(Error::NotFound))
        );
        let allowance = BasicAllowance {
            spend_limit: None,
            expiration: Some(BlockHeight(10)),
        };
        grant_allowance(&mut storage, &address_1(), &address_2(), &allowance)
            .unwrap();
        use_grant(
            &mut storage,
            &address_1(),
            &address_2(),
            &coins("1000uusd"),
            BlockHeight(10),
        )
        .unwrap();
        assert_matches!(
            use_grant(
                &mut storage,
                &address_1(),
                &address_2(),
                &coins("1uusd"),
                BlockHeight(11),
            ),
            Err(crate::Error::FeeGrant(Error::Expired))
        );
    }
}
