//! Authz grants: a granter lets a grantee execute messages of a type on its
//! behalf, until an expiration height.

use borsh::{BorshDeserialize, BorshSerialize};
use terra_core::address::Address;
use terra_core::chain::BlockHeight;
use terra_storage::{StorageRead, StorageWrite};

use crate::authz_key;

/// Permission to execute any message of one type
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GenericAuthorization {
    /// Type url of the authorized messages
    pub msg_type_url: String,
    /// Last height the grant can be used at, never expires when `None`
    pub expiration: Option<BlockHeight>,
}

/// The authorizations a granter gave a grantee
pub fn read_grants<S>(
    storage: &S,
    granter: &Address,
    grantee: &Address,
) -> crate::Result<Vec<GenericAuthorization>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage
        .read(&authz_key(granter, grantee))?
        .unwrap_or_default())
}

/// Grant an authorization, replacing any existing one for the same type
pub fn grant<S>(
    storage: &mut S,
    granter: &Address,
    grantee: &Address,
    authorization: GenericAuthorization,
) -> crate::Result<()>
where
    S: StorageRead + StorageWrite,
{
    let mut grants = read_grants(&*storage, granter, grantee)?;
    grants.retain(|grant| grant.msg_type_url != authorization.msg_type_url);
    grants.push(authorization);
    Ok(storage.write(&authz_key(granter, grantee), grants)?)
}

/// Revoke the authorization for a message type
pub fn revoke<S>(
    storage: &mut S,
    granter: &Address,
    grantee: &Address,
    msg_type_url: &str,
) -> crate::Result<()>
where
    S: StorageRead + StorageWrite,
{
    let key = authz_key(granter, grantee);
    let mut grants = read_grants(&*storage, granter, grantee)?;
    grants.retain(|grant| grant.msg_type_url != msg_type_url);
    if grants.is_empty() {
        storage.delete(&key)?;
    } else {
        storage.write(&key, grants)?;
    }
    Ok(())
}

/// Check if `grantee` may execute a message of `msg_type_url` for
/// `granter` at `height`
pub fn is_authorized<S>(
    storage: &S,
    granter: &Address,
    grantee: &Address,
    msg_type_url: &str,
    height: BlockHeight,
) -> crate::Result<bool>
where
    S: StorageRead + ?Sized,
{
    let grants = read_grants(storage, granter, grantee)?;
    Ok(grants.iter().any(|grant| {
        let expired =
            matches!(grant.expiration, Some(expiration) if height > expiration);
        grant.msg_type_url == msg_type_url && !expired
    }))
}
