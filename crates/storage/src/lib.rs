//! The common storage read and write traits, implemented by the in-memory
//! ledger store and by the write log overlays that stage a transaction's
//! changes.

#![warn(missing_docs)]

mod error;
pub mod mockstore;
pub mod write_log;

use borsh::{BorshDeserialize, BorshSerialize};
pub use error::{Error, Result};
pub use mockstore::MockStore;
use terra_core::chain::{BlockHeight, ChainId};
pub use terra_core::storage::{Key, KeySeg};
pub use write_log::{Changes, StorageModification, WriteLog};

/// The first key segment of the transient sub-store. Keys under it are
/// dropped at every block boundary.
pub const TRANSIENT_SEG: &str = "transient";

/// Raw key-value pairs under a prefix, ordered by the storage keys
pub type PrefixIter = std::vec::IntoIter<(Key, Vec<u8>)>;

/// Common storage read interface
pub trait StorageRead {
    /// Storage read raw bytes. It will try to read from the storage.
    fn read_bytes(&self, key: &Key) -> Result<Option<Vec<u8>>>;

    /// Storage prefix iterator ordered by the storage keys.
    ///
    /// For a decoding iterator, use [`fn@iter_prefix`] instead.
    fn iter_prefix_bytes(&self, prefix: &Key) -> Result<PrefixIter>;

    /// Getting the chain ID.
    fn get_chain_id(&self) -> Result<ChainId>;

    /// Getting the block height. The height is that of the block to which the
    /// current transaction is being applied.
    fn get_block_height(&self) -> Result<BlockHeight>;

    /// Storage read Borsh encoded value. It will try to read from the storage
    /// and decode it if found.
    fn read<T: BorshDeserialize>(&self, key: &Key) -> Result<Option<T>> {
        match self.read_bytes(key)? {
            Some(bytes) => {
                let val = T::try_from_slice(&bytes)?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }

    /// Storage `has_key` in. It will try to read from the storage.
    fn has_key(&self, key: &Key) -> Result<bool> {
        Ok(self.read_bytes(key)?.is_some())
    }
}

/// Common storage write interface
pub trait StorageWrite {
    /// Write a value as bytes at the given key to storage.
    fn write_bytes(&mut self, key: &Key, val: impl AsRef<[u8]>) -> Result<()>;

    /// Delete a value at the given key from storage.
    fn delete(&mut self, key: &Key) -> Result<()>;

    /// Write a value to be encoded with Borsh at the given key to storage.
    fn write<T: BorshSerialize>(&mut self, key: &Key, val: T) -> Result<()> {
        let bytes = borsh::to_vec(&val)?;
        self.write_bytes(key, bytes)
    }
}

/// Iterate Borsh encoded items matching the given prefix, ordered by the
/// storage keys.
pub fn iter_prefix<T>(
    storage: &impl StorageRead,
    prefix: &Key,
) -> Result<impl Iterator<Item = Result<(Key, T)>>>
where
    T: BorshDeserialize,
{
    let iter = storage.iter_prefix_bytes(prefix)?;
    Ok(iter.map(|(key, val)| {
        let val = T::try_from_slice(&val)?;
        Ok((key, val))
    }))
}

/// Delete every key matching the given prefix
pub fn delete_prefix<S>(storage: &mut S, prefix: &Key) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let keys: Vec<Key> = storage
        .iter_prefix_bytes(prefix)?
        .map(|(key, _)| key)
        .collect();
    for key in &keys {
        storage.delete(key)?;
    }
    tracing::trace!(%prefix, deleted = keys.len(), "Deleted storage prefix");
    Ok(())
}

/// A key in the transient sub-store
pub fn transient_key(seg: &impl KeySeg) -> Key {
    Key::from_seg(&TRANSIENT_SEG).push(seg)
}

/// Drop the whole transient sub-store
pub fn clear_transient<S>(storage: &mut S) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    delete_prefix(storage, &Key::from_seg(&TRANSIENT_SEG))
}

impl<S: StorageRead + ?Sized> StorageRead for &S {
    fn read_bytes(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        (**self).read_bytes(key)
    }

    fn iter_prefix_bytes(&self, prefix: &Key) -> Result<PrefixIter> {
        (**self).iter_prefix_bytes(prefix)
    }

    fn get_chain_id(&self) -> Result<ChainId> {
        (**self).get_chain_id()
    }

    fn get_block_height(&self) -> Result<BlockHeight> {
        (**self).get_block_height()
    }
}

impl<S: StorageRead + ?Sized> StorageRead for &mut S {
    fn read_bytes(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        (**self).read_bytes(key)
    }

    fn iter_prefix_bytes(&self, prefix: &Key) -> Result<PrefixIter> {
        (**self).iter_prefix_bytes(prefix)
    }

    fn get_chain_id(&self) -> Result<ChainId> {
        (**self).get_chain_id()
    }

    fn get_block_height(&self) -> Result<BlockHeight> {
        (**self).get_block_height()
    }
}

impl<S: StorageWrite + ?Sized> StorageWrite for &mut S {
    fn write_bytes(&mut self, key: &Key, val: impl AsRef<[u8]>) -> Result<()> {
        (**self).write_bytes(key, val)
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        (**self).delete(key)
    }
}
