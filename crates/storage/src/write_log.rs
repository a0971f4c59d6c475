//! Write log is temporary storage for modifications performed by a
//! transaction before they are committed to the ledger state. Reads see the
//! staged modifications first and fall back to the underlying storage.

use std::collections::BTreeMap;

use terra_core::chain::{BlockHeight, ChainId};

use crate::{Key, PrefixIter, Result, StorageRead, StorageWrite};

/// A storage modification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageModification {
    /// Write a new value
    Write {
        /// Value bytes
        value: Vec<u8>,
    },
    /// Delete an existing key-value
    Delete,
}

/// The staged modifications of a write log, detached from the storage it
/// was reading from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changes(BTreeMap<Key, StorageModification>);

impl Changes {
    /// Apply the modifications to a storage
    pub fn apply<S: StorageWrite>(self, storage: &mut S) -> Result<()> {
        for (key, modification) in self.0 {
            match modification {
                StorageModification::Write { value } => {
                    storage.write_bytes(&key, value)?
                }
                StorageModification::Delete => storage.delete(&key)?,
            }
        }
        Ok(())
    }

    /// Number of modified keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing was modified
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A write log overlaying a read-only storage
#[derive(Debug)]
pub struct WriteLog<'a, S> {
    storage: &'a S,
    changes: BTreeMap<Key, StorageModification>,
}

impl<'a, S: StorageRead> WriteLog<'a, S> {
    /// Start an empty write log on top of `storage`
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            changes: BTreeMap::new(),
        }
    }

    /// The storage under the log
    pub fn storage(&self) -> &'a S {
        self.storage
    }

    /// Detach the staged modifications, to be applied on commit
    pub fn into_changes(self) -> Changes {
        Changes(self.changes)
    }

    /// Take a snapshot of the staged modifications, e.g. to restore on a
    /// failed nested execution
    pub fn checkpoint(&self) -> Changes {
        Changes(self.changes.clone())
    }

    /// Restore the staged modifications to an earlier checkpoint
    pub fn restore(&mut self, checkpoint: Changes) {
        self.changes = checkpoint.0;
    }
}

impl<'a, S: StorageRead> StorageRead for WriteLog<'a, S> {
    fn read_bytes(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        match self.changes.get(key) {
            Some(StorageModification::Write { value }) => {
                Ok(Some(value.clone()))
            }
            Some(StorageModification::Delete) => Ok(None),
            None => self.storage.read_bytes(key),
        }
    }

    fn iter_prefix_bytes(&self, prefix: &Key) -> Result<PrefixIter> {
        let mut merged: BTreeMap<Key, Vec<u8>> =
            self.storage.iter_prefix_bytes(prefix)?.collect();
        for (key, modification) in self
            .changes
            .iter()
            .filter(|(key, _)| prefix.is_prefix_of(key))
        {
            match modification {
                StorageModification::Write { value } => {
                    merged.insert(key.clone(), value.clone());
                }
                StorageModification::Delete => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect::<Vec<_>>().into_iter())
    }

    fn get_chain_id(&self) -> Result<ChainId> {
        self.storage.get_chain_id()
    }

    fn get_block_height(&self) -> Result<BlockHeight> {
        self.storage.get_block_height()
    }
}

impl<'a, S: StorageRead> StorageWrite for WriteLog<'a, S> {
    fn write_bytes(&mut self, key: &Key, val: impl AsRef<[u8]>) -> Result<()> {
        self.changes.insert(
            key.clone(),
            StorageModification::Write {
                value: val.as_ref().to_vec(),
            },
        );
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.changes
            .insert(key.clone(), StorageModification::Delete);
        Ok(())
    }
}
