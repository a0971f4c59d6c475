//! In-memory ledger store

use std::collections::BTreeMap;
use std::ops::Bound;

use terra_core::chain::{BlockHeight, ChainId};

use crate::{Key, PrefixIter, Result, StorageRead, StorageWrite};

/// An in-memory key-value store holding the committed chain state, together
/// with the block context it is being read at.
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    map: BTreeMap<Key, Vec<u8>>,
    chain_id: ChainId,
    height: BlockHeight,
}

impl MockStore {
    /// Create an empty store for the given chain
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Set the height of the block being applied
    pub fn set_block_height(&mut self, height: BlockHeight) {
        self.height = height;
    }

    /// Set the chain id
    pub fn set_chain_id(&mut self, chain_id: ChainId) {
        self.chain_id = chain_id;
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl StorageRead for MockStore {
    fn read_bytes(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn iter_prefix_bytes(&self, prefix: &Key) -> Result<PrefixIter> {
        let items: Vec<(Key, Vec<u8>)> = self
            .map
            .range((Bound::Included(prefix.clone()), Bound::Unbounded))
            .take_while(|(key, _)| prefix.is_prefix_of(key))
            .map(|(key, val)| (key.clone(), val.clone()))
            .collect();
        Ok(items.into_iter())
    }

    fn get_chain_id(&self) -> Result<ChainId> {
        Ok(self.chain_id.clone())
    }

    fn get_block_height(&self) -> Result<BlockHeight> {
        Ok(self.height)
    }
}

impl StorageWrite for MockStore {
    fn write_bytes(&mut self, key: &Key, val: impl AsRef<[u8]>) -> Result<()> {
        self.map.insert(key.clone(), val.as_ref().to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}
