//! The transaction pool. Transactions are kept per sender in nonce order,
//! in two classes: oracle txs, whose messages are all exchange rate
//! prevotes or votes, and the rest. Selection yields every oracle tx
//! before any other tx; within a class, senders are visited in address
//! order and each sender's txs in nonce order.

#![warn(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use terra_core::address::Address;
use terra_tx::Tx;
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("mempool is full")]
    TxMaxCapacity,
    #[error("tx must have at least one signer")]
    NoSigner,
    #[error("tx not found")]
    TxNotFound,
    #[error("{0}")]
    TxDecode(String),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// A pool of admitted transactions
pub trait Mempool: Send + Sync {
    /// Add a tx. A tx with the sender and nonce of a pooled tx replaces
    /// it.
    fn insert(&self, tx: Tx) -> Result<()>;

    /// Drop a tx, found by its sender and nonce
    fn remove(&self, tx: &Tx) -> Result<()>;

    /// Iterate over a snapshot of the pool in selection order
    fn select(&self) -> SelectIter;

    /// Number of pooled txs
    fn count_tx(&self) -> usize;
}

type SenderTxs = BTreeMap<Address, BTreeMap<u64, Tx>>;

#[derive(Debug, Default)]
struct Pool {
    oracle: SenderTxs,
    regular: SenderTxs,
    /// The (sender, nonce) of every pooled tx
    keys: BTreeSet<(Address, u64)>,
}

impl Pool {
    fn drop_from(txs: &mut SenderTxs, sender: &Address, nonce: u64) {
        if let Some(by_nonce) = txs.get_mut(sender) {
            by_nonce.remove(&nonce);
            if by_nonce.is_empty() {
                txs.remove(sender);
            }
        }
    }
}

/// The mempool with oracle txs first and FIFO by sender nonce
#[derive(Debug, Default)]
pub struct SenderNonceMempool {
    /// Capacity: unlimited when 0, and inserts are ignored when negative
    max_tx: i64,
    pool: Mutex<Pool>,
}

impl SenderNonceMempool {
    /// A mempool with the given capacity. With `max_tx == 0` the pool is
    /// unbounded; with a negative `max_tx` the pool is disabled and inserts
    /// are no-ops.
    pub fn new(max_tx: i64) -> Self {
        Self {
            max_tx,
            pool: Mutex::default(),
        }
    }

    /// Decode and insert a tx
    pub fn insert_bytes(&self, tx_bytes: &[u8]) -> Result<()> {
        let tx = Tx::try_from_bytes(tx_bytes)
            .map_err(|err| Error::TxDecode(err.to_string()))?;
        self.insert(tx)
    }

    fn is_full(&self, pool: &Pool) -> bool {
        match usize::try_from(self.max_tx) {
            Ok(0) | Err(_) => false,
            Ok(max_tx) => pool.keys.len() >= max_tx,
        }
    }
}

fn sender_and_nonce(tx: &Tx) -> Result<(Address, u64)> {
    tx.first_signer_and_sequence()
        .map_err(|_| Error::NoSigner)
}

impl Mempool for SenderNonceMempool {
    fn insert(&self, tx: Tx) -> Result<()> {
        if self.max_tx < 0 {
            return Ok(());
        }
        let (sender, nonce) = sender_and_nonce(&tx)?;
        let mut guard = self.pool.lock();
        let pool = &mut *guard;
        if self.is_full(pool) {
            tracing::debug!(
                %sender,
                nonce,
                max_tx = self.max_tx,
                "Mempool at capacity, rejecting tx"
            );
            return Err(Error::TxMaxCapacity);
        }
        let is_oracle = tx.is_oracle_tx();
        let (class, other) = if is_oracle {
            (&mut pool.oracle, &mut pool.regular)
        } else {
            (&mut pool.regular, &mut pool.oracle)
        };
        Pool::drop_from(other, &sender, nonce);
        class.entry(sender).or_default().insert(nonce, tx);
        pool.keys.insert((sender, nonce));
        tracing::trace!(%sender, nonce, is_oracle, "Inserted tx");
        Ok(())
    }

    fn remove(&self, tx: &Tx) -> Result<()> {
        let (sender, nonce) = sender_and_nonce(tx)?;
        let mut pool = self.pool.lock();
        if !pool.keys.remove(&(sender, nonce)) {
            return Err(Error::TxNotFound);
        }
        Pool::drop_from(&mut pool.oracle, &sender, nonce);
        Pool::drop_from(&mut pool.regular, &sender, nonce);
        Ok(())
    }

    fn select(&self) -> SelectIter {
        let pool = self.pool.lock();
        let txs = pool
            .oracle
            .values()
            .chain(pool.regular.values())
            .flat_map(BTreeMap::values)
            .cloned()
            .collect::<Vec<_>>();
        SelectIter {
            txs: txs.into_iter(),
        }
    }

    fn count_tx(&self) -> usize {
        self.pool.lock().keys.len()
    }
}

/// A forward-only cursor over a snapshot of the mempool. It holds no lock,
/// the pool may change while it is iterated without affecting it.
#[derive(Debug)]
pub struct SelectIter {
    txs: std::vec::IntoIter<Tx>,
}

impl Iterator for SelectIter {
    type Item = Tx;

    fn next(&mut self) -> Option<Self::Item> {
        self.txs.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.txs.size_hint()
    }
}

impl ExactSizeIterator for SelectIter {}
