//! Implementation of block proposal for the Shell

use terra_mempool::Mempool;

use super::Shell;

impl Shell {
    /// The txs of a new block, in mempool selection order: every oracle tx
    /// first, then the others by sender and nonce. Selection stops at the
    /// first tx that would take the block over `max_tx_bytes`.
    pub fn prepare_proposal(&self, max_tx_bytes: usize) -> Vec<Vec<u8>> {
        let mut total_bytes = 0_usize;
        let mut txs = vec![];
        for tx in self.mempool.select() {
            let bytes = tx.to_bytes();
            match total_bytes.checked_add(bytes.len()) {
                Some(total) if total <= max_tx_bytes => {
                    total_bytes = total;
                    txs.push(bytes);
                }
                _ => break,
            }
        }
        tracing::debug!(
            txs = txs.len(),
            bytes = total_bytes,
            "Prepared block proposal"
        );
        txs
    }
}
