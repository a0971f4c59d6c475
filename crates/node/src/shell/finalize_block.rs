//! Implementation of block execution for the Shell: the begin block hooks,
//! the delivery of the block's txs and the end block hooks

use terra_core::chain::{BlockHeight, Epoch};
use terra_core::event::{EmitEvents, Event};
use terra_mempool::Mempool;
use terra_parameters::TreasuryParams;
use terra_storage::StorageRead;
use terra_tx::Tx;

use super::{Shell, TxResult};
use crate::{forks, Error, Result};

/// Type of the event emitted when the burn module balance is burnt
pub const BURN_EVENT: &str = "burn";
/// Type of the event emitted when a treasury epoch closes
pub const TREASURY_EVENT: &str = "treasury";

impl Shell {
    /// Start a block: the transient store is dropped and the forks
    /// scheduled at this height are applied
    pub fn begin_block(&mut self, height: BlockHeight) -> Result<Vec<Event>> {
        self.state.set_block_height(height);
        terra_storage::clear_transient(&mut self.state)?;
        forks::apply_forks(&mut self.state, &self.forks)
    }

    /// Execute a tx of the block. The fee and sequence charged by the
    /// admission pipeline are committed even if the messages fail.
    pub fn deliver_tx(&mut self, tx_bytes: &[u8]) -> TxResult {
        let tx = match Tx::try_from_bytes(tx_bytes) {
            Ok(tx) => tx,
            Err(err) => return Error::TxDecoding(err).into(),
        };
        if let Err(err) = self.mempool.remove(&tx) {
            tracing::trace!(%err, "Delivered tx was not in the mempool");
        }
        let (result, changes) = self.run_tx(&self.state, &tx, false);
        if let Err(err) = changes.apply(&mut self.state) {
            return Error::Storage(err).into();
        }
        tracing::debug!(
            code = ?result.code,
            gas_used = result.gas_used,
            info = %result.info,
            "Delivered tx"
        );
        result
    }

    /// End a block: validator commissions are raised to the dynamic
    /// minimum, the burn module balance is burnt and, at the end of a
    /// treasury epoch, the epoch's tax proceeds are archived
    pub fn end_block(&mut self) -> Result<Vec<Event>> {
        let mut events = vec![];
        terra_dyncomm::update_all_bonded(&mut self.state)?;

        let burnt = terra_bank::burn_module_balance(&mut self.state)?;
        if !burnt.is_zero() {
            tracing::debug!(%burnt, "Burnt the burn module balance");
            events.emit(Event::new(BURN_EVENT).with("amount", &burnt));
        }

        let height = self.state.get_block_height()?;
        let treasury: TreasuryParams = terra_parameters::read(&self.state)?;
        if Epoch::is_last_block(height, treasury.blocks_per_epoch) {
            let epoch = Epoch::of_height(height, treasury.blocks_per_epoch);
            let proceeds =
                terra_tax::treasury::archive_epoch(&mut self.state, epoch)?;
            events.emit(
                Event::new(TREASURY_EVENT)
                    .with("epoch", epoch)
                    .with("tax_proceeds", &proceeds),
            );
        }
        Ok(events)
    }
}
