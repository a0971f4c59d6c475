//! The shell drives the ledger state through the entry points called by
//! consensus: chain initialization, mempool admission, block execution and
//! commit.
//!
//! Two states are kept. Blocks are applied to `state`; mempool admission
//! runs against `check_state`, a copy of the state reset on every commit so
//! that the fees and sequences of admitted txs are visible to the next
//! admission.

mod finalize_block;
mod init_chain;
mod prepare_proposal;

use std::sync::Arc;

pub use init_chain::Genesis;
use terra_ante::{AnteHandler, Ctx, ExecMode, OracleSpamTracker, PostHandler};
use terra_core::chain::ChainId;
use terra_core::event::Event;
use terra_gas::GasMetering;
use terra_mempool::{Mempool, SenderNonceMempool};
use terra_storage::{Changes, MockStore, StorageRead, StorageWrite, WriteLog};
use terra_tx::Tx;

use crate::config::Config;
use crate::forks::{self, ScheduledFork};
use crate::{router, Error, Result};

/// Outcome class of a tx
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResultCode {
    /// Accepted, or executed with all its messages
    #[default]
    Ok,
    /// The bytes do not decode to a tx
    InvalidTx,
    /// Rejected by the admission pipeline, nothing is charged
    AnteRejected,
    /// The pool refused the tx
    MempoolRejected,
    /// A message failed. The fee was charged and the sequence increased,
    /// the messages' effects were dropped.
    ExecutionFailed,
    /// The messages ran but the tax could not be settled. The fee was
    /// charged and the sequence increased, the messages' effects were
    /// dropped.
    SettlementFailed,
    /// Storage failure
    InternalError,
}

/// Result of checking, simulating or delivering a tx
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxResult {
    pub code: ResultCode,
    pub info: String,
    pub gas_used: u64,
    pub priority: i64,
    pub events: Vec<Event>,
}

impl TxResult {
    /// Check if the tx was accepted or executed successfully
    pub fn is_ok(&self) -> bool {
        self.code == ResultCode::Ok
    }
}

impl Error {
    fn code(&self) -> ResultCode {
        match self {
            Error::TxDecoding(_) => ResultCode::InvalidTx,
            Error::Ante(_) => ResultCode::AnteRejected,
            Error::Mempool(_) => ResultCode::MempoolRejected,
            Error::Router(_) => ResultCode::ExecutionFailed,
            Error::Settlement(_) => ResultCode::SettlementFailed,
            _ => ResultCode::InternalError,
        }
    }
}

impl From<Error> for TxResult {
    fn from(err: Error) -> Self {
        TxResult {
            code: err.code(),
            info: err.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct Shell {
    config: Config,
    /// The state blocks are applied to
    pub state: MockStore,
    /// The state txs are admitted into the mempool against
    check_state: MockStore,
    mempool: SenderNonceMempool,
    /// Outlives single txs so that repeated oracle votes are caught
    oracle_spam: Arc<OracleSpamTracker>,
    forks: Vec<ScheduledFork>,
}

impl Shell {
    /// A shell over an empty state of the configured chain, to be
    /// initialized with [`Shell::init_chain`]
    pub fn new(config: Config) -> Self {
        let state = MockStore::new(config.chain_id.clone());
        let forks = forks::schedule(&config.forks);
        Self {
            check_state: state.clone(),
            state,
            mempool: SenderNonceMempool::new(config.mempool.max_tx),
            oracle_spam: Arc::default(),
            forks,
            config,
        }
    }

    /// The chain the shell runs
    pub fn chain_id(&self) -> &ChainId {
        &self.config.chain_id
    }

    /// The pooled txs
    pub fn mempool(&self) -> &SenderNonceMempool {
        &self.mempool
    }

    fn ante_handler<S>(&self) -> AnteHandler<S>
    where
        S: StorageRead + StorageWrite,
    {
        AnteHandler::new(&self.config.ante_config(), self.oracle_spam.clone())
    }

    /// Validate a tx for the mempool and pool it. The admitted tx's fee and
    /// sequence are charged on the check state.
    pub fn check_tx(&mut self, tx_bytes: &[u8]) -> TxResult {
        let tx = match Tx::try_from_bytes(tx_bytes) {
            Ok(tx) => tx,
            Err(err) => return Error::TxDecoding(err).into(),
        };
        let mut log = WriteLog::new(&self.check_state);
        let mut ctx = Ctx::new(&mut log, ExecMode::CheckTx);
        let admitted = self.ante_handler().handle(&mut ctx, &tx, false);
        let gas_used = ctx.gas_meter.get_consumed_gas().into();
        let Ctx {
            events,
            annotations,
            ..
        } = ctx;
        if let Err(err) = admitted {
            return TxResult {
                gas_used,
                ..Error::Ante(err).into()
            };
        }
        if let Err(err) = self.mempool.insert(tx) {
            tracing::debug!(%err, "Admitted tx was not pooled");
            return TxResult {
                gas_used,
                ..Error::Mempool(err).into()
            };
        }
        let changes = log.into_changes();
        if let Err(err) = changes.apply(&mut self.check_state) {
            return Error::Storage(err).into();
        }
        TxResult {
            code: ResultCode::Ok,
            info: String::new(),
            gas_used,
            priority: annotations.priority,
            events,
        }
    }

    /// Run a tx against the current state without committing anything.
    /// Signatures are not verified and missing fees are minted.
    pub fn simulate(&self, tx_bytes: &[u8]) -> TxResult {
        match Tx::try_from_bytes(tx_bytes) {
            Ok(tx) => self.run_tx(&self.state, &tx, true).0,
            Err(err) => Error::TxDecoding(err).into(),
        }
    }

    /// Run the admission pipeline, the messages and the tax settlement of a
    /// tx over `storage`. Returns the outcome with the changes to commit:
    /// none when the tx was rejected, only those of the admission pipeline
    /// when the messages or the settlement failed.
    fn run_tx<S>(
        &self,
        storage: &S,
        tx: &Tx,
        simulate: bool,
    ) -> (TxResult, Changes)
    where
        S: StorageRead,
    {
        let ante = self.ante_handler();
        let mut log = WriteLog::new(storage);
        let mut ctx = Ctx::new(&mut log, ExecMode::DeliverTx);
        if let Err(err) = ante.handle(&mut ctx, tx, simulate) {
            let result = TxResult {
                gas_used: ctx.gas_meter.get_consumed_gas().into(),
                ..Error::Ante(err).into()
            };
            return (result, Changes::default());
        }
        let Ctx {
            gas_meter,
            mut events,
            annotations,
            ..
        } = ctx;
        let ante_events = events.len();

        let checkpoint = log.checkpoint();
        let executed = router::execute(&mut log, tx.msgs(), &mut events);
        if let Err(err) = &executed {
            tracing::debug!(
                %err,
                "Tx messages failed, dropping their effects"
            );
            log.restore(checkpoint.clone());
            events.truncate(ante_events);
        }

        let mut ctx = Ctx {
            storage: &mut log,
            mode: ExecMode::DeliverTx,
            gas_meter,
            events,
            annotations,
        };
        let settled =
            PostHandler.handle(&mut ctx, tx, simulate, executed.is_ok());
        let gas_used = ctx.gas_meter.get_consumed_gas().into();
        let priority = ctx.annotations.priority;
        let mut events = std::mem::take(&mut ctx.events);

        let failure = match (executed, settled) {
            (Err(err), _) => Some(Error::Router(err)),
            (Ok(()), Err(err)) => {
                tracing::debug!(%err, "Tax settlement failed");
                log.restore(checkpoint);
                events.truncate(ante_events);
                Some(Error::Settlement(err))
            }
            (Ok(()), Ok(())) => None,
        };
        let result = match failure {
            Some(err) => TxResult {
                gas_used,
                priority,
                events,
                ..err.into()
            },
            None => TxResult {
                code: ResultCode::Ok,
                info: String::new(),
                gas_used,
                priority,
                events,
            },
        };
        (result, log.into_changes())
    }

    /// Commit the block: the check state restarts from the new state
    pub fn commit(&mut self) -> Result<()> {
        self.check_state = self.state.clone();
        let height = self.state.get_block_height()?;
        tracing::info!(
            %height,
            pooled = self.mempool.count_tx(),
            "Committed block"
        );
        Ok(())
    }
}
