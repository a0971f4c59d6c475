//! The Terra Classic node: the entry points driven by consensus, the
//! message router, the scheduled forks of the main chain, and the node's
//! configuration and logging.

pub mod config;
pub mod forks;
pub mod logging;
pub mod router;
pub mod shell;

pub use shell::{Genesis, ResultCode, Shell, TxResult};
use terra_core::chain::ChainId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error decoding a transaction from bytes: {0}")]
    TxDecoding(terra_tx::Error),
    #[error("{0}")]
    Ante(#[from] terra_ante::Error),
    #[error("Tax settlement failed: {0}")]
    Settlement(terra_ante::Error),
    #[error("{0}")]
    Mempool(#[from] terra_mempool::Error),
    #[error("{0}")]
    Router(#[from] router::Error),
    #[error("Error reading from or writing to storage: {0}")]
    Storage(#[from] terra_storage::Error),
    #[error("Parameters error: {0}")]
    Parameters(#[from] terra_parameters::Error),
    #[error("{0}")]
    Account(#[from] terra_account::Error),
    #[error("{0}")]
    Bank(#[from] terra_bank::Error),
    #[error("{0}")]
    Staking(#[from] terra_staking::Error),
    #[error("{0}")]
    Dyncomm(#[from] terra_dyncomm::Error),
    #[error("{0}")]
    Tax(#[from] terra_tax::Error),
    #[error("{0}")]
    TaxExemption(#[from] terra_taxexemption::Error),
    #[error("{0}")]
    Ibc(#[from] terra_ibc::Error),
    #[error("chain ID mismatch: expected {expected}, got {got}")]
    ChainId { expected: ChainId, got: ChainId },
    #[error("Refusing to initialize the main chain {0} from a genesis")]
    MainnetGenesis(ChainId),
}

pub type Result<T> = std::result::Result<T, Error>;
