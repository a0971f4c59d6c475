//! The admission pipeline: an ordered chain of decorators that validates,
//! prioritizes, taxes and charges every transaction before its messages
//! run, and the post handler that settles the tax once they succeeded.

#![warn(missing_docs)]

mod context;
pub mod decorators;
mod handler;
mod post;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{Ctx, ExecMode, TxAnnotations, WasmGasRegister};
pub use decorators::OracleSpamTracker;
pub use handler::{AnteDecorator, AnteHandler};
pub use post::{PostHandler, TAX_EVENT};
use serde::{Deserialize, Serialize};
use terra_core::address::Address;
use terra_core::coin::Coins;
use terra_taxexemption::CrossZoneRule;
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Gas(#[from] terra_gas::Error),
    #[error("Storage error: {0}")]
    StorageError(#[from] terra_storage::Error),
    #[error("Parameters error: {0}")]
    ParametersError(#[from] terra_parameters::Error),
    #[error("{0}")]
    TxError(#[from] terra_tx::Error),
    #[error("{0}")]
    Bank(#[from] terra_bank::Error),
    #[error("{0}")]
    Account(#[from] terra_account::Error),
    #[error("{0}")]
    Tax(#[from] terra_tax::Error),
    #[error("{0}")]
    Dyncomm(#[from] terra_dyncomm::Error),
    #[error("{0}")]
    Oracle(#[from] terra_oracle::Error),
    #[error("{0}")]
    Ibc(#[from] terra_ibc::Error),
    #[error("unknown extension options: {0}")]
    UnknownExtensionOptions(String),
    #[error(
        "tx has timed out; timeout height: {timeout}, current height: \
         {height}"
    )]
    TxTimeoutHeight { timeout: u64, height: u64 },
    #[error(
        "memo too long; maximum number of characters is {max} but received \
         {got} characters"
    )]
    MemoTooLong { max: u64, got: u64 },
    #[error("receiver too long; maximum length is {max} but received {got}")]
    ReceiverTooLong { max: u64, got: u64 },
    #[error(
        "not enough initial deposit provided. Expected {expected:?}; got \
         {got:?}"
    )]
    NotEnoughInitialDeposit { expected: String, got: String },
    #[error("{0}")]
    OracleSpam(String),
    #[error("must provide positive gas: invalid gas limit")]
    InvalidGasLimit,
    #[error(
        "insufficient fees; got: {got}, required: {required} = {gas}(gas) + \
         {stability}(stability)"
    )]
    InsufficientFee {
        got: Coins,
        required: Coins,
        gas: Coins,
        stability: Coins,
    },
    #[error("fee-granter does not allow paying for fee-payer: {0}")]
    FeeGrant(terra_account::Error),
    #[error("tx must have a fee payer")]
    NoFeePayer,
    #[error("signatures: {got}, limit: {limit}: too many signatures")]
    TooManySignatures { got: u64, limit: u64 },
    #[error("pubkey on account is not set: {0}")]
    NoPubKey(Address),
    #[error(
        "account sequence mismatch, expected {expected}, got {got}: \
         incorrect account sequence"
    )]
    SequenceMismatch { expected: u64, got: u64 },
    #[error(
        "signature verification failed; please verify account number \
         ({account_number}) and chain-id ({chain_id}): unauthorized"
    )]
    SigVerification {
        account_number: u64,
        chain_id: String,
    },
    #[error("redundant relay")]
    RedundantRelay,
    #[error("Arithmetic overflow in the admission pipeline")]
    Overflow,
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Node-local settings of the admission pipeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnteConfig {
    /// Longest IBC transfer memo accepted, in bytes
    pub max_memo_length: u64,
    /// Longest IBC transfer receiver accepted, in bytes
    pub max_receiver_length: u64,
    /// Gas limit applied to simulations, none for the tx's own limit
    pub simulation_gas_limit: Option<u64>,
    /// How sends between two tax exemption zones are decided
    pub cross_zone_rule: CrossZoneRule,
}

impl Default for AnteConfig {
    fn default() -> Self {
        Self {
            max_memo_length: 1024,
            max_receiver_length: 128,
            simulation_gas_limit: None,
            cross_zone_rule: CrossZoneRule::default(),
        }
    }
}
