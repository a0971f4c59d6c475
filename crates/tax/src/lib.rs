//! The burn tax: what a transaction owes, how the collected tax is split
//! between the burn sink, the oracle reward pool and the community pool,
//! and the treasury's per-epoch record of tax proceeds.

#![warn(missing_docs)]

mod compute;
mod split;
pub mod treasury;

pub use compute::{compute_taxes, TaxFlow, TaxPolicy, Taxes};
pub use split::{apply_burn_tax_split, charge_reverse, compute_split, TaxSplit};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] terra_storage::Error),
    #[error("Parameters error: {0}")]
    ParametersError(#[from] terra_parameters::Error),
    #[error("Bank error: {0}")]
    BankError(#[from] terra_bank::Error),
    #[error("Tax exemption error: {0}")]
    TaxExemptionError(#[from] terra_taxexemption::Error),
    #[error("{0}")]
    TxError(#[from] terra_tx::Error),
    #[error("Arithmetic overflow in tax computation")]
    Overflow,
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;
