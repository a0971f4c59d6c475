//! The execution context a transaction is admitted and settled in

use terra_core::address::Address;
use terra_core::coin::Coins;
use terra_core::event::Event;
use terra_gas::TxGasMeter;
use terra_tax::TaxFlow;

use crate::decorators::PendingOracleVote;

/// The mode a transaction is run in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// Admission into the mempool
    CheckTx,
    /// Execution in a block
    DeliverTx,
}

/// Gas prices of the wasm VM, registered in the context for contract
/// execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WasmGasRegister {
    /// Gas charged for loading a contract instance
    pub instance_cost: u64,
    /// Gas charged per byte of compiled code
    pub compile_cost_per_byte: u64,
    /// VM gas units per unit of chain gas
    pub gas_multiplier: u64,
}

impl Default for WasmGasRegister {
    fn default() -> Self {
        Self {
            instance_cost: 60_000,
            compile_cost_per_byte: 3,
            gas_multiplier: 140_000_000,
        }
    }
}

/// What the admission pipeline learnt about the transaction, read by the
/// post handler
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxAnnotations {
    /// Mempool and consensus priority
    pub priority: i64,
    /// Tax held in the fee collector, split after execution
    pub tax_due: Coins,
    /// The per message taxes, charged from the value flows on reverse
    /// charge
    pub tax_flows: Vec<TaxFlow>,
    /// The account the fee and tax were charged to
    pub tax_payer: Option<Address>,
    /// The fee did not cover the tax, which is charged after execution
    pub tax_reverse_charge: bool,
    /// Tax on funds sent to contracts, accounted by the contract flows
    pub non_taxable_tax: Coins,
    /// Position of the tx among the block's txs
    pub wasm_tx_index: u64,
    /// Wasm VM gas prices
    pub wasm_gas_register: Option<WasmGasRegister>,
    /// Oracle messages to rate limit once the tx is admitted
    pub oracle_votes: Vec<PendingOracleVote>,
}

/// Execution context of a transaction
pub struct Ctx<'s, S> {
    /// State the transaction reads and writes
    pub storage: &'s mut S,
    /// The run mode
    pub mode: ExecMode,
    /// The transaction's gas meter, installed by the setup decorator
    pub gas_meter: TxGasMeter,
    /// Events emitted so far
    pub events: Vec<Event>,
    /// Pipeline annotations
    pub annotations: TxAnnotations,
}

impl<'s, S> Ctx<'s, S> {
    /// A fresh context over the storage
    pub fn new(storage: &'s mut S, mode: ExecMode) -> Self {
        Self {
            storage,
            mode,
            gas_meter: TxGasMeter::new_infinite(),
            events: vec![],
            annotations: TxAnnotations::default(),
        }
    }

    /// Check if the tx is being admitted into the mempool
    pub fn is_check_tx(&self) -> bool {
        self.mode == ExecMode::CheckTx
    }
}
