//! Wasm VM bookkeeping

use terra_gas::TxGasMeter;
use terra_storage::{StorageRead, StorageWrite};
use terra_tx::Tx;

use crate::{AnteDecorator, Ctx, Result, WasmGasRegister};

const WASM_TX_COUNTER_SEG: &str = "wasm_tx_counter";

/// Bound the gas a simulation may use
#[derive(Clone, Copy, Debug)]
pub struct LimitSimulationGasDecorator {
    /// The bound, none to keep the tx's own limit
    pub simulation_gas_limit: Option<u64>,
}

impl<S> AnteDecorator<S> for LimitSimulationGasDecorator {
    fn name(&self) -> &'static str {
        "limit_simulation_gas"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        _tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        if let (true, Some(limit)) = (simulate, self.simulation_gas_limit) {
            ctx.gas_meter = TxGasMeter::new(limit);
        }
        Ok(())
    }
}

/// Number the txs of a block in the transient store
#[derive(Clone, Copy, Debug)]
pub struct CountTxDecorator;

impl<S> AnteDecorator<S> for CountTxDecorator
where
    S: StorageRead + StorageWrite,
{
    fn name(&self) -> &'static str {
        "count_tx"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        _tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        let key = terra_storage::transient_key(&WASM_TX_COUNTER_SEG);
        let index: u64 = ctx.storage.read(&key)?.unwrap_or_default();
        ctx.annotations.wasm_tx_index = index;
        if !simulate {
            ctx.storage.write(&key, index.saturating_add(1))?;
        }
        Ok(())
    }
}

/// Register the wasm VM gas prices
#[derive(Clone, Copy, Debug)]
pub struct GasRegisterDecorator;

impl<S> AnteDecorator<S> for GasRegisterDecorator {
    fn name(&self) -> &'static str {
        "gas_register"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        _tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        ctx.annotations.wasm_gas_register = Some(WasmGasRegister::default());
        Ok(())
    }
}
