//! The decorator chain

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use terra_gas::{Gas, GasMetering};
use terra_storage::{StorageRead, StorageWrite};
use terra_tx::Tx;

use crate::decorators::*;
use crate::{AnteConfig, Ctx, Result};

/// Descriptor of the out of gas error a panicking decorator is turned into
const PANIC_DESCRIPTOR: &str = "panic in ante handler";

/// One step of the admission pipeline. A decorator either annotates the
/// context and lets the tx through, or rejects it.
pub trait AnteDecorator<S> {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Check the tx, possibly updating the context
    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()>;
}

/// The admission pipeline
pub struct AnteHandler<S> {
    decorators: Vec<Box<dyn AnteDecorator<S> + Send + Sync>>,
    oracle_spam: Arc<OracleSpamTracker>,
}

impl<S> AnteHandler<S>
where
    S: StorageRead + StorageWrite,
{
    /// Build the chain. The oracle spam tracker is shared with the node so
    /// that it outlives a single tx.
    pub fn new(
        config: &AnteConfig,
        oracle_spam: Arc<OracleSpamTracker>,
    ) -> Self {
        let decorators: Vec<Box<dyn AnteDecorator<S> + Send + Sync>> = vec![
            Box::new(LimitSimulationGasDecorator {
                simulation_gas_limit: config.simulation_gas_limit,
            }),
            Box::new(CountTxDecorator),
            Box::new(GasRegisterDecorator),
            Box::new(ExtensionOptionsDecorator),
            Box::new(ValidateBasicDecorator),
            Box::new(TxTimeoutHeightDecorator),
            Box::new(ValidateMemoDecorator),
            Box::new(OracleSpamDecorator {
                tracker: oracle_spam.clone(),
            }),
            Box::new(IbcTransferSpamDecorator {
                max_memo_length: config.max_memo_length,
                max_receiver_length: config.max_receiver_length,
            }),
            Box::new(MinInitialDepositDecorator),
            Box::new(ConsumeTxSizeGasDecorator),
            Box::new(FeeDecorator {
                cross_zone_rule: config.cross_zone_rule,
            }),
            // Do not add any other decorators below this point unless
            // explicitly explained: signatures are verified only once the
            // fee has been deducted.
            Box::new(DyncommDecorator),
            Box::new(SetPubKeyDecorator),
            Box::new(ValidateSigCountDecorator),
            Box::new(SigGasConsumeDecorator),
            Box::new(SigVerificationDecorator),
            Box::new(IncrementSequenceDecorator),
            Box::new(RedundantRelayDecorator),
        ];
        Self {
            decorators,
            oracle_spam,
        }
    }

    /// The names of the steps, in order
    pub fn decorator_names(&self) -> Vec<&'static str> {
        std::iter::once(SETUP_CONTEXT)
            .chain(self.decorators.iter().map(|d| d.name()))
            .collect()
    }

    /// Run the chain. The setup step installs the gas meter; a panic in any
    /// later step is reported as running out of gas. The oracle votes of a
    /// tx count against the rate limit only once every step admitted it.
    pub fn handle(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        set_up_context(ctx, tx)?;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_decorators(ctx, tx, simulate)
        }));
        match result {
            Ok(result) => {
                result?;
                self.oracle_spam.commit(&ctx.annotations.oracle_votes)
            }
            Err(err) => {
                tracing::error!("Ante handler panicked with {:#?}", err);
                Err(terra_gas::Error::OutOfGas {
                    descriptor: PANIC_DESCRIPTOR.to_string(),
                    limit: ctx
                        .gas_meter
                        .get_gas_limit()
                        .unwrap_or(Gas::from(u64::MAX)),
                    used: ctx.gas_meter.get_consumed_gas(),
                }
                .into())
            }
        }
    }

    fn run_decorators(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        for decorator in &self.decorators {
            decorator.ante(ctx, tx, simulate).map_err(|err| {
                tracing::debug!(
                    decorator = decorator.name(),
                    %err,
                    "Tx rejected by the ante handler"
                );
                err
            })?;
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for AnteHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnteHandler")
            .field(
                "decorators",
                &self.decorators.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
