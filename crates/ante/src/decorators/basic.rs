//! Stateless checks and the tx size charge

use terra_gas::GasMetering;
use terra_parameters::AuthParams;
use terra_storage::StorageRead;
use terra_tx::Tx;

use crate::{AnteDecorator, Ctx, Error, Result};

/// Reject extension options that are not allowed by the auth parameters
#[derive(Clone, Copy, Debug)]
pub struct ExtensionOptionsDecorator;

impl<S> AnteDecorator<S> for ExtensionOptionsDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "extension_options"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        if tx.body.extension_options.is_empty() {
            return Ok(());
        }
        let params: AuthParams = terra_parameters::read(&*ctx.storage)?;
        let unknown: Vec<&str> = tx
            .body
            .extension_options
            .iter()
            .filter(|option| {
                !params.allowed_extension_options.contains(*option)
            })
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::UnknownExtensionOptions(unknown.join(",")))
        }
    }
}

/// Stateless checks of the tx and its messages
#[derive(Clone, Copy, Debug)]
pub struct ValidateBasicDecorator;

impl<S> AnteDecorator<S> for ValidateBasicDecorator {
    fn name(&self) -> &'static str {
        "validate_basic"
    }

    fn ante(
        &self,
        _ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        Ok(tx.validate_basic()?)
    }
}

/// Reject txs past their timeout height
#[derive(Clone, Copy, Debug)]
pub struct TxTimeoutHeightDecorator;

impl<S> AnteDecorator<S> for TxTimeoutHeightDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "tx_timeout_height"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        let timeout = tx.body.timeout_height;
        let height = ctx.storage.get_block_height()?.0;
        if timeout != 0 && height > timeout {
            return Err(Error::TxTimeoutHeight { timeout, height });
        }
        Ok(())
    }
}

/// Reject memos longer than the auth parameters allow
#[derive(Clone, Copy, Debug)]
pub struct ValidateMemoDecorator;

impl<S> AnteDecorator<S> for ValidateMemoDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "validate_memo"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        let params: AuthParams = terra_parameters::read(&*ctx.storage)?;
        let got = u64::try_from(tx.body.memo.chars().count())
            .map_err(|_| Error::Overflow)?;
        if got > params.max_memo_characters {
            return Err(Error::MemoTooLong {
                max: params.max_memo_characters,
                got,
            });
        }
        Ok(())
    }
}

/// Charge gas for the encoded size of the tx
#[derive(Clone, Copy, Debug)]
pub struct ConsumeTxSizeGasDecorator;

impl<S> AnteDecorator<S> for ConsumeTxSizeGasDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "consume_tx_size_gas"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        let params: AuthParams = terra_parameters::read(&*ctx.storage)?;
        let len = u64::try_from(tx.to_bytes().len())
            .map_err(|_| Error::Overflow)?;
        ctx.gas_meter
            .consume_tx_size(len, params.tx_size_cost_per_byte)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use terra_gas::Gas;
    use terra_tx::testing::TxBuilder;

    use super::*;
    use crate::testing::{init_storage, send};
    use crate::ExecMode;

    #[test]
    fn test_timeout_height() {
        let mut storage = init_storage();
        storage.set_block_height(terra_core::chain::BlockHeight(10));
        let mut ctx = Ctx::new(&mut storage, ExecMode::CheckTx);
        for (timeout, ok) in [(0, true), (10, true), (9, false)] {
            let tx = TxBuilder::new(vec![send("1usdr")])
                .timeout_height(timeout)
                .build_unsigned();
            let result = TxTimeoutHeightDecorator.ante(&mut ctx, &tx, false);
            assert_eq!(result.is_ok(), ok, "timeout {timeout}");
        }
    }

    #[test]
    fn test_memo_length() {
        let mut storage = init_storage();
        let mut ctx = Ctx::new(&mut storage, ExecMode::CheckTx);
        let tx = TxBuilder::new(vec![send("1usdr")])
            .memo("ü".repeat(256))
            .build_unsigned();
        ValidateMemoDecorator.ante(&mut ctx, &tx, false).unwrap();
        let tx = TxBuilder::new(vec![send("1usdr")])
            .memo("a".repeat(257))
            .build_unsigned();
        assert_matches!(
            ValidateMemoDecorator.ante(&mut ctx, &tx, false),
            Err(Error::MemoTooLong { max: 256, got: 257 })
        );
    }

    #[test]
    fn test_extension_options() {
        let mut storage = init_storage();
        let mut ctx = Ctx::new(&mut storage, ExecMode::CheckTx);
        let tx = TxBuilder::new(vec![send("1usdr")])
            .extension_option("/custom.v1.Ext")
            .build_unsigned();
        let err = ExtensionOptionsDecorator
            .ante(&mut ctx, &tx, false)
            .unwrap_err();
        assert!(err.to_string().starts_with("unknown extension options"));

        let mut params = AuthParams::default();
        params
            .allowed_extension_options
            .push("/custom.v1.Ext".to_string());
        terra_parameters::write(&mut *ctx.storage, &params).unwrap();
        ExtensionOptionsDecorator.ante(&mut ctx, &tx, false).unwrap();
    }

    #[test]
    fn test_tx_size_gas() {
        let mut storage = init_storage();
        let mut ctx = Ctx::new(&mut storage, ExecMode::CheckTx);
        ctx.gas_meter = terra_gas::TxGasMeter::new(1_000_000);
        let tx = TxBuilder::new(vec![send("1usdr")]).build_unsigned();
        ConsumeTxSizeGasDecorator.ante(&mut ctx, &tx, false).unwrap();
        let expected = Gas::from(
            u64::try_from(tx.to_bytes().len()).unwrap() * 10,
        );
        assert_eq!(ctx.gas_meter.get_consumed_gas(), expected);
    }
}
