//! Settlement of the tax after the messages executed

use terra_core::coin::Coins;
use terra_core::event::{EmitEvents, Event};
use terra_storage::{StorageRead, StorageWrite};
use terra_tax::TaxSplit;
use terra_tx::Tx;

use crate::{Ctx, Error, Result};

/// Type of the event carrying the settled tax
pub const TAX_EVENT: &str = "tax";

/// Settles the tax the admission pipeline annotated. A reverse charged tax
/// is first collected from the value flows into the fee collector; the
/// collected tax is then split between burn, oracle and community pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostHandler;

impl PostHandler {
    /// Settle the tax of a tx whose messages ran. Nothing is settled when
    /// they failed.
    pub fn handle<S>(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
        success: bool,
    ) -> Result<()>
    where
        S: StorageRead + StorageWrite,
    {
        if !success {
            return Ok(());
        }
        let annotations = &ctx.annotations;
        let tax = if annotations.tax_reverse_charge {
            let payer = annotations
                .tax_payer
                .or_else(|| tx.fee_payer())
                .ok_or(Error::NoFeePayer)?;
            terra_tax::charge_reverse(
                &mut *ctx.storage,
                &annotations.tax_flows,
                &payer,
            )?
        } else {
            annotations.tax_due.clone()
        };
        let split = terra_tax::apply_burn_tax_split(&mut *ctx.storage, &tax)?;

        let non_taxable = &ctx.annotations.non_taxable_tax;
        if !tax.is_zero() || !non_taxable.is_zero() {
            let event = tax_event(
                &tax,
                &split,
                non_taxable,
                ctx.annotations.tax_reverse_charge,
            );
            ctx.events.emit(event);
        }
        Ok(())
    }
}

fn tax_event(
    tax: &Coins,
    split: &TaxSplit,
    non_taxable: &Coins,
    reverse_charge: bool,
) -> Event {
    Event::new(TAX_EVENT)
        .with("tax", tax)
        .with("burn", &split.burn)
        .with("oracle", &split.oracle)
        .with("community_pool", &split.community_pool)
        .with("retained", &split.retained)
        .with("non_taxable", non_taxable)
        .with("reverse_charge", reverse_charge)
}

#[cfg(test)]
mod test_post {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use terra_bank::{BURN, FEE_COLLECTOR, ORACLE};
    use terra_core::address::testing::*;
    use terra_core::address::Address;
    use terra_core::coin::testing::coins;
    use terra_storage::MockStore;
    use terra_tx::testing::TxBuilder;

    use super::*;
    use crate::decorators::FeeDecorator;
    use crate::testing::{fund, init_storage, send};
    use crate::{AnteDecorator, ExecMode};

    fn balance(storage: &MockStore, owner: &Address) -> Coins {
        terra_bank::read_balances(storage, owner).unwrap()
    }

    /// Run the fee decorator, move the sent coins as the router would, then
    /// settle
    fn run(storage: &mut MockStore, tx: &Tx) -> (Result<()>, Vec<Event>) {
        let mut ctx = Ctx::new(storage, ExecMode::DeliverTx);
        FeeDecorator::default().ante(&mut ctx, tx, false).unwrap();
        terra_bank::send_coins(
            &mut *ctx.storage,
            &address_1(),
            &address_2(),
            &coins("1000000usdr"),
        )
        .unwrap();
        let result = PostHandler.handle(&mut ctx, tx, false, true);
        (result, ctx.events)
    }

    #[test]
    fn test_split_of_the_fee_tax() {
        let mut storage = init_storage();
        fund(&mut storage, &address_1(), "1005000usdr");
        let tx = TxBuilder::new(vec![send("1000000usdr")])
            .fee(coins("5000usdr"), 100)
            .build_unsigned();
        let (result, events) = run(&mut storage, &tx);
        result.unwrap();
        // Default split: 10% distributed, half of that to the oracle
        assert_eq!(balance(&storage, &BURN), coins("4500usdr"));
        assert_eq!(balance(&storage, &ORACLE), coins("250usdr"));
        assert_eq!(balance(&storage, &FEE_COLLECTOR), coins("250usdr"));
        assert_eq!(balance(&storage, &address_2()), coins("1000000usdr"));
        let event = events.last().unwrap();
        assert_eq!(event.event_type, TAX_EVENT);
        assert_eq!(event.get("tax"), Some("5000usdr"));
        assert_eq!(event.get("reverse_charge"), Some("false"));
    }

    #[test]
    fn test_reverse_charge_taxes_the_recipient() {
        let mut storage = init_storage();
        fund(&mut storage, &address_1(), "1001000usdr");
        let tx = TxBuilder::new(vec![send("1000000usdr")])
            .fee(coins("1000usdr"), 100)
            .build_unsigned();
        let (result, events) = run(&mut storage, &tx);
        result.unwrap();
        assert_eq!(balance(&storage, &address_2()), coins("995000usdr"));
        assert!(balance(&storage, &address_1()).is_zero());
        let burnt = balance(&storage, &BURN).amount_of("usdr");
        let oracle = balance(&storage, &ORACLE).amount_of("usdr");
        let collected = balance(&storage, &FEE_COLLECTOR).amount_of("usdr");
        assert_eq!(burnt, 4500u64.into());
        assert_eq!(oracle, 250u64.into());
        // The gas fee and the retained tax
        assert_eq!(collected, 1250u64.into());
        assert_eq!(events.last().unwrap().get("reverse_charge"), Some("true"));
    }

    #[test]
    fn test_reverse_charge_fails_when_recipient_cannot_pay() {
        let mut storage = init_storage();
        fund(&mut storage, &address_1(), "1001000usdr");
        let tx = TxBuilder::new(vec![send("1000000usdr")])
            .fee(coins("1000usdr"), 100)
            .build_unsigned();
        let mut ctx = Ctx::new(&mut storage, ExecMode::DeliverTx);
        FeeDecorator::default().ante(&mut ctx, &tx, false).unwrap();
        // The messages did not move the coins
        assert_matches!(
            PostHandler.handle(&mut ctx, &tx, false, true),
            Err(Error::Tax(_))
        );
    }

    #[test]
    fn test_nothing_settled_on_failure() {
        let mut storage = init_storage();
        let mut ctx = Ctx::new(&mut storage, ExecMode::DeliverTx);
        ctx.annotations.tax_due = coins("5000usdr");
        PostHandler
            .handle(&mut ctx, &Tx::default(), false, false)
            .unwrap();
        assert!(ctx.events.is_empty());
    }
}
