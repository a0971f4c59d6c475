//! Fee and tax deduction

use std::collections::BTreeMap;

use terra_bank::FEE_COLLECTOR;
use terra_core::address::Address;
use terra_core::coin::{Amount, Coin, Coins};
use terra_core::dec::Dec;
use terra_core::event::{EmitEvents, Event};
use terra_storage::{StorageRead, StorageWrite};
use terra_tax::{compute_taxes, TaxPolicy};
use terra_taxexemption::CrossZoneRule;
use terra_tx::Tx;

use crate::{AnteDecorator, Ctx, Error, Result};

/// Type of the event carrying the deducted fee
pub const TX_EVENT: &str = "tx";

/// Check the fee covers the gas and the burn tax, then deduct it into the
/// fee collector. When the fee covers the gas but not the tax, the tax is
/// reverse charged after execution.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeeDecorator {
    /// How sends between two tax exemption zones are decided
    pub cross_zone_rule: CrossZoneRule,
}

impl<S> AnteDecorator<S> for FeeDecorator
where
    S: StorageRead + StorageWrite,
{
    fn name(&self) -> &'static str {
        "deduct_fee"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<()> {
        let fee = &tx.fee().amount;
        let gas = tx.gas();
        let height = ctx.storage.get_block_height()?;
        if !simulate && !height.is_genesis() && gas == 0 {
            return Err(Error::InvalidGasLimit);
        }

        let policy = TaxPolicy::read(&*ctx.storage, self.cross_zone_rule)?;
        let taxes = compute_taxes(&*ctx.storage, &policy, tx.msgs(), simulate)?;
        let mut tax_due = taxes.total()?;
        let mut reverse_charge = false;
        let mut shortfall = Coins::new();

        let priority = if tx.is_oracle_tx() {
            i64::MAX
        } else {
            let required_gas = required_gas_fees(&policy.tax.gas_prices, gas)?;
            let required =
                required_gas.checked_add(&tax_due).ok_or(Error::Overflow)?;
            if simulate {
                shortfall = required.safe_sub(fee).0;
            } else if covers_gas_and_tax(fee, &required_gas, &tax_due) {
                // Normal charge, the tax is split out of the fee at post
            } else if required_gas.is_zero() || fee.is_any_gte(&required_gas)
            {
                reverse_charge = true;
                tracing::info!(
                    %fee,
                    tax = %tax_due,
                    "Fee does not cover the tax, reverse charging"
                );
                tax_due = Coins::new();
            } else {
                return Err(Error::InsufficientFee {
                    got: fee.clone(),
                    required,
                    gas: required_gas,
                    stability: tax_due,
                });
            }
            tx_priority(fee, gas)
        };

        let to_deduct = fee.checked_add(&shortfall).ok_or(Error::Overflow)?;
        let deduct_from = fee_deduction_account(ctx, tx, &to_deduct)?;
        if !shortfall.is_zero() {
            terra_bank::mint_coins_to(
                &mut *ctx.storage,
                &deduct_from,
                &shortfall,
            )?;
        }
        if !to_deduct.is_zero() {
            terra_bank::send_coins(
                &mut *ctx.storage,
                &deduct_from,
                &FEE_COLLECTOR,
                &to_deduct,
            )?;
        }
        ctx.events.emit(
            Event::new(TX_EVENT)
                .with("fee", &to_deduct)
                .with("fee_payer", deduct_from),
        );

        let annotations = &mut ctx.annotations;
        annotations.priority = priority;
        annotations.tax_due = tax_due;
        annotations.tax_flows = taxes.flows;
        annotations.tax_payer = Some(deduct_from);
        annotations.tax_reverse_charge = reverse_charge;
        annotations.non_taxable_tax = taxes.non_taxable;
        Ok(())
    }
}

/// The account the fee is deducted from: the fee granter, whose allowance
/// to the fee payer is consumed, or else the fee payer
fn fee_deduction_account<S>(
    ctx: &mut Ctx<'_, S>,
    tx: &Tx,
    fee: &Coins,
) -> Result<Address>
where
    S: StorageRead + StorageWrite,
{
    let fee_payer = tx.fee_payer().ok_or(Error::NoFeePayer)?;
    match tx.fee_granter() {
        Some(granter) if granter != fee_payer => {
            let height = ctx.storage.get_block_height()?;
            terra_account::feegrant::use_grant(
                &mut *ctx.storage,
                &granter,
                &fee_payer,
                fee,
                height,
            )
            .map_err(Error::FeeGrant)?;
            Ok(granter)
        }
        _ => Ok(fee_payer),
    }
}

/// The fees the gas limit requires: `ceil(price * gas)` in every
/// denomination with a gas price
pub fn required_gas_fees(
    gas_prices: &BTreeMap<String, Dec>,
    gas: u64,
) -> Result<Coins> {
    gas_prices.iter().try_fold(Coins::new(), |required, (denom, price)| {
        let amount =
            price.mul_ceil(Amount::from(gas)).ok_or(Error::Overflow)?;
        required
            .checked_add_coin(&Coin::new(denom.clone(), amount))
            .ok_or(Error::Overflow)
    })
}

/// Check the fee pays the gas in one of its priced denominations and, out
/// of what is left, the whole tax in every denomination
fn covers_gas_and_tax(fee: &Coins, required_gas: &Coins, tax: &Coins) -> bool {
    if required_gas.is_zero() {
        return fee.is_all_gte(tax);
    }
    required_gas.iter().any(|gas_fee| {
        let (left, short) = fee.safe_sub(&Coins::from(gas_fee));
        !short && left.is_all_gte(tax)
    })
}

/// The priority of a tx: the lowest gas price it pays across the fee
/// denominations, saturated at [`i64::MAX`]
pub fn tx_priority(fee: &Coins, gas: u64) -> i64 {
    fee.iter()
        .filter_map(|coin| coin.amount.checked_div_u64(gas))
        .map(|price| price.raw().saturating_to_i64())
        .min()
        .unwrap_or_default()
}
