//! Settlement of collected tax

use terra_bank::{BURN, FEE_COLLECTOR, ORACLE};
use terra_core::address::Address;
use terra_core::coin::{Amount, Coin, Coins};
use terra_core::dec::Dec;
use terra_parameters::{DistributionParams, TreasuryParams};
use terra_storage::{StorageRead, StorageWrite};

use crate::compute::TaxFlow;
use crate::{treasury, Error, Result};

/// Where a collected tax goes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaxSplit {
    /// Sent to the burn module account
    pub burn: Coins,
    /// Funded to the community pool
    pub community_pool: Coins,
    /// Sent to the oracle reward pool
    pub oracle: Coins,
    /// Left in the fee collector for the distribution module
    pub retained: Coins,
}

impl TaxSplit {
    /// The sum of all the parts, equal to the split tax
    pub fn total(&self) -> Option<Coins> {
        self.burn
            .checked_add(&self.community_pool)?
            .checked_add(&self.oracle)?
            .checked_add(&self.retained)
    }
}

/// Split a tax. `round(tax * burn_split_rate)` is distributed and the rest
/// is burnt. With a community tax `c`, a share `c / (1 + c * o)` of the
/// distributed part funds the community pool, where `o` is the oracle split
/// rate; the oracle gets `round(o * remaining)` and the rest is retained.
pub fn compute_split(
    tax: &Coins,
    burn_split_rate: Dec,
    oracle_split_rate: Dec,
    community_tax: Dec,
) -> Result<TaxSplit> {
    let community_rate = if community_tax.is_zero() {
        Dec::zero()
    } else {
        let denominator = community_tax
            .checked_mul(oracle_split_rate)
            .and_then(|prod| Dec::one().checked_add(prod))
            .ok_or(Error::Overflow)?;
        community_tax
            .checked_div(denominator)
            .ok_or(Error::Overflow)?
    };
    let mut split = TaxSplit::default();
    for Coin { denom, amount } in tax.iter() {
        let distributed =
            burn_split_rate.mul_round(amount).ok_or(Error::Overflow)?;
        let burn = checked_sub(amount, distributed)?;
        let community =
            community_rate.mul_round(distributed).ok_or(Error::Overflow)?;
        let remaining = checked_sub(distributed, community)?;
        let oracle =
            oracle_split_rate.mul_round(remaining).ok_or(Error::Overflow)?;
        let retained = checked_sub(remaining, oracle)?;

        add_to(&mut split.burn, &denom, burn)?;
        add_to(&mut split.community_pool, &denom, community)?;
        add_to(&mut split.oracle, &denom, oracle)?;
        add_to(&mut split.retained, &denom, retained)?;
    }
    Ok(split)
}

fn checked_sub(lhs: Amount, rhs: Amount) -> Result<Amount> {
    lhs.checked_sub(rhs).ok_or(Error::Overflow)
}

fn add_to(coins: &mut Coins, denom: &str, amount: Amount) -> Result<()> {
    *coins = coins
        .checked_add_coin(&Coin::new(denom, amount))
        .ok_or(Error::Overflow)?;
    Ok(())
}

/// Split a tax held by the fee collector: move the burnt part to the burn
/// module account, the oracle part to the oracle module account and fund
/// the community pool, then record the tax in the epoch's proceeds.
pub fn apply_burn_tax_split<S>(storage: &mut S, tax: &Coins) -> Result<TaxSplit>
where
    S: StorageRead + StorageWrite,
{
    if tax.is_zero() {
        return Ok(TaxSplit::default());
    }
    let treasury: TreasuryParams = terra_parameters::read(storage)?;
    let distribution: DistributionParams = terra_parameters::read(storage)?;
    let split = compute_split(
        tax,
        treasury.burn_split_rate,
        treasury.oracle_split_rate,
        distribution.community_tax,
    )?;
    terra_bank::send_coins(storage, &FEE_COLLECTOR, &BURN, &split.burn)?;
    terra_bank::send_coins(storage, &FEE_COLLECTOR, &ORACLE, &split.oracle)?;
    terra_bank::fund_community_pool(
        storage,
        &FEE_COLLECTOR,
        &split.community_pool,
    )?;
    treasury::record_tax_proceeds(storage, tax)?;
    tracing::debug!(
        %tax,
        burn = %split.burn,
        oracle = %split.oracle,
        community_pool = %split.community_pool,
        "Split burn tax"
    );
    Ok(split)
}

/// Charge the taxes of a reverse charged transaction: every flow's
/// recipient, or `tax_payer` when the flow has none, pays its tax into the
/// fee collector. Fails if a payer cannot cover its tax. Returns the total
/// charged.
pub fn charge_reverse<S>(
    storage: &mut S,
    flows: &[TaxFlow],
    tax_payer: &Address,
) -> Result<Coins>
where
    S: StorageRead + StorageWrite,
{
    let mut charged = Coins::new();
    for flow in flows {
        let payer = flow.recipient.as_ref().unwrap_or(tax_payer);
        terra_bank::send_coins(storage, payer, &FEE_COLLECTOR, &flow.tax)?;
        charged = charged.checked_add(&flow.tax).ok_or(Error::Overflow)?;
        tracing::info!(
            %payer,
            tax = %flow.tax,
            type_url = %flow.type_url,
            "Reverse charged tax"
        );
    }
    Ok(charged)
}
