//! Governance and staking message checks

use terra_core::coin::Coins;
use terra_parameters::{GovParams, StakingParams, TreasuryParams};
use terra_storage::StorageRead;
use terra_tx::{Msg, Tx};

use crate::{AnteDecorator, Ctx, Error, Result};

/// Require proposals to carry a share of the min deposit in the bond denom
/// on submission
#[derive(Clone, Copy, Debug)]
pub struct MinInitialDepositDecorator;

impl<S> AnteDecorator<S> for MinInitialDepositDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "min_initial_deposit"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        terra_tx::visit_msgs(tx.msgs(), &mut |msg: &Msg| -> Result<()> {
            let Msg::SubmitProposal {
                initial_deposit, ..
            } = msg
            else {
                return Ok(());
            };
            let required = min_initial_deposit(&*ctx.storage)?;
            if !initial_deposit.is_all_gte(&required) {
                return Err(Error::NotEnoughInitialDeposit {
                    expected: required.to_string(),
                    got: initial_deposit.to_string(),
                });
            }
            Ok(())
        })
    }
}

/// The deposit a proposal must carry on submission:
/// `floor(min_deposit * min_initial_deposit_ratio)` in the bond denom
pub fn min_initial_deposit<S>(storage: &S) -> Result<Coins>
where
    S: StorageRead,
{
    let gov: GovParams = terra_parameters::read(storage)?;
    let treasury: TreasuryParams = terra_parameters::read(storage)?;
    let staking: StakingParams = terra_parameters::read(storage)?;
    let min_deposit = gov.min_deposit.amount_of(&staking.bond_denom);
    let amount = treasury
        .min_initial_deposit_ratio
        .mul_floor(min_deposit)
        .ok_or(Error::Overflow)?;
    Ok(Coins::single(staking.bond_denom, amount))
}

/// Reject commission edits below the validator's dynamic minimum
#[derive(Clone, Copy, Debug)]
pub struct DyncommDecorator;

impl<S> AnteDecorator<S> for DyncommDecorator
where
    S: StorageRead,
{
    fn name(&self) -> &'static str {
        "dyncomm"
    }

    fn ante(
        &self,
        ctx: &mut Ctx<'_, S>,
        tx: &Tx,
        _simulate: bool,
    ) -> Result<()> {
        Ok(terra_dyncomm::check_edit_validator(&*ctx.storage, tx.msgs())?)
    }
}
