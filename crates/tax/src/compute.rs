//! Tax due on a transaction's messages

use once_cell::sync::Lazy;
use regex::Regex;
use terra_core::address::Address;
use terra_core::coin::{Amount, Coin, Coins};
use terra_parameters::{StakingParams, TaxParams, TreasuryParams};
use terra_storage::StorageRead;
use terra_taxexemption::CrossZoneRule;
use terra_tx::msg::Msg;

use crate::{Error, Result};

/// Denominations of tokens bridged over IBC
static IBC_DENOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ibc/[0-9a-f]{64}$").expect("IBC denom regex is valid")
});

/// In simulation, a non-zero tax below this amount is raised to it so that
/// the estimated fee covers the split and burn paths.
pub const SIMULATION_MIN_TAX: u64 = 100;

/// The parameters tax computation depends on
#[derive(Clone, Debug, Default)]
pub struct TaxPolicy {
    /// Tax rate and taxable message types
    pub tax: TaxParams,
    /// Tax caps
    pub treasury: TreasuryParams,
    /// The untaxed native denomination
    pub bond_denom: String,
    /// How sends between two zones are decided
    pub cross_zone_rule: CrossZoneRule,
}

impl TaxPolicy {
    /// Read the policy from the on-chain parameters
    pub fn read<S>(storage: &S, cross_zone_rule: CrossZoneRule) -> Result<Self>
    where
        S: StorageRead + ?Sized,
    {
        let staking: StakingParams = terra_parameters::read(storage)?;
        Ok(Self {
            tax: terra_parameters::read(storage)?,
            treasury: terra_parameters::read(storage)?,
            bond_denom: staking.bond_denom,
            cross_zone_rule,
        })
    }

    /// Check if coins of a denomination are never taxed
    pub fn is_untaxed_denom(&self, denom: &str) -> bool {
        denom == self.bond_denom || IBC_DENOM_RE.is_match(denom)
    }

    /// The tax on one coin
    pub fn tax_of_coin(&self, coin: &Coin, simulate: bool) -> Result<Amount> {
        if self.is_untaxed_denom(&coin.denom) {
            return Ok(Amount::zero());
        }
        let mut tax = self
            .tax
            .burn_tax_rate
            .mul_floor(coin.amount)
            .ok_or(Error::Overflow)?;
        if let Some(cap) = self.treasury.tax_cap(&coin.denom) {
            tax = tax.min(cap);
        }
        let min_tax = Amount::from(SIMULATION_MIN_TAX);
        if simulate && !tax.is_zero() && tax < min_tax {
            tax = min_tax;
        }
        Ok(tax)
    }

    /// The tax on a set of coins, without zero entries
    pub fn tax_of(&self, coins: &Coins, simulate: bool) -> Result<Coins> {
        coins.iter().try_fold(Coins::new(), |taxes, coin| {
            let tax = self.tax_of_coin(&coin, simulate)?;
            taxes
                .checked_add_coin(&Coin::new(coin.denom, tax))
                .ok_or(Error::Overflow)
        })
    }
}

/// The tax owed on one message's value flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxFlow {
    /// Type url of the taxed message
    pub type_url: String,
    /// The recipient of the value, who pays the tax on reverse charge.
    /// `None` when the message has no explicit recipient.
    pub recipient: Option<Address>,
    /// Tax owed
    pub tax: Coins,
}

/// Taxes owed by a transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Taxes {
    /// Taxes charged through the fee, per message
    pub flows: Vec<TaxFlow>,
    /// Taxes on funds sent to contracts, accounted after execution rather
    /// than through the fee
    pub non_taxable: Coins,
}

impl Taxes {
    /// The sum of the taxes charged through the fee
    pub fn total(&self) -> Result<Coins> {
        self.flows.iter().try_fold(Coins::new(), |acc, flow| {
            acc.checked_add(&flow.tax).ok_or(Error::Overflow)
        })
    }

    /// Check if no tax is charged through the fee
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    fn push(&mut self, msg: &Msg, recipient: Option<Address>, tax: Coins) {
        if !tax.is_zero() {
            self.flows.push(TaxFlow {
                type_url: msg.type_url().to_string(),
                recipient,
                tax,
            });
        }
    }
}

/// Compute the taxes owed on the messages, descending into authz exec
/// messages. Sends whose every sender and recipient pair is exempt are
/// skipped.
pub fn compute_taxes<S>(
    storage: &S,
    policy: &TaxPolicy,
    msgs: &[Msg],
    simulate: bool,
) -> Result<Taxes>
where
    S: StorageRead + ?Sized,
{
    let rule = policy.cross_zone_rule;
    let is_exempt = |from: &Address, to: &[Address]| -> Result<bool> {
        Ok(terra_taxexemption::is_exempt(storage, from, to, rule)?)
    };
    let mut taxes = Taxes::default();
    terra_tx::visit_msgs(msgs, &mut |msg: &Msg| -> Result<()> {
        if !policy.tax.is_taxable(msg.type_url()) {
            return Ok(());
        }
        match msg {
            Msg::Send { from, to, amount } => {
                if !is_exempt(from, &[*to])? {
                    let tax = policy.tax_of(amount, simulate)?;
                    taxes.push(msg, Some(*to), tax);
                }
            }
            Msg::MultiSend { inputs, outputs } => {
                let recipients: Vec<Address> =
                    outputs.iter().map(|output| output.address).collect();
                let mut exempt = true;
                for input in inputs {
                    if !is_exempt(&input.address, &recipients)? {
                        exempt = false;
                        break;
                    }
                }
                if !exempt {
                    for output in outputs {
                        let tax = policy.tax_of(&output.coins, simulate)?;
                        taxes.push(msg, Some(output.address), tax);
                    }
                }
            }
            Msg::SwapSend {
                from,
                to,
                offer_coin,
                ..
            } => {
                if !is_exempt(from, &[*to])? {
                    let offer = Coins::from(offer_coin.clone());
                    let tax = policy.tax_of(&offer, simulate)?;
                    taxes.push(msg, Some(*to), tax);
                }
            }
            Msg::Swap { offer_coin, .. } => {
                let offer = Coins::from(offer_coin.clone());
                taxes.push(msg, None, policy.tax_of(&offer, simulate)?);
            }
            Msg::Delegate { amount, .. } => {
                let amount = Coins::from(amount.clone());
                taxes.push(msg, None, policy.tax_of(&amount, simulate)?);
            }
            Msg::Transfer { token, .. } => {
                let token = Coins::from(token.clone());
                taxes.push(msg, None, policy.tax_of(&token, simulate)?);
            }
            Msg::InstantiateContract { funds, .. }
            | Msg::InstantiateContract2 { funds, .. }
            | Msg::ExecuteContract { funds, .. } => {
                let tax = policy.tax_of(funds, simulate)?;
                taxes.non_taxable = taxes
                    .non_taxable
                    .checked_add(&tax)
                    .ok_or(Error::Overflow)?;
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(taxes)
}

#[cfg(test)]
mod test_compute_taxes {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use terra_core::address::testing::*;
    use terra_core::coin::testing::{arb_coins, coins};
    use terra_core::dec::testing::{arb_rate, dec};
    use terra_storage::MockStore;
    use terra_taxexemption::testing::zone;
    use terra_tx::msg::InputOutput;

    use super::*;

    fn policy() -> TaxPolicy {
        TaxPolicy {
            bond_denom: "uluna".to_string(),
            ..TaxPolicy::default()
        }
    }

    fn send(amount: &str) -> Msg {
        Msg::Send {
            from: address_1(),
            to: address_2(),
            amount: coins(amount),
        }
    }

    #[test]
    fn test_send_tax() {
        let storage = MockStore::default();
        let taxes = compute_taxes(
            &storage,
            &policy(),
            &[send("1000000usdr,1000000uluna")],
            false,
        )
        .unwrap();
        assert_eq!(
            taxes.flows,
            vec![TaxFlow {
                type_url: terra_tx::msg::type_url::MSG_SEND.to_string(),
                recipient: Some(address_2()),
                tax: coins("5000usdr"),
            }]
        );
        assert!(taxes.non_taxable.is_zero());
    }

    #[test]
    fn test_untaxed_denoms_and_caps() {
        let mut policy = policy();
        policy
            .treasury
            .tax_caps
            .insert("uusd".to_string(), Amount::from(1000u64));
        let ibc = format!("ibc/{}", "ab".repeat(32));
        let coins = coins(&format!("1000000uluna,1000000{ibc},1000000uusd"));
        assert_eq!(
            policy.tax_of(&coins, false).unwrap(),
            terra_core::coin::testing::coins("1000uusd")
        );
        // upper case hex is not an IBC hash
        let not_ibc = format!("ibc/{}", "AB".repeat(32));
        assert!(!policy.is_untaxed_denom(&not_ibc));
    }

    #[test]
    fn test_simulation_raises_small_taxes() {
        let policy = policy();
        assert_eq!(
            policy.tax_of(&coins("1000usdr,10uusd"), true).unwrap(),
            coins("100usdr")
        );
        assert_eq!(
            policy.tax_of(&coins("1000usdr"), false).unwrap(),
            coins("5usdr")
        );
    }

    #[test]
    fn test_untaxable_messages_and_contracts() {
        let storage = MockStore::default();
        let msgs = vec![
            Msg::Undelegate {
                delegator: address_1(),
                validator: address_2(),
                amount: Coin::new("usdr", 1_000_000u64),
            },
            Msg::ExecuteContract {
                sender: address_1(),
                contract: address_3(),
                funds: coins("1000000usdr"),
                msg: vec![],
            },
        ];
        let taxes = compute_taxes(&storage, &policy(), &msgs, false).unwrap();
        assert!(taxes.is_empty());
        assert_eq!(taxes.non_taxable, coins("5000usdr"));
    }

    #[test]
    fn test_exempt_sends() {
        let mut storage = MockStore::default();
        terra_taxexemption::add_zone(
            &mut storage,
            zone("Z", false, false, false),
            &[address_1(), address_2()],
        )
        .unwrap();
        let taxes =
            compute_taxes(&storage, &policy(), &[send("1000000usdr")], false)
                .unwrap();
        assert!(taxes.is_empty());

        // one output outside the zone taxes every output
        let multisend = Msg::MultiSend {
            inputs: vec![InputOutput {
                address: address_1(),
                coins: coins("2000000usdr"),
            }],
            outputs: vec![
                InputOutput {
                    address: address_2(),
                    coins: coins("1000000usdr"),
                },
                InputOutput {
                    address: address_3(),
                    coins: coins("1000000usdr"),
                },
            ],
        };
        let taxes =
            compute_taxes(&storage, &policy(), &[multisend], false).unwrap();
        assert_eq!(taxes.flows.len(), 2);
        assert_eq!(taxes.total().unwrap(), coins("10000usdr"));
    }

    #[test]
    fn test_authz_exec_is_taxed_recursively() {
        let storage = MockStore::default();
        let mut msg = send("1000000usdr");
        for _ in 0..3 {
            msg = Msg::Exec {
                grantee: address_3(),
                msgs: vec![msg],
            };
        }
        let taxes = compute_taxes(&storage, &policy(), &[msg], false).unwrap();
        assert_eq!(taxes.total().unwrap(), coins("5000usdr"));

        let mut msg = send("1000000usdr");
        for _ in 0..=terra_tx::MAX_AUTHZ_DEPTH {
            msg = Msg::Exec {
                grantee: address_3(),
                msgs: vec![msg],
            };
        }
        assert_matches!(
            compute_taxes(&storage, &policy(), &[msg], false),
            Err(Error::TxError(terra_tx::Error::MaxDepth(_)))
        );
    }

    proptest! {
        /// Tax computation is deterministic and never exceeds the rate
        #[test]
        fn test_tax_bounded_by_rate(amount in arb_coins(), rate in arb_rate()) {
            let storage = MockStore::default();
            let mut policy = policy();
            policy.tax.burn_tax_rate = rate;
            let msgs = vec![Msg::Send {
                from: address_1(),
                to: address_2(),
                amount: amount.clone(),
            }];
            let taxes = compute_taxes(&storage, &policy, &msgs, false).unwrap();
            let again = compute_taxes(&storage, &policy, &msgs, false).unwrap();
            prop_assert_eq!(&taxes, &again);
            let total = taxes.total().unwrap();
            prop_assert!(amount.is_all_gte(&total));
            for coin in total.iter() {
                prop_assert_ne!(coin.denom.as_str(), "uluna");
                let bound =
                    rate.mul_floor(amount.amount_of(&coin.denom)).unwrap();
                prop_assert_eq!(coin.amount, bound);
            }
        }
    }

    #[test]
    fn test_rate_of_half_percent() {
        let mut policy = policy();
        policy.tax.burn_tax_rate = dec("0.005");
        assert_eq!(
            policy.tax_of(&coins("999usdr"), false).unwrap(),
            coins("4usdr")
        );
    }
}
