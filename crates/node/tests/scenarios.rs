//! End-to-end runs of the node: txs are admitted into the mempool, proposed
//! and delivered in blocks.

use pretty_assertions::assert_eq;
use terra_ante::testing::{signer_1, signer_2, TEST_CHAIN_ID};
use terra_ante::TAX_EVENT;
use terra_core::address::testing::*;
use terra_core::address::Address;
use terra_core::chain::{BlockHeight, ChainId};
use terra_core::coin::testing::coins;
use terra_core::coin::{Amount, Coins};
use terra_core::dec::testing::dec;
use terra_core::event::Event;
use terra_core::key::SecretKey;
use terra_mempool::Mempool;
use terra_node::config::Config;
use terra_node::{Genesis, ResultCode, Shell, TxResult};
use terra_parameters::{DyncommParams, Parameters};
use terra_staking::testing::bonded_validator;
use terra_taxexemption::testing::zone;
use terra_taxexemption::CrossZoneRule;
use terra_tx::testing::TxBuilder;
use terra_tx::Msg;
use tracing_subscriber::filter::LevelFilter;

const GAS_LIMIT: u64 = 200_000;

fn config() -> Config {
    Config {
        chain_id: ChainId::from(TEST_CHAIN_ID),
        ..Config::default()
    }
}

fn genesis(balances: Vec<(Address, Coins)>) -> Genesis {
    Genesis {
        chain_id: ChainId::from(TEST_CHAIN_ID),
        parameters: Parameters::default(),
        balances,
        ..Default::default()
    }
}

/// Initialize the chain and commit its first block
fn start_chain(config: Config, genesis: Genesis) -> Shell {
    // Only the first test to get here installs the subscriber
    let _ = terra_node::logging::init_from_env_or(LevelFilter::WARN);
    let mut shell = Shell::new(config);
    shell.init_chain(genesis).unwrap();
    finalize(&mut shell, 1, &[]);
    shell
}

/// Execute and commit a block with the given txs
fn finalize(
    shell: &mut Shell,
    height: u64,
    txs: &[Vec<u8>],
) -> Vec<TxResult> {
    shell.begin_block(BlockHeight(height)).unwrap();
    let results = txs.iter().map(|tx| shell.deliver_tx(tx)).collect();
    shell.end_block().unwrap();
    shell.commit().unwrap();
    results
}

fn signed(
    shell: &Shell,
    secret_key: SecretKey,
    msgs: Vec<Msg>,
    fee: Coins,
    sequence: u64,
) -> Vec<u8> {
    let owner = secret_key.ref_to().address();
    let account_number = terra_account::read_account(&shell.state, &owner)
        .unwrap()
        .map(|account| account.account_number)
        .unwrap_or_default();
    TxBuilder::new(msgs)
        .fee(fee, GAS_LIMIT)
        .signer(secret_key, account_number, sequence)
        .sign(&ChainId::from(TEST_CHAIN_ID))
        .to_bytes()
}

fn send(from: Address, to: Address, amount: &str) -> Msg {
    Msg::Send {
        from,
        to,
        amount: coins(amount),
    }
}

fn balance(shell: &Shell, owner: &Address) -> Coins {
    terra_bank::read_balances(&shell.state, owner).unwrap()
}

fn tax_event(result: &TxResult) -> Option<&Event> {
    result
        .events
        .iter()
        .find(|event| event.event_type == TAX_EVENT)
}

fn assert_ok(result: &TxResult) {
    assert_eq!(result.code, ResultCode::Ok, "{}", result.info);
}

/// Oracle txs are proposed before any other tx, and delivered txs leave
/// the mempool
#[test]
fn test_oracle_txs_are_proposed_first() {
    let (feeder_key, feeder) = signer_1();
    let (sender_key, sender) = signer_2();
    let mut genesis = genesis(vec![
        (feeder, coins("1000000uluna")),
        (sender, coins("10000000usdr")),
    ]);
    genesis.validators = vec![bonded_validator(feeder, 10, dec("0.1"))];
    let mut shell = start_chain(config(), genesis);

    let prevote = Msg::AggregateExchangeRatePrevote {
        hash: "4f2a9c".to_string(),
        feeder,
        validator: feeder,
    };
    let oracle_tx =
        signed(&shell, feeder_key, vec![prevote], Coins::new(), 0);
    let bank_tx = signed(
        &shell,
        sender_key,
        vec![send(sender, address_2(), "1000usdr")],
        coins("100usdr"),
        0,
    );
    assert_ok(&shell.check_tx(&oracle_tx));
    let result = shell.check_tx(&bank_tx);
    assert_ok(&result);
    assert!(result.priority < i64::MAX);

    let proposal = shell.prepare_proposal(usize::MAX);
    assert_eq!(proposal, vec![oracle_tx.clone(), bank_tx.clone()]);
    assert_eq!(shell.prepare_proposal(oracle_tx.len()), vec![oracle_tx]);

    let results = finalize(&mut shell, 2, &proposal);
    results.iter().for_each(assert_ok);
    assert_eq!(shell.mempool().count_tx(), 0);
}

/// Regular txs are proposed by sender, and by nonce for each sender
#[test]
fn test_txs_are_proposed_by_sender_and_nonce() {
    let (key_a, a) = signer_1();
    let (key_b, b) = signer_2();
    let mut shell = start_chain(
        config(),
        genesis(vec![
            (a, coins("10000000usdr")),
            (b, coins("10000000usdr")),
        ]),
    );

    let tx = |key: &SecretKey, from: Address, sequence: u64| {
        signed(
            &shell,
            key.clone(),
            vec![send(from, address_3(), "1000usdr")],
            coins("100usdr"),
            sequence,
        )
    };
    let a_txs = vec![tx(&key_a, a, 0), tx(&key_a, a, 1)];
    let b_txs = vec![tx(&key_b, b, 0), tx(&key_b, b, 1)];
    for tx_bytes in a_txs.iter().chain(&b_txs) {
        assert_ok(&shell.check_tx(tx_bytes));
    }

    let expected = if a < b {
        [a_txs, b_txs].concat()
    } else {
        [b_txs, a_txs].concat()
    };
    let proposal = shell.prepare_proposal(usize::MAX);
    assert_eq!(proposal, expected);

    let results = finalize(&mut shell, 2, &proposal);
    results.iter().for_each(assert_ok);
    assert_eq!(balance(&shell, &address_3()), coins("4000usdr"));
}

/// A send between two members of a zone is not taxed
#[test]
fn test_send_within_zone_is_not_taxed() {
    let (key_p, p) = signer_1();
    let q = address_2();
    let mut genesis = genesis(vec![(p, coins("5000000usdr"))]);
    genesis.zones = vec![(zone("z", false, false, false), vec![p, q])];
    let mut shell = start_chain(config(), genesis);

    let tx = signed(
        &shell,
        key_p,
        vec![send(p, q, "1000000usdr")],
        Coins::new(),
        0,
    );
    assert_ok(&shell.check_tx(&tx));
    let results = finalize(&mut shell, 2, &[tx]);
    assert_ok(&results[0]);
    assert!(tax_event(&results[0]).is_none());
    assert_eq!(balance(&shell, &p), coins("4000000usdr"));
    assert_eq!(balance(&shell, &q), coins("1000000usdr"));
    assert_eq!(
        terra_bank::read_total_supply(&shell.state, "usdr").unwrap(),
        Amount::from(5_000_000_u64)
    );
}

/// A prevote the pipeline rejects doesn't use up its validator's prevote of
/// the block
#[test]
fn test_rejected_prevote_is_not_rate_limited() {
    let (feeder_key, feeder) = signer_1();
    let (other_key, _) = signer_2();
    let mut genesis = genesis(vec![(feeder, coins("1000000uluna"))]);
    genesis.validators = vec![bonded_validator(feeder, 10, dec("0.1"))];
    let mut shell = start_chain(config(), genesis);

    let prevote = Msg::AggregateExchangeRatePrevote {
        hash: "4f2a9c".to_string(),
        feeder,
        validator: feeder,
    };
    let forged =
        signed(&shell, other_key, vec![prevote.clone()], Coins::new(), 0);
    let result = shell.check_tx(&forged);
    assert_eq!(result.code, ResultCode::AnteRejected);

    let genuine = signed(&shell, feeder_key, vec![prevote], Coins::new(), 0);
    assert_ok(&shell.check_tx(&genuine));
}

/// An admitted tx bumps its signer's sequence on the check state only, so
/// the same bytes are refused on resubmission until the block commits
#[test]
fn test_check_tx_charges_the_check_state() {
    let (key_p, p) = signer_1();
    let q = address_2();
    let mut shell =
        start_chain(config(), genesis(vec![(p, coins("5000000usdr"))]));

    let tx = signed(
        &shell,
        key_p,
        vec![send(p, q, "1000usdr")],
        coins("5000usdr"),
        0,
    );
    assert_ok(&shell.check_tx(&tx));
    let again = shell.check_tx(&tx);
    assert_eq!(again.code, ResultCode::AnteRejected);
    assert_eq!(balance(&shell, &p), coins("5000000usdr"));

    let results = finalize(&mut shell, 2, &[tx]);
    assert_ok(&results[0]);
    assert!(balance(&shell, &q).amount_of("usdr") > Amount::zero());
}

/// A fee short of the tax is accepted and the tax is charged to the
/// recipient after the send
#[test]
fn test_reverse_charge() {
    let (key_x, x) = signer_1();
    let y = address_2();
    let mut shell =
        start_chain(config(), genesis(vec![(x, coins("2000000usdr"))]));

    let tx = signed(
        &shell,
        key_x,
        vec![send(x, y, "1000000usdr")],
        coins("1000usdr"),
        0,
    );
    let results = finalize(&mut shell, 2, &[tx]);
    assert_ok(&results[0]);
    let event = tax_event(&results[0]).unwrap();
    assert_eq!(event.get("tax"), Some("5000usdr"));
    assert_eq!(event.get("reverse_charge"), Some("true"));
    assert_eq!(balance(&shell, &x), coins("999000usdr"));
    assert_eq!(balance(&shell, &y), coins("995000usdr"));
}

/// A send across two zones that both allow it is exempt under the default
/// rule, and taxed when cross-zone sends are never exempt
#[test]
fn test_cross_zone_send() {
    let run = |cross_zone_rule: CrossZoneRule| {
        let (key_p, p) = signer_1();
        let q = address_2();
        let mut genesis = genesis(vec![(p, coins("2000000usdr"))]);
        genesis.zones = vec![
            (zone("zc1", true, false, true), vec![p]),
            (zone("zc2", false, true, true), vec![q]),
        ];
        let mut config = config();
        config.tax_exemption.cross_zone_rule = cross_zone_rule;
        let mut shell = start_chain(config, genesis);
        let tx = signed(
            &shell,
            key_p,
            vec![send(p, q, "1000000usdr")],
            Coins::new(),
            0,
        );
        let results = finalize(&mut shell, 2, &[tx]);
        assert_ok(&results[0]);
        balance(&shell, &q)
    };
    assert_eq!(run(CrossZoneRule::AllFlags), coins("1000000usdr"));
    assert_eq!(run(CrossZoneRule::Never), coins("995000usdr"));
}

/// A validator can't set a commission below its dynamic minimum
#[test]
fn test_commission_below_dynamic_minimum() {
    let (key_v, v) = signer_1();
    let mut genesis = genesis(vec![(v, coins("1000000uluna"))]);
    genesis.parameters.dyncomm = DyncommParams {
        max_zero: dec("0"),
        slope_base: dec("1"),
        slope_vp_impact: dec("100"),
        cap: dec("0.5"),
    };
    genesis.validators = vec![
        bonded_validator(v, 18, dec("0.3")),
        bonded_validator(address_2(), 50, dec("0.3")),
        bonded_validator(address_3(), 32, dec("0.3")),
    ];
    let mut shell = start_chain(config(), genesis);
    let edit = |rate: &str| {
        signed(
            &shell,
            key_v.clone(),
            vec![Msg::EditValidator {
                validator: v,
                commission_rate: Some(dec(rate)),
            }],
            Coins::new(),
            0,
        )
    };

    let too_low = edit("0.20");
    let at_minimum = edit("0.23");

    let result = shell.check_tx(&too_low);
    assert_eq!(result.code, ResultCode::AnteRejected);
    assert!(
        result.info.starts_with(&format!("commission for {v}")),
        "{}",
        result.info
    );
    assert_ok(&shell.check_tx(&at_minimum));
}

/// The tax is split between burn, community pool and oracle, the rest
/// staying in the fee collector
#[test]
fn test_burn_tax_split() {
    let (key_x, x) = signer_1();
    let mut genesis = genesis(vec![(x, coins("1000000usdr"))]);
    genesis.parameters.treasury.burn_split_rate = dec("0.5");
    genesis.parameters.treasury.oracle_split_rate = dec("0.5");
    genesis.parameters.distribution.community_tax = dec("0.5");
    let mut shell = start_chain(config(), genesis);

    let tx = signed(
        &shell,
        key_x,
        vec![send(x, address_2(), "200000usdr")],
        coins("1000usdr"),
        0,
    );
    let results = finalize(&mut shell, 2, &[tx]);
    assert_ok(&results[0]);
    let event = tax_event(&results[0]).unwrap();
    assert_eq!(event.get("tax"), Some("1000usdr"));
    assert_eq!(event.get("burn"), Some("500usdr"));
    assert_eq!(event.get("community_pool"), Some("200usdr"));
    assert_eq!(event.get("oracle"), Some("150usdr"));
    assert_eq!(event.get("retained"), Some("150usdr"));
    assert_eq!(event.get("reverse_charge"), Some("false"));

    assert_eq!(balance(&shell, &terra_bank::ORACLE), coins("150usdr"));
    assert_eq!(balance(&shell, &terra_bank::FEE_COLLECTOR), coins("150usdr"));
    assert_eq!(
        terra_bank::read_community_pool(&shell.state).unwrap(),
        coins("200usdr")
    );
    // Burnt at the end of the block
    assert!(balance(&shell, &terra_bank::BURN).is_zero());
    assert_eq!(
        terra_bank::read_total_supply(&shell.state, "usdr").unwrap(),
        Amount::from(999_500_u64)
    );
}

/// Simulation charges nothing and reports the gas used
#[test]
fn test_simulation_does_not_change_state() {
    let (key_x, x) = signer_1();
    let mut shell =
        start_chain(config(), genesis(vec![(x, coins("1000000usdr"))]));
    shell.begin_block(BlockHeight(2)).unwrap();
    let tx = TxBuilder::new(vec![send(x, address_2(), "1000usdr")])
        .fee(Coins::new(), GAS_LIMIT)
        .signer(key_x, 0, 0)
        .build_unsigned()
        .to_bytes();

    let result = shell.simulate(&tx);
    assert_ok(&result);
    assert!(result.gas_used > 0);
    assert!(tax_event(&result).is_some());
    assert_eq!(balance(&shell, &x), coins("1000000usdr"));
    assert!(balance(&shell, &address_2()).is_zero());
}
