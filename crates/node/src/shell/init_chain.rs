//! Implementation of chain initialization for the Shell

use terra_core::address::Address;
use terra_core::chain::{BlockHeight, ChainId};
use terra_core::coin::Coins;
use terra_parameters::Parameters;
use terra_staking::Validator;
use terra_storage::MockStore;
use terra_taxexemption::Zone;

use super::Shell;
use crate::{Error, Result};

/// The initial state of a chain
#[derive(Clone, Debug, Default)]
pub struct Genesis {
    pub chain_id: ChainId,
    pub parameters: Parameters,
    /// Funded accounts
    pub balances: Vec<(Address, Coins)>,
    pub validators: Vec<Validator>,
    /// Tax exemption zones with their member addresses
    pub zones: Vec<(Zone, Vec<Address>)>,
}

impl Shell {
    /// Create the chain state from a genesis. The main chain is never
    /// initialized again from a genesis.
    pub fn init_chain(&mut self, genesis: Genesis) -> Result<()> {
        let Genesis {
            chain_id,
            parameters,
            balances,
            validators,
            zones,
        } = genesis;
        if chain_id.is_mainnet() {
            tracing::error!(
                %chain_id,
                "Refusing to initialize the main chain from a genesis"
            );
            return Err(Error::MainnetGenesis(chain_id));
        }
        if chain_id != self.config.chain_id {
            return Err(Error::ChainId {
                expected: self.config.chain_id.clone(),
                got: chain_id,
            });
        }

        let mut state = MockStore::new(chain_id.clone());
        state.set_block_height(BlockHeight(0));
        terra_parameters::init_storage(&parameters, &mut state)?;
        for (owner, coins) in &balances {
            terra_account::get_or_create_account(&mut state, owner)?;
            terra_bank::credit_tokens(&mut state, owner, coins)?;
        }
        for validator in &validators {
            terra_staking::write_validator(&mut state, validator)?;
        }
        for (zone, addresses) in zones {
            terra_taxexemption::add_zone(&mut state, zone, &addresses)?;
        }
        terra_dyncomm::update_all_bonded(&mut state)?;

        self.check_state = state.clone();
        self.state = state;
        tracing::info!(
            %chain_id,
            accounts = balances.len(),
            validators = validators.len(),
            "Initialized the chain from genesis"
        );
        Ok(())
    }
}

#[cfg(test)]
mod test_init_chain {
    use assert_matches::assert_matches;
    use terra_core::address::testing::*;
    use terra_core::chain::MAINNET_CHAIN_ID;
    use terra_core::coin::testing::coins;
    use terra_core::dec::testing::dec;
    use terra_staking::testing::bonded_validator;
    use terra_taxexemption::testing::zone;

    use super::*;
    use crate::config::Config;

    #[test]
    fn test_init_chain() {
        let mut shell = Shell::new(Config::default());
        let genesis = Genesis {
            chain_id: shell.chain_id().clone(),
            parameters: Parameters::default(),
            balances: vec![
                (address_1(), coins("1000uluna")),
                (address_2(), coins("5usdr")),
            ],
            validators: vec![bonded_validator(address_3(), 10, dec("0.1"))],
            zones: vec![(zone("z", false, false, false), vec![address_4()])],
        };
        shell.init_chain(genesis).unwrap();

        let account = terra_account::read_account(&shell.state, &address_2())
            .unwrap()
            .unwrap();
        assert_eq!(account.account_number, 1);
        assert_eq!(
            terra_bank::read_balances(&shell.state, &address_1()).unwrap(),
            coins("1000uluna")
        );
        assert!(
            terra_taxexemption::zone_of(&shell.state, &address_4())
                .unwrap()
                .is_some()
        );
        let min_commission =
            terra_dyncomm::read_min_commission(&shell.state, &address_3())
                .unwrap();
        assert!(min_commission.is_some());
    }

    #[test]
    fn test_init_chain_refuses_mainnet() {
        let mut config = Config::default();
        config.chain_id = ChainId::from(MAINNET_CHAIN_ID);
        let mut shell = Shell::new(config);
        let genesis = Genesis {
            chain_id: ChainId::from(MAINNET_CHAIN_ID),
            ..Default::default()
        };
        assert_matches!(
            shell.init_chain(genesis),
            Err(Error::MainnetGenesis(_))
        );
        assert!(shell.state.is_empty());
    }

    #[test]
    fn test_init_chain_id_mismatch() {
        let mut shell = Shell::new(Config::default());
        let genesis = Genesis {
            chain_id: ChainId::from("rebel-2"),
            ..Default::default()
        };
        assert_matches!(shell.init_chain(genesis), Err(Error::ChainId { .. }));
    }
}
