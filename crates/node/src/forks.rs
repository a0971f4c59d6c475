//! The one-off state changes of the main chain, scheduled at fixed heights
//! and applied at the beginning of their block

use std::collections::BTreeMap;

use terra_core::chain::{BlockHeight, ChainId};
use terra_core::dec::Dec;
use terra_core::event::Event;
use terra_ibc::{ChannelState, TRANSFER_PORT};
use terra_parameters::MarketParams;
use terra_storage::{Key, StorageRead, StorageWrite};

use crate::config;
use crate::Result;

/// Type of the event emitted when a fork is applied
pub const FORK_EVENT: &str = "fork";

/// The consensus versions of the modules, as seeded into the version map
pub const MODULE_VERSIONS: &[(&str, u64)] = &[
    ("auth", 2),
    ("authz", 1),
    ("bank", 2),
    ("distribution", 2),
    ("dyncomm", 1),
    ("feegrant", 1),
    ("gov", 2),
    ("ibc", 2),
    ("market", 1),
    ("oracle", 1),
    ("staking", 2),
    ("taxexemption", 1),
    ("transfer", 1),
    ("treasury", 1),
    ("wasm", 1),
];

/// Storage key of the module version map read by software upgrades
pub fn version_map_key() -> Key {
    Key::from_seg(&"upgrade").push(&"version_map")
}

/// Read the module version map, empty until seeded
pub fn read_version_map<S>(storage: &S) -> Result<BTreeMap<String, u64>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&version_map_key())?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForkAction {
    /// Raise the minimum stability spread to one, which disables swaps,
    /// and close the given transfer channels
    DisableSwaps { channels: Vec<String> },
    /// Reopen the given transfer channels
    EnableSwaps { channels: Vec<String> },
    /// Seed the module version map with [`MODULE_VERSIONS`]
    SeedVersionMap,
}

impl ForkAction {
    fn name(&self) -> &'static str {
        match self {
            ForkAction::DisableSwaps { .. } => "disable_swaps",
            ForkAction::EnableSwaps { .. } => "enable_swaps",
            ForkAction::SeedVersionMap => "seed_version_map",
        }
    }
}

/// A fork applied at a height of one chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledFork {
    pub height: BlockHeight,
    pub chain_id: ChainId,
    pub action: ForkAction,
}

/// The forks of the configured chain
pub fn schedule(config: &config::Forks) -> Vec<ScheduledFork> {
    let fork = |height: u64, action| ScheduledFork {
        height: BlockHeight(height),
        chain_id: config.chain_id.clone(),
        action,
    };
    vec![
        fork(
            config.swap_disable_height,
            ForkAction::DisableSwaps {
                channels: config.channels.clone(),
            },
        ),
        fork(
            config.swap_enable_height,
            ForkAction::EnableSwaps {
                channels: config.channels.clone(),
            },
        ),
        fork(config.version_map_enable_height, ForkAction::SeedVersionMap),
    ]
}

/// Apply the forks scheduled at the current height of the current chain
pub fn apply_forks<S>(
    storage: &mut S,
    forks: &[ScheduledFork],
) -> Result<Vec<Event>>
where
    S: StorageRead + StorageWrite,
{
    let height = storage.get_block_height()?;
    let chain_id = storage.get_chain_id()?;
    let mut events = vec![];
    for fork in forks
        .iter()
        .filter(|fork| fork.height == height && fork.chain_id == chain_id)
    {
        apply(storage, &fork.action)?;
        tracing::info!(
            %height,
            %chain_id,
            action = fork.action.name(),
            "Applied scheduled fork"
        );
        events.push(
            Event::new(FORK_EVENT)
                .with("action", fork.action.name())
                .with("height", height),
        );
    }
    Ok(events)
}

fn apply<S>(storage: &mut S, action: &ForkAction) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    match action {
        ForkAction::DisableSwaps { channels } => {
            let mut market: MarketParams =
                terra_parameters::read(&*storage)?;
            market.min_stability_spread = Dec::one();
            terra_parameters::write(storage, &market)?;
            terra_ibc::set_channels_state(
                storage,
                TRANSFER_PORT,
                channels,
                ChannelState::Closed,
            )?;
        }
        ForkAction::EnableSwaps { channels } => {
            terra_ibc::set_channels_state(
                storage,
                TRANSFER_PORT,
                channels,
                ChannelState::Open,
            )?;
        }
        ForkAction::SeedVersionMap => {
            let version_map: BTreeMap<String, u64> = MODULE_VERSIONS
                .iter()
                .map(|(module, version)| (module.to_string(), *version))
                .collect();
            storage.write(&version_map_key(), version_map)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test_forks {
    use pretty_assertions::assert_eq;
    use terra_core::chain::MAINNET_CHAIN_ID;
    use terra_parameters::Parameters;
    use terra_storage::MockStore;

    use super::*;

    fn mainnet_at(height: u64) -> MockStore {
        let mut storage = MockStore::new(ChainId::from(MAINNET_CHAIN_ID));
        storage.set_block_height(BlockHeight(height));
        terra_parameters::init_storage(&Parameters::default(), &mut storage)
            .unwrap();
        storage
    }

    fn channel_state(storage: &MockStore, channel: &str) -> ChannelState {
        terra_ibc::read_channel_state(storage, TRANSFER_PORT, channel)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_swap_forks() {
        let config = config::Forks::default();
        let forks = schedule(&config);

        let mut storage = mainnet_at(config.swap_disable_height);
        let events = apply_forks(&mut storage, &forks).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get("action"), Some("disable_swaps"));
        let market: MarketParams = terra_parameters::read(&storage).unwrap();
        assert_eq!(market.min_stability_spread, Dec::one());
        for channel in &config.channels {
            let state = channel_state(&storage, channel);
            assert_eq!(state, ChannelState::Closed);
        }

        storage.set_block_height(BlockHeight(config.swap_enable_height));
        apply_forks(&mut storage, &forks).unwrap();
        for channel in &config.channels {
            assert_eq!(channel_state(&storage, channel), ChannelState::Open);
        }
        let market: MarketParams = terra_parameters::read(&storage).unwrap();
        assert_eq!(market.min_stability_spread, Dec::one());
    }

    #[test]
    fn test_version_map_fork() {
        let config = config::Forks::default();
        let forks = schedule(&config);
        let mut storage = mainnet_at(config.version_map_enable_height - 1);
        apply_forks(&mut storage, &forks).unwrap();
        assert!(read_version_map(&storage).unwrap().is_empty());

        let fork_height = BlockHeight(config.version_map_enable_height);
        storage.set_block_height(fork_height);
        apply_forks(&mut storage, &forks).unwrap();
        let version_map = read_version_map(&storage).unwrap();
        assert_eq!(version_map.len(), MODULE_VERSIONS.len());
        assert_eq!(version_map.get("bank"), Some(&2));
    }

    #[test]
    fn test_forks_only_run_on_their_chain() {
        let config = config::Forks::default();
        let forks = schedule(&config);
        let mut storage = mainnet_at(config.swap_disable_height);
        storage.set_chain_id(ChainId::from("localterra"));
        assert!(apply_forks(&mut storage, &forks).unwrap().is_empty());
        let market: MarketParams = terra_parameters::read(&storage).unwrap();
        assert_eq!(market, MarketParams::default());
        assert_eq!(
            terra_ibc::read_channel_state(&storage, TRANSFER_PORT, "channel-1")
                .unwrap(),
            None
        );
    }
}
