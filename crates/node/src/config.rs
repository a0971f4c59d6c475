//! Node configuration

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use terra_ante::AnteConfig;
use terra_core::chain::{ChainId, MAINNET_CHAIN_ID};
use terra_taxexemption::CrossZoneRule;
use thiserror::Error;

/// Node configuration file, nested in the base dir
pub const FILENAME: &str = "config.toml";
/// Prefix of the environment variables overriding the config file, e.g.
/// `TERRA__MEMPOOL__MAX_TX`
pub const ENV_PREFIX: &str = "TERRA";
/// Chain id of a fresh local network
pub const DEFAULT_CHAIN_ID: &str = "localterra";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub chain_id: ChainId,
    pub mempool: Mempool,
    pub ibc_spam: IbcSpam,
    pub wasm: Wasm,
    pub tax_exemption: TaxExemption,
    pub forks: Forks,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mempool {
    /// Maximum number of pooled txs. 0 for unbounded, negative to disable
    /// the pool.
    pub max_tx: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcSpam {
    /// Longest accepted IBC transfer memo, in bytes
    pub max_memo_length: u64,
    /// Longest accepted IBC transfer receiver, in bytes
    pub max_receiver_length: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wasm {
    /// Gas cap of simulations. Unset to simulate with the tx's own limit.
    pub simulation_gas_limit: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxExemption {
    /// How sends between members of two different zones are taxed
    pub cross_zone_rule: CrossZoneRule,
}

/// The one-off state changes of the main chain, each run in the begin
/// block of its height
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forks {
    /// The forks only run on this chain
    pub chain_id: ChainId,
    /// Swaps are disabled and the IBC channels closed
    pub swap_disable_height: u64,
    /// The IBC channels are reopened
    pub swap_enable_height: u64,
    /// The module version map is seeded for software upgrades
    pub version_map_enable_height: u64,
    /// IBC transfer channels closed while swaps are disabled
    pub channels: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: ChainId::from(DEFAULT_CHAIN_ID),
            mempool: Mempool::default(),
            ibc_spam: IbcSpam::default(),
            wasm: Wasm::default(),
            tax_exemption: TaxExemption::default(),
            forks: Forks::default(),
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self { max_tx: 5000 }
    }
}

impl Default for IbcSpam {
    fn default() -> Self {
        let ante = AnteConfig::default();
        Self {
            max_memo_length: ante.max_memo_length,
            max_receiver_length: ante.max_receiver_length,
        }
    }
}

impl Default for Forks {
    fn default() -> Self {
        Self {
            chain_id: ChainId::from(MAINNET_CHAIN_ID),
            swap_disable_height: 7_607_790,
            swap_enable_height: 7_800_000,
            version_map_enable_height: 11_543_150,
            channels: vec![
                "channel-1".to_string(),
                "channel-49".to_string(),
                "channel-20".to_string(),
            ],
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error while reading config: {0}")]
    ReadError(config::ConfigError),
    #[error("Error while deserializing config: {0}")]
    DeserializationError(config::ConfigError),
    #[error("Error while serializing to toml: {0}")]
    TomlError(toml::ser::Error),
    #[error("Error while writing config: {0}")]
    WriteError(std::io::Error),
    #[error("A config file already exists in {0}")]
    AlreadyExistingConfig(PathBuf),
    #[error("The config path {0} is not valid UTF-8")]
    NonUtf8Path(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Config {
    /// Load the config from the base dir, with overrides from the
    /// environment. Without a config file, the defaults are used.
    pub fn read(base_dir: impl AsRef<Path>) -> Result<Self> {
        let file_path = Self::file_path(base_dir);
        if !file_path.exists() {
            tracing::debug!(
                path = %file_path.to_string_lossy(),
                "No config file found, using the defaults"
            );
            return Ok(Self::default());
        }
        let file_name = file_path
            .to_str()
            .ok_or_else(|| Error::NonUtf8Path(file_path.clone()))?;
        let defaults = config::Config::try_from(&Self::default())
            .map_err(Error::ReadError)?;
        let builder = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(file_name))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX).separator("__"),
            );

        let config = builder.build().map_err(Error::ReadError)?;
        config
            .try_deserialize()
            .map_err(Error::DeserializationError)
    }

    /// Write the config into the base dir. Fails when a config file
    /// exists and `replace` is not set.
    pub fn write(
        &self,
        base_dir: impl AsRef<Path>,
        replace: bool,
    ) -> Result<()> {
        let file_path = Self::file_path(base_dir);
        if let Some(file_dir) = file_path.parent() {
            create_dir_all(file_dir).map_err(Error::WriteError)?;
        }
        if file_path.exists() && !replace {
            Err(Error::AlreadyExistingConfig(file_path))
        } else {
            let mut file =
                File::create(file_path).map_err(Error::WriteError)?;
            let toml = toml::ser::to_string(&self).map_err(Error::TomlError)?;
            file.write_all(toml.as_bytes()).map_err(Error::WriteError)
        }
    }

    /// Get the file path to the config
    pub fn file_path(base_dir: impl AsRef<Path>) -> PathBuf {
        base_dir.as_ref().join(FILENAME)
    }

    /// The settings of the admission pipeline
    pub fn ante_config(&self) -> AnteConfig {
        AnteConfig {
            max_memo_length: self.ibc_spam.max_memo_length,
            max_receiver_length: self.ibc_spam.max_receiver_length,
            simulation_gas_limit: self.wasm.simulation_gas_limit,
            cross_zone_rule: self.tax_exemption.cross_zone_rule,
        }
    }
}

#[cfg(test)]
mod test_config {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_missing_file_reads_defaults() {
        let base_dir = tempfile::tempdir().unwrap();
        let config = Config::read(base_dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ante_config(), AnteConfig::default());
    }

    #[test]
    fn test_write_and_read() {
        let base_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.chain_id = ChainId::from("rebel-2");
        config.mempool.max_tx = 10;
        config.wasm.simulation_gas_limit = Some(3_000_000);
        config.tax_exemption.cross_zone_rule = CrossZoneRule::Never;
        config.forks.channels = vec!["channel-7".to_string()];
        config.write(base_dir.path(), false).unwrap();

        assert_eq!(Config::read(base_dir.path()).unwrap(), config);
        assert_matches!(
            config.write(base_dir.path(), false),
            Err(Error::AlreadyExistingConfig(_))
        );
        config.write(base_dir.path(), true).unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let base_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            Config::file_path(base_dir.path()),
            "[ibc_spam]\nmax_memo_length = 256\n",
        )
        .unwrap();
        let config = Config::read(base_dir.path()).unwrap();
        assert_eq!(config.ibc_spam.max_memo_length, 256);
        assert_eq!(config.ibc_spam.max_receiver_length, 128);
        assert_eq!(config.forks, Forks::default());
    }

    #[test]
    fn test_malformed_file() {
        let base_dir = tempfile::tempdir().unwrap();
        let file_path = Config::file_path(base_dir.path());

        std::fs::write(&file_path, "[mempool\nmax_tx = ").unwrap();
        assert_matches!(
            Config::read(base_dir.path()),
            Err(Error::ReadError(_))
        );

        std::fs::write(&file_path, "[mempool]\nmax_tx = \"many\"\n").unwrap();
        assert_matches!(
            Config::read(base_dir.path()),
            Err(Error::DeserializationError(_))
        );
    }
}
