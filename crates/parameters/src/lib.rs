//! Protocol parameters. Every module's parameters are stored as a single
//! Borsh encoded value under `params/<module>` and are written at chain
//! initialization.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use terra_core::coin::{Amount, Coins};
use terra_core::dec::Dec;
use terra_core::storage::Key;
use terra_storage::{StorageRead, StorageWrite};
use terra_tx::msg::type_url;
use thiserror::Error;

/// The bond denomination of the native chain token
pub const BOND_DENOM: &str = "uluna";

const PARAMS_SEG: &str = "params";

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] terra_storage::Error),
    #[error("Parameters of module {0} are missing, they must be always set")]
    ParametersMissing(&'static str),
    #[error("Invalid parameter {0}: {1}")]
    InvalidParameter(&'static str, String),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// A module's parameter set
pub trait ModuleParams: BorshSerialize + BorshDeserialize {
    /// Name of the owning module, used as the storage key segment
    const MODULE: &'static str;

    /// Stateless sanity checks
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Storage key of a module's parameters
pub fn params_key(module: &str) -> Key {
    Key::from_seg(&PARAMS_SEG).push(&module)
}

/// Read a module's parameters
pub fn read<P, S>(storage: &S) -> Result<P>
where
    P: ModuleParams,
    S: StorageRead + ?Sized,
{
    storage
        .read(&params_key(P::MODULE))?
        .ok_or(Error::ParametersMissing(P::MODULE))
}

/// Validate and write a module's parameters
pub fn write<P, S>(storage: &mut S, params: &P) -> Result<()>
where
    P: ModuleParams,
    S: StorageWrite + ?Sized,
{
    params.validate()?;
    storage.write(&params_key(P::MODULE), params)?;
    Ok(())
}

fn check_rate(name: &'static str, rate: &Dec) -> Result<()> {
    if rate.is_negative() || *rate > Dec::one() {
        return Err(Error::InvalidParameter(
            name,
            format!("rate must be between 0 and 1, got {rate}"),
        ));
    }
    Ok(())
}

fn dec(mantissa: i128, scale: u8) -> Dec {
    Dec::new(mantissa, scale).expect("Parameter literals are in range")
}

/// Auth module parameters
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct AuthParams {
    /// Longest memo accepted, in characters
    pub max_memo_characters: u64,
    /// Most signatures a tx may carry
    pub tx_sig_limit: u64,
    /// Gas charged per encoded tx byte
    pub tx_size_cost_per_byte: u64,
    /// Gas charged per ed25519 signature
    pub sig_verify_cost_ed25519: u64,
    /// Gas charged per secp256k1 signature
    pub sig_verify_cost_secp256k1: u64,
    /// Type urls of tx extension options that are accepted
    pub allowed_extension_options: Vec<String>,
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            max_memo_characters: 256,
            tx_sig_limit: 7,
            tx_size_cost_per_byte: 10,
            sig_verify_cost_ed25519: 590,
            sig_verify_cost_secp256k1: 1000,
            allowed_extension_options: vec![],
        }
    }
}

impl ModuleParams for AuthParams {
    const MODULE: &'static str = "auth";

    fn validate(&self) -> Result<()> {
        if self.tx_sig_limit == 0 {
            return Err(Error::InvalidParameter(
                "tx_sig_limit",
                "must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Tax module parameters
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct TaxParams {
    /// Rate of the burn tax levied on taxable messages
    pub burn_tax_rate: Dec,
    /// Minimum gas price per denomination
    pub gas_prices: BTreeMap<String, Dec>,
    /// Type urls of the messages the burn tax applies to
    pub taxable_msg_types: Vec<String>,
}

impl Default for TaxParams {
    fn default() -> Self {
        Self {
            burn_tax_rate: dec(5, 3),
            gas_prices: BTreeMap::new(),
            taxable_msg_types: default_taxable_msg_types(),
        }
    }
}

/// The messages taxed unless governance changes the list
pub fn default_taxable_msg_types() -> Vec<String> {
    [
        type_url::MSG_SEND,
        type_url::MSG_MULTI_SEND,
        type_url::MSG_SWAP,
        type_url::MSG_SWAP_SEND,
        type_url::MSG_INSTANTIATE_CONTRACT,
        type_url::MSG_INSTANTIATE_CONTRACT2,
        type_url::MSG_EXECUTE_CONTRACT,
        type_url::MSG_DELEGATE,
        type_url::MSG_TRANSFER,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl TaxParams {
    /// Check if a message type is taxable
    pub fn is_taxable(&self, type_url: &str) -> bool {
        self.taxable_msg_types.iter().any(|url| url == type_url)
    }
}

impl ModuleParams for TaxParams {
    const MODULE: &'static str = "tax";

    fn validate(&self) -> Result<()> {
        check_rate("burn_tax_rate", &self.burn_tax_rate)?;
        match self.gas_prices.iter().find(|(_, price)| price.is_negative()) {
            Some((denom, _)) => Err(Error::InvalidParameter(
                "gas_prices",
                format!("negative gas price for {denom}"),
            )),
            None => Ok(()),
        }
    }
}

/// Treasury module parameters
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct TreasuryParams {
    /// Policy tax rate reported to clients
    pub tax_rate: Dec,
    /// Maximum tax per denomination, uncapped when a denom is absent
    pub tax_caps: BTreeMap<String, Amount>,
    /// Share of the tax that is distributed instead of burnt
    pub burn_split_rate: Dec,
    /// Share of the distributed tax that goes to the oracle reward pool
    pub oracle_split_rate: Dec,
    /// Share of the gov min deposit a proposal must carry on submission
    pub min_initial_deposit_ratio: Dec,
    /// Blocks in a treasury epoch
    pub blocks_per_epoch: u64,
}

impl Default for TreasuryParams {
    fn default() -> Self {
        Self {
            tax_rate: dec(5, 3),
            tax_caps: BTreeMap::new(),
            burn_split_rate: dec(1, 1),
            oracle_split_rate: dec(5, 1),
            min_initial_deposit_ratio: dec(1, 1),
            blocks_per_epoch: 100_800,
        }
    }
}

impl TreasuryParams {
    /// The tax cap of a denomination, if any
    pub fn tax_cap(&self, denom: &str) -> Option<Amount> {
        self.tax_caps.get(denom).copied()
    }
}

impl ModuleParams for TreasuryParams {
    const MODULE: &'static str = "treasury";

    fn validate(&self) -> Result<()> {
        check_rate("tax_rate", &self.tax_rate)?;
        check_rate("burn_split_rate", &self.burn_split_rate)?;
        check_rate("oracle_split_rate", &self.oracle_split_rate)?;
        check_rate("min_initial_deposit_ratio", &self.min_initial_deposit_ratio)
    }
}

/// Dynamic commission parameters
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct DyncommParams {
    /// Voting power share below which the dynamic floor is zero
    pub max_zero: Dec,
    /// Base slope of the floor
    pub slope_base: Dec,
    /// Voting power impact on the slope
    pub slope_vp_impact: Dec,
    /// Upper bound of the floor
    pub cap: Dec,
}

impl Default for DyncommParams {
    fn default() -> Self {
        Self {
            max_zero: dec(5, 1),
            slope_base: dec(2, 0),
            slope_vp_impact: dec(10, 0),
            cap: dec(2, 1),
        }
    }
}

impl ModuleParams for DyncommParams {
    const MODULE: &'static str = "dyncomm";

    fn validate(&self) -> Result<()> {
        check_rate("cap", &self.cap)?;
        if self.slope_vp_impact.is_zero() {
            return Err(Error::InvalidParameter(
                "slope_vp_impact",
                "must not be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Governance parameters read by the admission pipeline
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct GovParams {
    /// Deposit a proposal needs to enter voting
    pub min_deposit: Coins,
}

impl Default for GovParams {
    fn default() -> Self {
        Self {
            min_deposit: Coins::single(BOND_DENOM, 10_000_000u64),
        }
    }
}

impl ModuleParams for GovParams {
    const MODULE: &'static str = "gov";
}

/// Distribution parameters read by the tax split
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct DistributionParams {
    /// Share of distributed rewards funded to the community pool
    pub community_tax: Dec,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            community_tax: Dec::zero(),
        }
    }
}

impl ModuleParams for DistributionParams {
    const MODULE: &'static str = "distribution";

    fn validate(&self) -> Result<()> {
        check_rate("community_tax", &self.community_tax)
    }
}

/// Market parameters touched by the chain fork hooks
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct MarketParams {
    /// Minimum spread charged on swaps, one disables swapping
    pub min_stability_spread: Dec,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            min_stability_spread: dec(5, 3),
        }
    }
}

impl ModuleParams for MarketParams {
    const MODULE: &'static str = "market";

    fn validate(&self) -> Result<()> {
        check_rate("min_stability_spread", &self.min_stability_spread)
    }
}

/// Staking parameters read by the admission pipeline and dyncomm
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct StakingParams {
    /// Denomination bonded by delegators
    pub bond_denom: String,
    /// Chain wide minimum validator commission
    pub min_commission_rate: Dec,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            bond_denom: BOND_DENOM.to_string(),
            min_commission_rate: dec(5, 2),
        }
    }
}

impl ModuleParams for StakingParams {
    const MODULE: &'static str = "staking";

    fn validate(&self) -> Result<()> {
        check_rate("min_commission_rate", &self.min_commission_rate)
    }
}

/// All the parameters written at chain initialization
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    #[allow(missing_docs)]
    pub auth: AuthParams,
    #[allow(missing_docs)]
    pub tax: TaxParams,
    #[allow(missing_docs)]
    pub treasury: TreasuryParams,
    #[allow(missing_docs)]
    pub dyncomm: DyncommParams,
    #[allow(missing_docs)]
    pub gov: GovParams,
    #[allow(missing_docs)]
    pub distribution: DistributionParams,
    #[allow(missing_docs)]
    pub market: MarketParams,
    #[allow(missing_docs)]
    pub staking: StakingParams,
}

/// Initialize parameters in storage in the genesis block.
pub fn init_storage<S>(parameters: &Parameters, storage: &mut S) -> Result<()>
where
    S: StorageWrite + ?Sized,
{
    let Parameters {
        auth,
        tax,
        treasury,
        dyncomm,
        gov,
        distribution,
        market,
        staking,
    } = parameters;
    write(storage, auth)?;
    write(storage, tax)?;
    write(storage, treasury)?;
    write(storage, dyncomm)?;
    write(storage, gov)?;
    write(storage, distribution)?;
    write(storage, market)?;
    write(storage, staking)?;
    Ok(())
}

/// Read all the parameters from storage
pub fn read_all<S>(storage: &S) -> Result<Parameters>
where
    S: StorageRead + ?Sized,
{
    Ok(Parameters {
        auth: read(storage)?,
        tax: read(storage)?,
        treasury: read(storage)?,
        dyncomm: read(storage)?,
        gov: read(storage)?,
        distribution: read(storage)?,
        market: read(storage)?,
        staking: read(storage)?,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use terra_core::dec::testing::dec as d;
    use terra_storage::MockStore;

    use super::*;

    #[test]
    fn test_init_and_read_parameters() {
        let mut storage = MockStore::default();
        assert_matches!(
            read::<TaxParams, _>(&storage),
            Err(Error::ParametersMissing("tax"))
        );
        let params = Parameters::default();
        init_storage(&params, &mut storage).unwrap();
        assert_eq!(read_all(&storage).unwrap(), params);
        assert_eq!(
            read::<TaxParams, _>(&storage).unwrap().burn_tax_rate,
            d("0.005")
        );
    }

    #[test]
    fn test_rates_are_validated() {
        let mut storage = MockStore::default();
        let treasury = TreasuryParams {
            burn_split_rate: d("1.1"),
            ..Default::default()
        };
        assert_matches!(
            write(&mut storage, &treasury),
            Err(Error::InvalidParameter("burn_split_rate", _))
        );
        assert!(!storage.has_key(&params_key("treasury")).unwrap());
    }

    #[test]
    fn test_default_taxable_types() {
        let tax = TaxParams::default();
        assert!(tax.is_taxable(type_url::MSG_SEND));
        assert!(!tax.is_taxable(type_url::MSG_EDIT_VALIDATOR));
        assert!(!tax.is_taxable(type_url::MSG_AGGREGATE_EXCHANGE_RATE_VOTE));
    }
}
