//! Coin balances, supply and the module accounts that fees and taxes flow
//! through.

pub mod storage_key;

use once_cell::sync::Lazy;
use terra_core::address::Address;
use terra_core::coin::{Amount, Coins};
use terra_storage::{self as storage, StorageRead, StorageWrite};
pub use storage_key::*;
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] storage::Error),
    #[error(
        "spendable balance {balance}{denom} is smaller than \
         {needed}{denom}: insufficient funds"
    )]
    InsufficientFunds {
        balance: Amount,
        needed: Amount,
        denom: String,
    },
    #[error("balance overflow of {0}")]
    Overflow(String),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Names of the module accounts
pub mod module {
    /// Collects fees and taxes until they are split
    pub const FEE_COLLECTOR: &str = "fee_collector";
    /// Sink of burnt tax
    pub const BURN: &str = "burn";
    /// Oracle reward pool
    pub const ORACLE: &str = "oracle";
    /// Distribution module, holding the community pool
    pub const DISTRIBUTION: &str = "distribution";
    /// Source of minted coins
    pub const MINT: &str = "mint";
    /// Treasury module
    pub const TREASURY: &str = "treasury";
}

/// Address of the fee collector module account
pub static FEE_COLLECTOR: Lazy<Address> =
    Lazy::new(|| Address::module(module::FEE_COLLECTOR));
/// Address of the burn module account
pub static BURN: Lazy<Address> = Lazy::new(|| Address::module(module::BURN));
/// Address of the oracle module account
pub static ORACLE: Lazy<Address> =
    Lazy::new(|| Address::module(module::ORACLE));
/// Address of the distribution module account
pub static DISTRIBUTION: Lazy<Address> =
    Lazy::new(|| Address::module(module::DISTRIBUTION));
/// Address of the mint module account
pub static MINT: Lazy<Address> = Lazy::new(|| Address::module(module::MINT));
/// Address of the treasury module account
pub static TREASURY: Lazy<Address> =
    Lazy::new(|| Address::module(module::TREASURY));

/// Check if an address is a module account that must not receive bank
/// sends
pub fn is_blocked(address: &Address) -> bool {
    [&FEE_COLLECTOR, &BURN, &ORACLE, &DISTRIBUTION, &MINT]
        .into_iter()
        .any(|blocked| **blocked == *address)
}

/// Read the balance of a given denomination and owner.
pub fn read_balance<S>(
    storage: &S,
    owner: &Address,
    denom: &str,
) -> Result<Amount>
where
    S: StorageRead + ?Sized,
{
    Ok(storage
        .read::<Amount>(&balance_key(owner, denom))?
        .unwrap_or_default())
}

/// Read all the balances of an owner.
pub fn read_balances<S>(storage: &S, owner: &Address) -> Result<Coins>
where
    S: StorageRead,
{
    let mut balances = Coins::new();
    let prefix = balance_prefix(owner);
    for item in storage::iter_prefix::<Amount>(storage, &prefix)? {
        let (key, amount) = item?;
        if let Some(denom) = key.last() {
            balances = balances
                .checked_add(&Coins::single(denom, amount))
                .ok_or_else(|| Error::Overflow(owner.to_string()))?;
        }
    }
    Ok(balances)
}

/// Read the total supply of a given denomination.
pub fn read_total_supply<S>(storage: &S, denom: &str) -> Result<Amount>
where
    S: StorageRead + ?Sized,
{
    Ok(storage
        .read::<Amount>(&supply_key(denom))?
        .unwrap_or_default())
}

/// Read the coins funded to the community pool
pub fn read_community_pool<S>(storage: &S) -> Result<Coins>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&community_pool_key())?.unwrap_or_default())
}

/// Transfer `amount` of `denom` from `src` to `dest`. Returns an `Err` if
/// `src` has insufficient balance or if the transfer to `dest` would
/// overflow.
pub fn transfer<S>(
    storage: &mut S,
    denom: &str,
    src: &Address,
    dest: &Address,
    amount: Amount,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if amount.is_zero() || src == dest {
        return Ok(());
    }
    let src_balance = read_balance(storage, src, denom)?;
    let new_src_balance =
        src_balance
            .checked_sub(amount)
            .ok_or_else(|| Error::InsufficientFunds {
                balance: src_balance,
                needed: amount,
                denom: denom.to_string(),
            })?;
    let new_dest_balance = read_balance(storage, dest, denom)?
        .checked_add(amount)
        .ok_or_else(|| Error::Overflow(dest.to_string()))?;
    storage.write(&balance_key(src, denom), new_src_balance)?;
    storage.write(&balance_key(dest, denom), new_dest_balance)?;
    Ok(())
}

/// Transfer a set of coins. Either every denomination moves or, on error,
/// the caller must discard the partial writes.
pub fn send_coins<S>(
    storage: &mut S,
    src: &Address,
    dest: &Address,
    coins: &Coins,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    for coin in coins.iter() {
        transfer(storage, &coin.denom, src, dest, coin.amount)?;
    }
    Ok(())
}

/// Move coins from a set of inputs to a set of outputs. The sums of both
/// sides must have been checked to match by the caller.
pub fn input_output_coins<S>(
    storage: &mut S,
    inputs: &[(Address, Coins)],
    outputs: &[(Address, Coins)],
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    for (owner, coins) in inputs {
        for coin in coins.iter() {
            let balance = read_balance(storage, owner, &coin.denom)?;
            let new_balance = balance.checked_sub(coin.amount).ok_or_else(
                || Error::InsufficientFunds {
                    balance,
                    needed: coin.amount,
                    denom: coin.denom.clone(),
                },
            )?;
            storage.write(&balance_key(owner, &coin.denom), new_balance)?;
        }
    }
    for (owner, coins) in outputs {
        for coin in coins.iter() {
            let new_balance = read_balance(storage, owner, &coin.denom)?
                .checked_add(coin.amount)
                .ok_or_else(|| Error::Overflow(owner.to_string()))?;
            storage.write(&balance_key(owner, &coin.denom), new_balance)?;
        }
    }
    Ok(())
}

/// Credit coins to an account, increasing the total supply. To be used
/// only by the protocol.
pub fn credit_tokens<S>(
    storage: &mut S,
    dest: &Address,
    coins: &Coins,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    for coin in coins.iter() {
        let new_balance = read_balance(storage, dest, &coin.denom)?
            .checked_add(coin.amount)
            .ok_or_else(|| Error::Overflow(dest.to_string()))?;
        let new_supply = read_total_supply(storage, &coin.denom)?
            .checked_add(coin.amount)
            .ok_or_else(|| Error::Overflow(coin.denom.clone()))?;
        storage.write(&balance_key(dest, &coin.denom), new_balance)?;
        storage.write(&supply_key(&coin.denom), new_supply)?;
    }
    Ok(())
}

/// Mint coins into the mint module account and send them to `dest`
pub fn mint_coins_to<S>(
    storage: &mut S,
    dest: &Address,
    coins: &Coins,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    credit_tokens(storage, &MINT, coins)?;
    send_coins(storage, &MINT, dest, coins)?;
    tracing::debug!(%dest, %coins, "Minted coins");
    Ok(())
}

/// Burn the whole balance of the burn module account, reducing the total
/// supply.
pub fn burn_module_balance<S>(storage: &mut S) -> Result<Coins>
where
    S: StorageRead + StorageWrite,
{
    let burnt = read_balances(storage, &BURN)?;
    for coin in burnt.iter() {
        let new_supply = read_total_supply(storage, &coin.denom)?
            .checked_sub(coin.amount)
            .ok_or(storage::Error::Inconsistent(
                "Total token supply underflowed",
            ))?;
        storage.write(&supply_key(&coin.denom), new_supply)?;
        storage.delete(&balance_key(&BURN, &coin.denom))?;
    }
    Ok(burnt)
}

/// Fund the community pool from an account
pub fn fund_community_pool<S>(
    storage: &mut S,
    src: &Address,
    coins: &Coins,
) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    if coins.is_zero() {
        return Ok(());
    }
    send_coins(storage, src, &DISTRIBUTION, coins)?;
    let pool = read_community_pool(storage)?
        .checked_add(coins)
        .ok_or_else(|| Error::Overflow("community pool".into()))?;
    storage.write(&community_pool_key(), pool)?;
    Ok(())
}
