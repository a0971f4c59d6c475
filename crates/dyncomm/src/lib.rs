//! Dynamic minimum commission. Every block, each bonded validator's
//! minimum commission is recomputed from its share of the bonded voting
//! power; a validator may not set its commission below it.

#![warn(missing_docs)]

use terra_core::address::Address;
use terra_core::dec::Dec;
use terra_core::storage::Key;
use terra_core::uint::Uint;
use terra_parameters::{DyncommParams, StakingParams};
use terra_storage::{self as storage, StorageRead, StorageWrite};
use terra_tx::msg::Msg;
use thiserror::Error;

const DYNCOMM_SEG: &str = "dyncomm";
const MIN_COMMISSION_SEG: &str = "min_commission";

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] storage::Error),
    #[error("Parameters error: {0}")]
    ParametersError(#[from] terra_parameters::Error),
    #[error("Staking error: {0}")]
    StakingError(#[from] terra_staking::Error),
    #[error("{0}")]
    TxError(#[from] terra_tx::Error),
    #[error("commission for {validator} must be at least {min_rate}")]
    CommissionTooLow { validator: Address, min_rate: Dec },
    #[error("Arithmetic overflow in dynamic commission")]
    Overflow,
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Obtain the storage key of a validator's minimum commission
pub fn min_commission_key(validator: &Address) -> Key {
    Key::from_seg(&DYNCOMM_SEG)
        .push(&MIN_COMMISSION_SEG)
        .push(validator)
}

/// The minimum commission of a validator holding `power` out of
/// `total_power`:
///
/// ```text
/// x = 100 * power / total_power
/// y = (x - max_zero) * (x / slope_vp_impact + slope_base)
/// rate = max(min(y, 100 * cap), 100 * min_commission) / 100
/// ```
pub fn calculate_dyn_commission(
    params: &DyncommParams,
    min_commission: Dec,
    power: Uint,
    total_power: Uint,
) -> Result<Dec> {
    let x = if total_power.is_zero() {
        Dec::zero()
    } else {
        let percent = power
            .checked_mul(Uint::from(100u64))
            .ok_or(Error::Overflow)?;
        Dec::from_ratio(percent, total_power).ok_or(Error::Overflow)?
    };
    let hundred = Dec::hundred();
    let y = x
        .checked_div(params.slope_vp_impact)
        .and_then(|slope| slope.checked_add(params.slope_base))
        .and_then(|slope| x.checked_sub(params.max_zero)?.checked_mul(slope))
        .ok_or(Error::Overflow)?;
    let upper = hundred.checked_mul(params.cap).ok_or(Error::Overflow)?;
    let lower = hundred
        .checked_mul(min_commission)
        .ok_or(Error::Overflow)?;
    y.min(upper)
        .max(lower)
        .checked_div(hundred)
        .ok_or(Error::Overflow)
}

/// Read a validator's stored minimum commission
pub fn read_min_commission<S>(
    storage: &S,
    validator: &Address,
) -> Result<Option<Dec>>
where
    S: StorageRead + ?Sized,
{
    Ok(storage.read(&min_commission_key(validator))?)
}

/// Recompute and store the minimum commission of every bonded validator,
/// raising commissions below it
pub fn update_all_bonded<S>(storage: &mut S) -> Result<()>
where
    S: StorageRead + StorageWrite,
{
    let params: DyncommParams = terra_parameters::read(storage)?;
    let staking: StakingParams = terra_parameters::read(storage)?;
    let total_power = terra_staking::total_bonded_power(storage)?;
    for validator in terra_staking::bonded_validators(storage)? {
        let rate = calculate_dyn_commission(
            &params,
            staking.min_commission_rate,
            Uint::from_u64(validator.power),
            total_power,
        )?;
        storage.write(&min_commission_key(&validator.operator), rate)?;
        if terra_staking::raise_commission_to(
            storage,
            &validator.operator,
            rate,
        )? {
            tracing::info!(
                validator = %validator.operator,
                %rate,
                "Raised validator commission to the dynamic minimum"
            );
        }
    }
    Ok(())
}

/// The minimum commission a validator may currently set. Falls back to
/// computing it from the current voting power before the first update.
pub fn target_commission<S>(storage: &S, validator: &Address) -> Result<Dec>
where
    S: StorageRead,
{
    if let Some(rate) = read_min_commission(storage, validator)? {
        return Ok(rate);
    }
    let params: DyncommParams = terra_parameters::read(storage)?;
    let staking: StakingParams = terra_parameters::read(storage)?;
    let power = terra_staking::read_validator(storage, validator)?
        .filter(|v| v.is_bonded())
        .map(|v| v.power)
        .unwrap_or_default();
    calculate_dyn_commission(
        &params,
        staking.min_commission_rate,
        Uint::from_u64(power),
        terra_staking::total_bonded_power(storage)?,
    )
}

/// Reject edit validator messages, including those wrapped in authz exec,
/// that set a commission below the validator's minimum
pub fn check_edit_validator<S>(storage: &S, msgs: &[Msg]) -> Result<()>
where
    S: StorageRead,
{
    terra_tx::visit_msgs(msgs, &mut |msg: &Msg| -> Result<()> {
        if let Msg::EditValidator {
            validator,
            commission_rate: Some(commission_rate),
        } = msg
        {
            let min_rate = target_commission(storage, validator)?;
            if *commission_rate < min_rate {
                return Err(Error::CommissionTooLow {
                    validator: *validator,
                    min_rate,
                });
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod test_dyncomm {
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use terra_core::address::testing::*;
    use terra_core::dec::testing::dec;
    use terra_parameters::Parameters;
    use terra_staking::testing::bonded_validator;
    use terra_storage::MockStore;

    use super::*;

    fn params() -> DyncommParams {
        DyncommParams {
            max_zero: Dec::zero(),
            slope_base: Dec::one(),
            slope_vp_impact: Dec::hundred(),
            cap: dec("0.5"),
        }
    }

    fn init_storage() -> MockStore {
        let mut storage = MockStore::default();
        let parameters = Parameters {
            dyncomm: params(),
            ..Parameters::default()
        };
        terra_parameters::init_storage(&parameters, &mut storage).unwrap();
        for (operator, power) in [(address_1(), 18), (address_2(), 82)] {
            let validator = bonded_validator(operator, power, dec("0.05"));
            terra_staking::write_validator(&mut storage, &validator).unwrap();
        }
        storage
    }

    #[test]
    fn test_dyn_commission_of_18_percent() {
        let rate = calculate_dyn_commission(
            &params(),
            dec("0.05"),
            Uint::from(18u64),
            Uint::from(100u64),
        )
        .unwrap();
        assert_eq!(rate, dec("0.2124"));
    }

    #[test]
    fn test_dyn_commission_clamps() {
        // the largest validator hits the cap
        let rate = calculate_dyn_commission(
            &params(),
            dec("0.05"),
            Uint::from(82u64),
            Uint::from(100u64),
        )
        .unwrap();
        assert_eq!(rate, dec("0.5"));
        // a tiny validator gets the staking minimum
        let rate = calculate_dyn_commission(
            &params(),
            dec("0.05"),
            Uint::from(1u64),
            Uint::from(100u64),
        )
        .unwrap();
        assert_eq!(rate, dec("0.05"));
        let rate = calculate_dyn_commission(
            &params(),
            dec("0.05"),
            Uint::zero(),
            Uint::zero(),
        )
        .unwrap();
        assert_eq!(rate, dec("0.05"));
    }

    #[test]
    fn test_update_raises_commissions() {
        let mut storage = init_storage();
        update_all_bonded(&mut storage).unwrap();
        assert_eq!(
            read_min_commission(&storage, &address_1()).unwrap(),
            Some(dec("0.2124"))
        );
        let validator = terra_staking::read_validator(&storage, &address_2())
            .unwrap()
            .unwrap();
        assert_eq!(validator.commission_rate, dec("0.5"));
    }

    #[test]
    fn test_edit_validator_check() {
        let storage = init_storage();
        let edit = |rate: &str| Msg::EditValidator {
            validator: address_1(),
            commission_rate: Some(dec(rate)),
        };
        assert_matches!(
            check_edit_validator(&storage, &[edit("0.20")]),
            Err(Error::CommissionTooLow { .. })
        );
        check_edit_validator(&storage, &[edit("0.23")]).unwrap();
        let unchanged = Msg::EditValidator {
            validator: address_1(),
            commission_rate: None,
        };
        check_edit_validator(&storage, &[unchanged]).unwrap();
        let wrapped = Msg::Exec {
            grantee: address_3(),
            msgs: vec![edit("0.1")],
        };
        let err = check_edit_validator(&storage, &[wrapped]).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "commission for {} must be at least 0.212400000000000000",
                address_1()
            )
        );
    }

    proptest! {
        /// The minimum commission stays within the staking minimum and the
        /// cap
        #[test]
        fn test_dyn_commission_bounds(
            power in 0u64..1_000_000,
            others in 0u64..1_000_000,
            min in 0u32..50,
        ) {
            let min_commission = Dec::new(i128::from(min), 2).unwrap();
            let rate = calculate_dyn_commission(
                &params(),
                min_commission,
                Uint::from(power),
                Uint::from(power + others),
            )
            .unwrap();
            prop_assert!(rate >= min_commission);
            prop_assert!(rate <= params().cap);
        }
    }
}
