#![allow(clippy::assign_op_pattern)]
#![allow(missing_docs)]
//! An unsigned 256 integer type. Used as the backing type of coin amounts
//! and of intermediate products in fixed point arithmetic.

use borsh::{BorshDeserialize, BorshSerialize};
use uint::construct_uint;

construct_uint! {
    /// Native type for unsigned 256 bit integers.
    #[derive(
        BorshSerialize,
        BorshDeserialize,
    )]

    pub struct Uint(4);
}

/// The value zero.
pub const ZERO: Uint = Uint::from_u64(0);

/// The value one.
pub const ONE: Uint = Uint::from_u64(1);

impl Uint {
    /// Convert a [`u64`] to a [`Uint`].
    pub const fn from_u64(x: u64) -> Uint {
        Uint([x.to_le(), 0, 0, 0])
    }

    /// Convert to [`u128`] if the value fits.
    pub fn to_u128(&self) -> Option<u128> {
        (self.bits() <= 128).then(|| self.low_u128())
    }

    /// Convert to [`i64`], saturating at [`i64::MAX`].
    pub fn saturating_to_i64(&self) -> i64 {
        if self.bits() < 64 {
            self.low_u64() as i64
        } else {
            i64::MAX
        }
    }
}
