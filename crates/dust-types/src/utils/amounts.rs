//! Amount scaling between USD values, minor units and chain base units.
//!
//! USD values travel to the contract as integer cents. Scaling rounds half
//! away from zero so that `from_minor_units(to_minor_units(v)?)` is always
//! within 0.005 of `v`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Minor units per whole USD.
const MINOR_UNITS_PER_UNIT: u32 = 100;

/// Largest base-unit exponent a [`Decimal`] can represent.
pub const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
	#[error("Amount {0} is negative")]
	Negative(Decimal),
	#[error("Amount {0} does not fit in u64 minor units")]
	Overflow(Decimal),
	#[error("Unsupported decimals: {0}")]
	Decimals(u32),
}

/// Converts a USD value to integer minor units: `round(value × 100)`.
pub fn to_minor_units(value: Decimal) -> Result<u64, AmountError> {
	if value.is_sign_negative() && !value.is_zero() {
		return Err(AmountError::Negative(value));
	}
	value
		.checked_mul(Decimal::from(MINOR_UNITS_PER_UNIT))
		.map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
		.and_then(|scaled| scaled.to_u64())
		.ok_or(AmountError::Overflow(value))
}

/// Converts integer minor units back to a USD value.
pub fn from_minor_units(minor: u64) -> Decimal {
	Decimal::from(minor) / Decimal::from(MINOR_UNITS_PER_UNIT)
}

/// Scales a base-unit amount (wei, lamports, stroops) to whole units.
///
/// The shift is exact: the decimal point moves `decimals` places left.
pub fn scale_base_units(amount: Decimal, decimals: u32) -> Result<Decimal, AmountError> {
	if decimals == 0 {
		return Ok(amount);
	}
	let total_scale = amount.scale() + decimals;
	if total_scale > MAX_DECIMALS {
		return Err(AmountError::Decimals(decimals));
	}
	let mut scaled = amount;
	scaled
		.set_scale(total_scale)
		.map_err(|_| AmountError::Decimals(decimals))?;
	Ok(scaled.normalize())
}
