//! Dust balance types.
//!
//! A balance reader produces a [`RawBalance`] for every asset it finds on a
//! chain. The normalizer turns each reading into a chain-agnostic [`DustItem`]
//! carrying an imputed USD value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A balance reading as reported by a chain-specific reader.
///
/// `raw_amount` is kept as a decimal string so that no precision is lost
/// between the reader and the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBalance {
	/// Chain the balance lives on (e.g. "ethereum", "solana").
	pub chain_id: String,
	/// Asset identifier on that chain (e.g. "ETH", "XLM").
	pub asset_id: String,
	/// Balance as a decimal string.
	pub raw_amount: String,
	/// Address owning the balance.
	pub owner_address: String,
}

/// A normalized dust balance ready to be deposited.
///
/// Items are immutable once created and consumed by exactly one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DustItem {
	/// Address owning the balance.
	pub owner_address: String,
	/// Chain the balance was discovered on.
	pub source_chain: String,
	/// Asset identifier on the source chain.
	pub asset_id: String,
	/// Reference to the asset on the settlement chain.
	pub asset_ref: String,
	/// Balance in whole asset units.
	pub raw_amount: Decimal,
	/// USD value imputed from the price table. Never negative.
	pub implied_value: Decimal,
}

impl DustItem {
	/// Short label used in logs and failure reasons.
	pub fn label(&self) -> String {
		format!(
			"{}/{}@{}",
			self.source_chain,
			self.asset_id,
			crate::truncate_id(&self.owner_address)
		)
	}
}

impl fmt::Display for DustItem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (${})", self.label(), self.implied_value.round_dp(2))
	}
}

/// Sums the implied value of the given items.
pub fn total_value<'a>(items: impl IntoIterator<Item = &'a DustItem>) -> Decimal {
	items
		.into_iter()
		.fold(Decimal::ZERO, |acc, item| acc + item.implied_value)
}
