//! Asset valuation for the dust aggregator.
//!
//! A price table maps `(chain, asset)` pairs to a USD multiplier and to the
//! asset's reference on the settlement chain. The [`BalanceNormalizer`] uses
//! the table to turn raw balance readings into [`DustItem`]s. Tables are
//! pluggable through the implementation registry; the shipped `static` table
//! is built from configured multipliers.

use dust_types::{scale_base_units, ConfigSchema, DustItem, ImplementationRegistry, RawBalance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod static_table;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
	/// No multiplier is registered for the pair. Never treated as zero.
	#[error("Unsupported asset {asset} on chain {chain}")]
	UnsupportedAsset { chain: String, asset: String },
	#[error("Invalid amount '{amount}': {reason}")]
	InvalidAmount { amount: String, reason: String },
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Valuation data for one asset on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPrice {
	pub chain: String,
	pub asset: String,
	/// USD value of one whole unit.
	pub multiplier: Decimal,
	/// Base-unit exponent of raw readings. Zero means readings are already in
	/// whole units.
	#[serde(default)]
	pub decimals: u32,
	/// Reference to the asset on the settlement chain.
	#[serde(default)]
	pub contract: Option<String>,
}

/// A versioned table of asset prices.
pub trait PriceTableInterface: Send + Sync {
	/// Schema of this implementation's config table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Identifies the table contents, so valuations can be traced to the
	/// prices that produced them.
	fn version(&self) -> &str;

	fn lookup(&self, chain: &str, asset: &str) -> Option<&AssetPrice>;

	/// Every priced asset, in a stable order.
	fn assets(&self) -> Vec<&AssetPrice>;
}

pub type PriceTableFactory = fn(&toml::Value) -> Result<Box<dyn PriceTableInterface>, PriceError>;

pub trait PriceTableRegistry: ImplementationRegistry<Factory = PriceTableFactory> {}

/// All registered price table implementations as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, PriceTableFactory)> {
	use implementations::static_table;

	vec![(static_table::Registry::NAME, static_table::Registry::factory())]
}

/// Converts raw balance readings into priced dust items.
///
/// Normalization is pure: the same reading against the same table always
/// yields the same item.
#[derive(Clone)]
pub struct BalanceNormalizer {
	table: Arc<dyn PriceTableInterface>,
}

impl BalanceNormalizer {
	pub fn new(table: Arc<dyn PriceTableInterface>) -> Self {
		Self { table }
	}

	pub fn version(&self) -> &str {
		self.table.version()
	}

	/// Prices one balance reading.
	///
	/// Fails with [`PriceError::UnsupportedAsset`] when the pair has no
	/// multiplier and with [`PriceError::InvalidAmount`] when the amount is not
	/// a non-negative decimal.
	pub fn normalize(&self, raw: &RawBalance) -> Result<DustItem, PriceError> {
		let price = self
			.table
			.lookup(&raw.chain_id, &raw.asset_id)
			.ok_or_else(|| PriceError::UnsupportedAsset {
				chain: raw.chain_id.clone(),
				asset: raw.asset_id.clone(),
			})?;

		let invalid = |reason: &str| PriceError::InvalidAmount {
			amount: raw.raw_amount.clone(),
			reason: reason.to_string(),
		};
		let amount =
			Decimal::from_str(raw.raw_amount.trim()).map_err(|_| invalid("not a decimal"))?;
		if amount.is_sign_negative() && !amount.is_zero() {
			return Err(invalid("negative"));
		}
		let amount =
			scale_base_units(amount, price.decimals).map_err(|e| invalid(&e.to_string()))?;
		let implied_value = amount
			.checked_mul(price.multiplier)
			.ok_or_else(|| invalid("value overflows"))?;

		Ok(DustItem {
			owner_address: raw.owner_address.clone(),
			source_chain: raw.chain_id.clone(),
			asset_id: raw.asset_id.clone(),
			asset_ref: price
				.contract
				.clone()
				.unwrap_or_else(|| raw.asset_id.clone()),
			raw_amount: amount,
			implied_value,
		})
	}

	/// Prices every reading, stopping at the first failure.
	pub fn normalize_all(&self, raws: &[RawBalance]) -> Result<Vec<DustItem>, PriceError> {
		let items = raws
			.iter()
			.map(|raw| self.normalize(raw))
			.collect::<Result<Vec<_>, _>>()?;
		tracing::debug!(
			count = items.len(),
			version = %self.version(),
			"Normalized balances"
		);
		Ok(items)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::static_table::StaticPriceTable;

	fn normalizer() -> BalanceNormalizer {
		BalanceNormalizer::new(Arc::new(StaticPriceTable::demo()))
	}

	fn raw(chain: &str, asset: &str, amount: &str) -> RawBalance {
		RawBalance {
			chain_id: chain.to_string(),
			asset_id: asset.to_string(),
			raw_amount: amount.to_string(),
			owner_address: "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57".to_string(),
		}
	}

	fn dec(s: &str) -> Decimal {
		Decimal::from_str(s).unwrap()
	}

	#[test]
	fn test_normalize_applies_multiplier() {
		let item = normalizer()
			.normalize(&raw("ethereum", "ETH", "0.00021"))
			.unwrap();
		assert_eq!(item.implied_value, dec("0.42"));
		assert_eq!(item.raw_amount, dec("0.00021"));
		assert_eq!(item.source_chain, "ethereum");
		assert_eq!(item.asset_ref, "ETH");
	}

	#[test]
	fn test_normalize_is_deterministic() {
		let normalizer = normalizer();
		let reading = raw("solana", "SOL", "0.003");
		let first = normalizer.normalize(&reading).unwrap();
		let second = normalizer.normalize(&reading).unwrap();
		assert_eq!(first, second);
		assert_eq!(first.implied_value, dec("0.54"));
		assert!(!first.implied_value.is_sign_negative());
	}

	#[test]
	fn test_unknown_pair_is_unsupported_not_zero() {
		let err = normalizer()
			.normalize(&raw("bitcoin", "BTC", "1"))
			.unwrap_err();
		assert_eq!(
			err,
			PriceError::UnsupportedAsset {
				chain: "bitcoin".to_string(),
				asset: "BTC".to_string()
			}
		);
		// Known chain, unknown asset.
		assert!(matches!(
			normalizer().normalize(&raw("ethereum", "SOL", "1")),
			Err(PriceError::UnsupportedAsset { .. })
		));
	}

	#[test]
	fn test_invalid_amounts() {
		let normalizer = normalizer();
		for amount in ["-1", "abc", ""] {
			assert!(
				matches!(
					normalizer.normalize(&raw("stellar", "XLM", amount)),
					Err(PriceError::InvalidAmount { .. })
				),
				"{amount}"
			);
		}
	}

	#[test]
	fn test_base_units_scaled_by_decimals() {
		let table = StaticPriceTable::new(
			"wei-1".to_string(),
			vec![AssetPrice {
				chain: "ethereum".to_string(),
				asset: "ETH".to_string(),
				multiplier: dec("2000"),
				decimals: 18,
				contract: Some("CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ".to_string()),
			}],
		)
		.unwrap();
		let normalizer = BalanceNormalizer::new(Arc::new(table));
		let item = normalizer
			.normalize(&raw("ethereum", "ETH", "210000000000000"))
			.unwrap();
		assert_eq!(item.raw_amount, dec("0.00021"));
		assert_eq!(item.implied_value, dec("0.42"));
		assert_eq!(
			item.asset_ref,
			"CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ"
		);
		assert_eq!(normalizer.version(), "wei-1");
	}

	#[test]
	fn test_normalize_all_fails_fast() {
		let normalizer = normalizer();
		let ok = normalizer
			.normalize_all(&[raw("ethereum", "ETH", "0.001"), raw("polygon", "MATIC", "3")])
			.unwrap();
		assert_eq!(ok.len(), 2);

		let err = normalizer
			.normalize_all(&[
				raw("ethereum", "ETH", "0.001"),
				raw("dogechain", "DOGE", "3"),
				raw("stellar", "XLM", "-5"),
			])
			.unwrap_err();
		assert!(matches!(err, PriceError::UnsupportedAsset { .. }));
	}
}
