//! Price table built from configured multipliers.
//!
//! Without an `assets` list the table falls back to the demo multipliers:
//! ETH 2000, SOL 180, MATIC 1 and XLM 0.1 USD per unit.

use crate::{
	AssetPrice, PriceError, PriceTableFactory, PriceTableInterface, PriceTableRegistry,
};
use dust_types::{
	utils::amounts::MAX_DECIMALS, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	ValidationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;

const DEMO_VERSION: &str = "demo-1";

#[derive(Debug, Deserialize)]
struct StaticPriceConfig {
	#[serde(default)]
	version: Option<String>,
	#[serde(default)]
	assets: Option<Vec<AssetPrice>>,
}

pub struct StaticPriceSchema;

impl StaticPriceSchema {
	fn asset_schema() -> Schema {
		Schema::new(
			vec![
				Field::new("chain", FieldType::String),
				Field::new("asset", FieldType::String),
				Field::new("multiplier", FieldType::Decimal),
			],
			vec![
				Field::new(
					"decimals",
					FieldType::Integer {
						min: Some(0),
						max: Some(MAX_DECIMALS as i64),
					},
				),
				Field::new("contract", FieldType::String),
			],
		)
	}
}

impl ConfigSchema for StaticPriceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("version", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(v) if !v.trim().is_empty() => Ok(()),
						_ => Err("version cannot be empty".to_string()),
					}
				}),
				Field::new(
					"assets",
					FieldType::Array(Box::new(FieldType::Table(Self::asset_schema()))),
				),
			],
		);
		schema.validate(config)
	}
}

/// In-memory price table keyed by `(chain, asset)`.
pub struct StaticPriceTable {
	version: String,
	prices: BTreeMap<(String, String), AssetPrice>,
}

impl StaticPriceTable {
	/// Builds a table, rejecting negative multipliers and duplicate pairs.
	pub fn new(version: String, assets: Vec<AssetPrice>) -> Result<Self, PriceError> {
		let mut prices = BTreeMap::new();
		for price in assets {
			if price.multiplier.is_sign_negative() && !price.multiplier.is_zero() {
				return Err(PriceError::Configuration(format!(
					"Negative multiplier for {} on {}",
					price.asset, price.chain
				)));
			}
			if price.decimals > MAX_DECIMALS {
				return Err(PriceError::Configuration(format!(
					"Unsupported decimals {} for {} on {}",
					price.decimals, price.asset, price.chain
				)));
			}
			let key = (price.chain.clone(), price.asset.clone());
			if prices.insert(key, price).is_some() {
				return Err(PriceError::Configuration(
					"Duplicate asset entry in price table".to_string(),
				));
			}
		}
		Ok(Self { version, prices })
	}

	/// The demo table with whole-unit readings.
	pub fn demo() -> Self {
		let entry = |chain: &str, asset: &str, multiplier: Decimal| AssetPrice {
			chain: chain.to_string(),
			asset: asset.to_string(),
			multiplier,
			decimals: 0,
			contract: None,
		};
		let assets = vec![
			entry("ethereum", "ETH", Decimal::from(2000)),
			entry("solana", "SOL", Decimal::from(180)),
			entry("polygon", "MATIC", Decimal::ONE),
			entry("stellar", "XLM", Decimal::new(1, 1)),
		];
		Self {
			version: DEMO_VERSION.to_string(),
			prices: assets
				.into_iter()
				.map(|p| ((p.chain.clone(), p.asset.clone()), p))
				.collect(),
		}
	}
}

impl PriceTableInterface for StaticPriceTable {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StaticPriceSchema)
	}

	fn version(&self) -> &str {
		&self.version
	}

	fn lookup(&self, chain: &str, asset: &str) -> Option<&AssetPrice> {
		self.prices.get(&(chain.to_string(), asset.to_string()))
	}

	fn assets(&self) -> Vec<&AssetPrice> {
		self.prices.values().collect()
	}
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "static";
	type Factory = PriceTableFactory;

	fn factory() -> Self::Factory {
		create_price_table
	}
}

impl PriceTableRegistry for Registry {}

/// Builds a [`StaticPriceTable`] from its config table.
pub fn create_price_table(
	config: &toml::Value,
) -> Result<Box<dyn PriceTableInterface>, PriceError> {
	StaticPriceSchema
		.validate(config)
		.map_err(|e| PriceError::Configuration(format!("Invalid static price config: {}", e)))?;

	let parsed: StaticPriceConfig = config
		.clone()
		.try_into()
		.map_err(|e| PriceError::Configuration(format!("Invalid static price config: {}", e)))?;

	let table = match parsed.assets {
		Some(assets) => StaticPriceTable::new(
			parsed.version.unwrap_or_else(|| "static-1".to_string()),
			assets,
		)?,
		None => {
			let mut demo = StaticPriceTable::demo();
			if let Some(version) = parsed.version {
				demo.version = version;
			}
			demo
		},
	};

	tracing::debug!(
		version = %table.version,
		assets = table.prices.len(),
		"Built static price table"
	);
	Ok(Box::new(table))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_demo_defaults_when_no_assets() {
		let table = create_price_table(&toml::Value::Table(toml::Table::new())).unwrap();
		assert_eq!(table.version(), DEMO_VERSION);
		assert_eq!(table.assets().len(), 4);
		assert_eq!(
			table.lookup("stellar", "XLM").unwrap().multiplier,
			Decimal::from_str("0.1").unwrap()
		);
		assert_eq!(
			table.lookup("solana", "SOL").unwrap().multiplier,
			Decimal::from(180)
		);
	}

	#[test]
	fn test_configured_assets() {
		let config: toml::Value = toml::from_str(
			r#"
			version = "2024-06"
			[[assets]]
			chain = "ethereum"
			asset = "ETH"
			multiplier = "2500.5"
			decimals = 18
			contract = "CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ"
			[[assets]]
			chain = "polygon"
			asset = "MATIC"
			multiplier = 0.75
			"#,
		)
		.unwrap();
		let table = create_price_table(&config).unwrap();
		assert_eq!(table.version(), "2024-06");
		assert!(table.lookup("stellar", "XLM").is_none());

		let eth = table.lookup("ethereum", "ETH").unwrap();
		assert_eq!(eth.multiplier, Decimal::from_str("2500.5").unwrap());
		assert_eq!(eth.decimals, 18);
		assert!(eth.contract.is_some());

		let matic = table.lookup("polygon", "MATIC").unwrap();
		assert_eq!(matic.multiplier, Decimal::from_str("0.75").unwrap());
		assert_eq!(matic.decimals, 0);
	}

	#[test]
	fn test_negative_multiplier_rejected() {
		let config: toml::Value = toml::from_str(
			r#"
			[[assets]]
			chain = "ethereum"
			asset = "ETH"
			multiplier = "-2000"
			"#,
		)
		.unwrap();
		assert!(matches!(
			create_price_table(&config),
			Err(PriceError::Configuration(_))
		));
	}

	#[test]
	fn test_duplicate_pair_rejected() {
		let entry = AssetPrice {
			chain: "stellar".to_string(),
			asset: "XLM".to_string(),
			multiplier: Decimal::ONE,
			decimals: 0,
			contract: None,
		};
		let result = StaticPriceTable::new("v".to_string(), vec![entry.clone(), entry]);
		assert!(matches!(result, Err(PriceError::Configuration(_))));
	}

	#[test]
	fn test_missing_multiplier_rejected_by_schema() {
		let config: toml::Value = toml::from_str(
			r#"
			[[assets]]
			chain = "ethereum"
			asset = "ETH"
			"#,
		)
		.unwrap();
		let err = StaticPriceSchema.validate(&config).unwrap_err();
		assert!(err.to_string().contains("assets[0].multiplier"));
	}
}
