//! Builder for constructing a [`DustAggregator`] from configuration.
//!
//! Price tables, signing accounts and submission backends are created through
//! factory functions keyed by implementation name, so the binary decides which
//! implementations are available.

use crate::engine::{event_bus::EventBus, DustAggregator};
use crate::handlers::Invoker;
use crate::orchestrator::BatchOrchestrator;
use dust_account::{AccountError, AccountInterface, AccountService, SignerRegistry};
use dust_config::Config;
use dust_contract::InvocationEncoder;
use dust_delivery::{DeliveryError, SubmissionInterface, SubmissionService};
use dust_price::{BalanceNormalizer, PriceError, PriceTableInterface};
use dust_types::{truncate_id, NetworkConfig, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while wiring an aggregator.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for each pluggable component, keyed by implementation
/// name.
pub struct AggregatorFactories<PF, AF, DF> {
	pub price_factories: HashMap<String, PF>,
	pub account_factories: HashMap<String, AF>,
	pub delivery_factories: HashMap<String, DF>,
}

pub struct AggregatorBuilder {
	config: Config,
}

impl AggregatorBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates every configured component and wires them into an aggregator.
	///
	/// Fails before any network call when an implementation is unknown or its
	/// config is invalid, when the settlement account has no signer, or when
	/// a configured settlement-chain address is malformed.
	pub fn build<PF, AF, DF>(
		self,
		factories: AggregatorFactories<PF, AF, DF>,
	) -> Result<DustAggregator, BuilderError>
	where
		PF: Fn(&toml::Value) -> Result<Box<dyn PriceTableInterface>, PriceError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		DF: Fn(&toml::Value, &NetworkConfig) -> Result<Box<dyn SubmissionInterface>, DeliveryError>,
	{
		let config = &self.config;

		// Price tables
		let mut price_impls = HashMap::new();
		for (name, impl_config) in &config.prices.implementations {
			if let Some(factory) = factories.price_factories.get(name) {
				match factory(impl_config) {
					Ok(implementation) => {
						implementation
							.config_schema()
							.validate(impl_config)
							.map_err(|e| invalid_config("prices", "price table", name, e))?;
						let is_primary = &config.prices.primary == name;
						tracing::info!(component = "prices", implementation = %name, version = %implementation.version(), enabled = %is_primary, "Loaded");
						price_impls.insert(name.clone(), implementation);
					},
					Err(e) => {
						tracing::error!(
							component = "prices",
							implementation = %name,
							error = %e,
							"Failed to create price table"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create price table '{}': {}",
							name, e
						)));
					},
				}
			}
		}
		let price_table: Arc<dyn PriceTableInterface> = price_impls
			.remove(&config.prices.primary)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"Primary price table '{}' is not available",
					config.prices.primary
				))
			})?
			.into();

		// Signing accounts, one per chain
		let mut signers = HashMap::new();
		for (chain, account) in &config.accounts {
			let factory = factories
				.account_factories
				.get(&account.implementation)
				.ok_or_else(|| {
					BuilderError::Config(format!(
						"Unknown account implementation '{}' for chain '{}'",
						account.implementation, chain
					))
				})?;
			let implementation = factory(&account.config).map_err(|e| {
				tracing::error!(
					component = "account",
					chain = %chain,
					error = %e,
					"Failed to create account"
				);
				BuilderError::Config(format!("Failed to create account for '{}': {}", chain, e))
			})?;
			implementation
				.config_schema()
				.validate(&account.config)
				.map_err(|e| invalid_config("account", "account", chain, e))?;
			let service = Arc::new(AccountService::new(implementation));
			tracing::info!(component = "account", chain = %chain, implementation = %account.implementation, address = %truncate_id(&service.address()), "Loaded");
			signers.insert(chain.clone(), service);
		}
		let signers = SignerRegistry::new(signers, config.settlement.account.clone())
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		// Submission backends
		let mut delivery_impls = HashMap::new();
		for (name, impl_config) in &config.delivery.implementations {
			if let Some(factory) = factories.delivery_factories.get(name) {
				match factory(impl_config, &config.network) {
					Ok(implementation) => {
						implementation
							.config_schema()
							.validate(impl_config)
							.map_err(|e| invalid_config("delivery", "submission backend", name, e))?;
						let is_primary = &config.delivery.primary == name;
						tracing::info!(component = "delivery", implementation = %name, enabled = %is_primary, "Loaded");
						delivery_impls.insert(name.clone(), implementation);
					},
					Err(e) => {
						tracing::error!(
							component = "delivery",
							implementation = %name,
							error = %e,
							"Failed to create submission backend"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create submission backend '{}': {}",
							name, e
						)));
					},
				}
			}
		}
		let backend = delivery_impls
			.remove(&config.delivery.primary)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"Primary submission backend '{}' is not available",
					config.delivery.primary
				))
			})?;

		let encoder = InvocationEncoder::new(config.network.clone())
			.map_err(|e| BuilderError::Config(format!("Invalid contract address: {}", e)))?;
		encoder
			.check_address(&config.settlement.base_asset)
			.map_err(|e| BuilderError::Config(format!("Invalid settlement base asset: {}", e)))?;
		for (symbol, address) in &config.settlement.swap_targets {
			encoder.check_address(address).map_err(|e| {
				BuilderError::Config(format!("Invalid swap target '{}': {}", symbol, e))
			})?;
		}

		let event_bus = EventBus::new(config.aggregator.event_capacity);
		let submission = Arc::new(SubmissionService::new(backend, config.network.clone()));
		let invoker = Arc::new(Invoker::new(Arc::new(encoder), submission));
		let orchestrator = Arc::new(BatchOrchestrator::new(
			invoker.clone(),
			signers.clone(),
			config.settlement.policy,
			event_bus.clone(),
		));

		tracing::info!(
			aggregator_id = %config.aggregator.id,
			contract = %truncate_id(&config.network.contract_address),
			chains = ?signers.chains(),
			policy = ?config.settlement.policy,
			"Aggregator ready"
		);

		Ok(DustAggregator::new(
			BalanceNormalizer::new(price_table),
			orchestrator,
			invoker,
			signers,
			self.config.settlement,
			event_bus,
		))
	}
}

fn invalid_config(
	component: &str,
	kind: &str,
	name: &str,
	error: ValidationError,
) -> BuilderError {
	tracing::error!(
		component = %component,
		implementation = %name,
		error = %error,
		"Invalid configuration"
	);
	BuilderError::Config(format!(
		"Invalid configuration for {} '{}': {}",
		kind, name, error
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use dust_account::AccountFactory;
	use dust_config::ConfigBuilder;
	use dust_delivery::DeliveryFactory;
	use dust_price::implementations::static_table::StaticPriceTable;
	use dust_price::{AssetPrice, PriceTableFactory};
	use dust_types::{ConfigSchema, Field, FieldType, Schema};
	use dust_types::{RawBalance, SettlementPolicy};
	use rust_decimal::Decimal;
	use std::str::FromStr;

	const SETTLEMENT_SEED: &str = "SADQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQP54X";
	const USDC: &str = "CACQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQLC2U";

	fn to_map<F>(pairs: Vec<(&'static str, F)>) -> HashMap<String, F> {
		pairs
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect()
	}

	fn factories() -> AggregatorFactories<PriceTableFactory, AccountFactory, DeliveryFactory> {
		AggregatorFactories {
			price_factories: to_map(dust_price::get_all_implementations()),
			account_factories: to_map(dust_account::get_all_implementations()),
			delivery_factories: to_map(dust_delivery::get_all_implementations()),
		}
	}

	/// Demo prices behind a schema that requires a `feed` entry, built by a
	/// factory that accepts any table.
	struct FeedPriceTable(StaticPriceTable);

	struct FeedSchema;

	impl ConfigSchema for FeedSchema {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::new(vec![Field::new("feed", FieldType::String)], vec![]).validate(config)
		}
	}

	impl PriceTableInterface for FeedPriceTable {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(FeedSchema)
		}

		fn version(&self) -> &str {
			self.0.version()
		}

		fn lookup(&self, chain: &str, asset: &str) -> Option<&AssetPrice> {
			self.0.lookup(chain, asset)
		}

		fn assets(&self) -> Vec<&AssetPrice> {
			self.0.assets()
		}
	}

	fn feed_price_table(_config: &toml::Value) -> Result<Box<dyn PriceTableInterface>, PriceError> {
		Ok(Box::new(FeedPriceTable(StaticPriceTable::demo())))
	}

	fn config() -> ConfigBuilder {
		ConfigBuilder::new()
			.local_account("stellar", SETTLEMENT_SEED)
			.static_prices(toml::Value::Table(toml::Table::new()))
			.delivery("rpc", toml::Value::Table(toml::Table::new()))
			.swap_target("USDC", USDC)
	}

	#[test]
	fn test_build_from_config() {
		let config = config().policy(SettlementPolicy::RequireDeposit).build();
		let aggregator = AggregatorBuilder::new(config).build(factories()).unwrap();

		assert_eq!(aggregator.fees().fixed_fee, Decimal::from(22));
		assert_eq!(
			aggregator.orchestrator().policy(),
			SettlementPolicy::RequireDeposit
		);

		let items = aggregator
			.normalize(&[RawBalance {
				chain_id: "ethereum".to_string(),
				asset_id: "ETH".to_string(),
				raw_amount: "0.00021".to_string(),
				owner_address: "0xabc".to_string(),
			}])
			.unwrap();
		assert_eq!(items[0].implied_value, Decimal::from_str("0.42").unwrap());
	}

	#[test]
	fn test_unknown_account_implementation() {
		let mut config = config().build();
		if let Some(account) = config.accounts.get_mut("stellar") {
			account.implementation = "hsm".to_string();
		}

		let err = AggregatorBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("Unknown account implementation 'hsm'"));
	}

	#[test]
	fn test_settlement_account_needs_signer() {
		let config = config().settlement_account("solana").build();
		let err = AggregatorBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::Config(_)));
	}

	#[test]
	fn test_missing_primary_price_table() {
		let mut factories = factories();
		factories.price_factories.clear();

		let err = AggregatorBuilder::new(config().build())
			.build(factories)
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(_)));
	}

	#[test]
	fn test_invalid_swap_target_fails_fast() {
		let config = config().swap_target("DOGE", "0xdoge").build();
		let err = AggregatorBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("Invalid swap target 'DOGE'"));
	}

	#[test]
	fn test_invalid_contract_address_fails_fast() {
		let mut network = config().build().network;
		network.contract_address = "CNOTACONTRACT".to_string();
		let config = config().network(network).build();

		let err = AggregatorBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("Invalid contract address"));
	}

	#[test]
	fn test_invalid_price_config_is_reported() {
		let table: toml::Value = toml::from_str(
			r#"
			[[assets]]
			chain = "ethereum"
			asset = "ETH"
			multiplier = "-1"
			"#,
		)
		.unwrap();
		let config = config().static_prices(table).build();

		let err = AggregatorBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("Failed to create price table 'static'"));
	}

	#[test]
	fn test_price_table_schema_is_checked() {
		let mut factories = factories();
		factories
			.price_factories
			.insert("static".to_string(), feed_price_table as PriceTableFactory);

		let err = AggregatorBuilder::new(config().build())
			.build(factories)
			.err()
			.unwrap();
		assert_eq!(
			err.to_string(),
			"Configuration error: Invalid configuration for price table 'static': Missing required field: feed"
		);
	}

	#[test]
	fn test_price_table_schema_accepts_valid_config() {
		let mut factories = factories();
		factories
			.price_factories
			.insert("static".to_string(), feed_price_table as PriceTableFactory);
		let mut table = toml::Table::new();
		table.insert("feed".to_string(), toml::Value::String("demo".to_string()));
		let config = config().static_prices(toml::Value::Table(table)).build();

		assert!(AggregatorBuilder::new(config).build(factories).is_ok());
	}
}
