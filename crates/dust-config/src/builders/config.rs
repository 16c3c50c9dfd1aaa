//! Fluent construction of [`Config`] values for tests and demos.

use crate::{
	AccountConfig, AggregatorConfig, Config, DeliveryConfig, PriceConfig, SettlementConfig,
};
use dust_types::{networks::AddressSchemeKind, NetworkConfig, SettlementPolicy};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Builds a [`Config`] with defaults suitable for tests.
///
/// The result is not validated; tests that need validation should go through
/// `Config::from_str`.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	aggregator_id: String,
	event_capacity: usize,
	network: NetworkConfig,
	accounts: HashMap<String, AccountConfig>,
	prices: PriceConfig,
	delivery: DeliveryConfig,
	settlement: SettlementConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			aggregator_id: "test-aggregator".to_string(),
			event_capacity: 64,
			network: NetworkConfig {
				contract_address: "CAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC526"
					.to_string(),
				network_passphrase: "Test SDF Network ; September 2015".to_string(),
				rpc_url: "http://localhost:8000/rpc".to_string(),
				address_scheme: AddressSchemeKind::Stellar,
				fee: 100,
				timeout_seconds: 30,
				poll_interval_ms: 1000,
			},
			accounts: HashMap::new(),
			prices: PriceConfig {
				primary: "static".to_string(),
				implementations: HashMap::new(),
			},
			delivery: DeliveryConfig {
				primary: "rpc".to_string(),
				implementations: HashMap::new(),
			},
			settlement: SettlementConfig {
				account: "stellar".to_string(),
				chain: "stellar".to_string(),
				base_asset: "CACAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAINCW".to_string(),
				policy: SettlementPolicy::Always,
				fixed_fee: Decimal::from(22),
				per_item_fee: Decimal::new(5, 3),
				batch_fee: Decimal::new(75, 4),
				swap_targets: HashMap::new(),
			},
		}
	}

	pub fn aggregator_id(mut self, id: impl Into<String>) -> Self {
		self.aggregator_id = id.into();
		self
	}

	pub fn network(mut self, network: NetworkConfig) -> Self {
		self.network = network;
		self
	}

	pub fn timeout_seconds(mut self, seconds: u64) -> Self {
		self.network.timeout_seconds = seconds;
		self
	}

	/// Registers a `local` account for `chain` with the given secret seed.
	pub fn local_account(mut self, chain: impl Into<String>, secret: &str) -> Self {
		let mut config = toml::Table::new();
		config.insert("secret".to_string(), toml::Value::String(secret.to_string()));
		self.accounts.insert(
			chain.into(),
			AccountConfig {
				implementation: "local".to_string(),
				config: toml::Value::Table(config),
			},
		);
		self
	}

	/// Sets the table of the `static` price implementation.
	pub fn static_prices(mut self, table: toml::Value) -> Self {
		self.prices.primary = "static".to_string();
		self.prices
			.implementations
			.insert("static".to_string(), table);
		self
	}

	pub fn delivery(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		let primary = primary.into();
		self.delivery
			.implementations
			.insert(primary.clone(), config);
		self.delivery.primary = primary;
		self
	}

	pub fn settlement_account(mut self, chain: impl Into<String>) -> Self {
		self.settlement.account = chain.into();
		self
	}

	pub fn policy(mut self, policy: SettlementPolicy) -> Self {
		self.settlement.policy = policy;
		self
	}

	pub fn swap_target(mut self, symbol: impl Into<String>, address: impl Into<String>) -> Self {
		self.settlement
			.swap_targets
			.insert(symbol.into(), address.into());
		self
	}

	pub fn build(self) -> Config {
		Config {
			aggregator: AggregatorConfig {
				id: self.aggregator_id,
				event_capacity: self.event_capacity,
			},
			network: self.network,
			accounts: self.accounts,
			prices: self.prices,
			delivery: self.delivery,
			settlement: self.settlement,
		}
	}
}
