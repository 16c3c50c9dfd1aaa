//! Configuration for the dust aggregator.
//!
//! Configuration is read from TOML. `${VAR}` and `${VAR:-default}` references
//! are resolved from the environment before parsing, and a file may pull in
//! other files with `include = ["prices.toml"]` as long as every top-level
//! section is defined exactly once across all files.
//!
//! A parsed [`Config`] has always passed [`Config::validate`], so components
//! built from it can assume the basic invariants hold.

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use dust_types::{NetworkConfig, SettlementPolicy};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub use builders::config::ConfigBuilder;

/// Upper bound on `network.timeout_seconds`.
const MAX_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input; keep only the message.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub aggregator: AggregatorConfig,
	/// Settlement network the contract lives on.
	pub network: NetworkConfig,
	/// Signing accounts keyed by the chain whose items they submit.
	pub accounts: HashMap<String, AccountConfig>,
	pub prices: PriceConfig,
	pub delivery: DeliveryConfig,
	pub settlement: SettlementConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
	/// Identifier of this aggregator instance, used in logs.
	pub id: String,
	/// Capacity of the event broadcast channel.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
	256
}

/// One signing account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Registered account implementation, e.g. `"local"`.
	pub implementation: String,
	/// Implementation-specific settings.
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::Table::new())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceConfig {
	/// Which price table implementation to use.
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Which submission backend to use.
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Settlement and swap settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlementConfig {
	/// Key in `[accounts]` of the account that submits settlement and swaps.
	pub account: String,
	/// Chain symbol passed to swap, withdraw and balance operations.
	pub chain: String,
	/// Asset the settled value is held in before a swap.
	pub base_asset: String,
	#[serde(default)]
	pub policy: SettlementPolicy,
	/// Fixed per-transaction fee shared across participants (USD).
	#[serde(default = "default_fixed_fee")]
	pub fixed_fee: Decimal,
	/// Fee one item would pay if submitted on its own (USD).
	#[serde(default = "default_per_item_fee")]
	pub per_item_fee: Decimal,
	/// Fee of the shared settlement (USD).
	#[serde(default = "default_batch_fee")]
	pub batch_fee: Decimal,
	/// Swap target symbols mapped to settlement-chain asset addresses.
	#[serde(default)]
	pub swap_targets: HashMap<String, String>,
}

fn default_fixed_fee() -> Decimal {
	Decimal::from(22)
}

fn default_per_item_fee() -> Decimal {
	Decimal::new(5, 3)
}

fn default_batch_fee() -> Decimal {
	Decimal::new(75, 4)
}

/// Resolves `${VAR}` and `${VAR:-default}` references in `input`.
///
/// Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Looks up a swap target by symbol.
	pub fn swap_target(&self, symbol: &str) -> Option<&str> {
		self.settlement.swap_targets.get(symbol).map(String::as_str)
	}

	/// Checks cross-section invariants that serde cannot express.
	///
	/// Address formats are checked later, when the encoder is built for the
	/// configured address scheme.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.aggregator.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Aggregator ID cannot be empty".into(),
			));
		}
		if self.aggregator.event_capacity == 0 {
			return Err(ConfigError::Validation(
				"aggregator.event_capacity must be greater than 0".into(),
			));
		}

		self.validate_network()?;

		if self.accounts.is_empty() {
			return Err(ConfigError::Validation(
				"At least one account must be configured".into(),
			));
		}
		for (chain, account) in &self.accounts {
			if account.implementation.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Account '{}' must name an implementation",
					chain
				)));
			}
		}

		validate_primary("prices", &self.prices.primary, &self.prices.implementations)?;
		validate_primary(
			"delivery",
			&self.delivery.primary,
			&self.delivery.implementations,
		)?;

		self.validate_settlement()
	}

	fn validate_network(&self) -> Result<(), ConfigError> {
		let network = &self.network;
		if network.contract_address.trim().is_empty() {
			return Err(ConfigError::Validation(
				"network.contract_address cannot be empty".into(),
			));
		}
		if network.network_passphrase.trim().is_empty() {
			return Err(ConfigError::Validation(
				"network.network_passphrase cannot be empty".into(),
			));
		}
		if network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"network.rpc_url cannot be empty".into(),
			));
		}
		if network.fee == 0 {
			return Err(ConfigError::Validation(
				"network.fee must be greater than 0".into(),
			));
		}
		if network.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"network.timeout_seconds must be greater than 0".into(),
			));
		}
		if network.timeout_seconds > MAX_TIMEOUT_SECONDS {
			return Err(ConfigError::Validation(format!(
				"network.timeout_seconds cannot exceed {}",
				MAX_TIMEOUT_SECONDS
			)));
		}
		if network.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"network.poll_interval_ms must be greater than 0".into(),
			));
		}
		Ok(())
	}

	fn validate_settlement(&self) -> Result<(), ConfigError> {
		let settlement = &self.settlement;
		if !self.accounts.contains_key(&settlement.account) {
			return Err(ConfigError::Validation(format!(
				"Settlement account '{}' not found in accounts",
				settlement.account
			)));
		}
		if settlement.chain.trim().is_empty() {
			return Err(ConfigError::Validation(
				"settlement.chain cannot be empty".into(),
			));
		}
		if settlement.base_asset.trim().is_empty() {
			return Err(ConfigError::Validation(
				"settlement.base_asset cannot be empty".into(),
			));
		}
		for (name, fee) in [
			("fixed_fee", settlement.fixed_fee),
			("per_item_fee", settlement.per_item_fee),
			("batch_fee", settlement.batch_fee),
		] {
			if fee.is_sign_negative() {
				return Err(ConfigError::Validation(format!(
					"settlement.{} cannot be negative",
					name
				)));
			}
		}
		for (symbol, address) in &settlement.swap_targets {
			if address.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Swap target '{}' has an empty address",
					symbol
				)));
			}
		}
		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} implementation '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) const VALID_CONFIG: &str = r#"
[aggregator]
id = "test-aggregator"

[network]
contract_address = "CAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC526"
network_passphrase = "Test SDF Network ; September 2015"
rpc_url = "http://localhost:8000/rpc"

[accounts.stellar]
implementation = "local"
[accounts.stellar.config]
secret = "SADQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQP54X"

[prices]
primary = "static"
[prices.implementations.static]
version = "test-1"
[[prices.implementations.static.assets]]
chain = "ethereum"
asset = "ETH"
multiplier = "2000"

[delivery]
primary = "rpc"
[delivery.implementations.rpc]

[settlement]
account = "stellar"
chain = "stellar"
base_asset = "CACAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAINCW"
[settlement.swap_targets]
USDC = "CACQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQLC2U"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("DUST_TEST_HOST", "localhost");
		std::env::set_var("DUST_TEST_PORT", "8000");

		let input = "rpc_url = \"http://${DUST_TEST_HOST}:${DUST_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_url = \"http://localhost:8000\"");

		std::env::remove_var("DUST_TEST_HOST");
		std::env::remove_var("DUST_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "secret = \"${DUST_MISSING_SECRET:-SDEFAULT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "secret = \"SDEFAULT\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("secret = \"${DUST_MISSING_VAR}\"");
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("DUST_MISSING_VAR"));
	}

	#[test]
	fn test_valid_config_defaults() {
		let config: Config = VALID_CONFIG.parse().unwrap();
		assert_eq!(config.aggregator.id, "test-aggregator");
		assert_eq!(config.aggregator.event_capacity, 256);
		assert_eq!(config.network.fee, 100);
		assert_eq!(config.network.timeout_seconds, 30);
		assert_eq!(config.settlement.policy, SettlementPolicy::Always);
		assert_eq!(config.settlement.fixed_fee, Decimal::from(22));
		assert_eq!(config.settlement.per_item_fee, Decimal::new(5, 3));
		assert_eq!(config.settlement.batch_fee, Decimal::new(75, 4));
		assert_eq!(
			config.swap_target("USDC"),
			Some("CACQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQLC2U")
		);
		assert_eq!(config.swap_target("BTC"), None);
	}

	#[test]
	fn test_settlement_account_must_exist() {
		let config_str = VALID_CONFIG.replace("account = \"stellar\"", "account = \"solana\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Settlement account 'solana' not found"));
	}

	#[test]
	fn test_timeout_bounds() {
		let config_str = VALID_CONFIG.replace(
			"rpc_url = \"http://localhost:8000/rpc\"",
			"rpc_url = \"http://localhost:8000/rpc\"\ntimeout_seconds = 301",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("cannot exceed 300"));
	}

	#[test]
	fn test_zero_fee_rejected() {
		let config_str = VALID_CONFIG.replace(
			"rpc_url = \"http://localhost:8000/rpc\"",
			"rpc_url = \"http://localhost:8000/rpc\"\nfee = 0",
		);
		assert!(Config::from_str(&config_str).is_err());
	}

	#[test]
	fn test_unknown_policy_rejected() {
		let config_str = VALID_CONFIG.replace(
			"chain = \"stellar\"\nbase_asset",
			"chain = \"stellar\"\npolicy = \"sometimes\"\nbase_asset",
		);
		assert!(matches!(
			Config::from_str(&config_str),
			Err(ConfigError::Parse(_))
		));
	}

	#[test]
	fn test_missing_primary_implementation() {
		let config_str = VALID_CONFIG.replace("primary = \"rpc\"", "primary = \"horizon\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary delivery implementation 'horizon' not found"));
	}

	#[test]
	fn test_negative_fee_rejected() {
		let config_str = VALID_CONFIG.replace(
			"base_asset = ",
			"fixed_fee = \"-1\"\nbase_asset = ",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("fixed_fee cannot be negative"));
	}
}
