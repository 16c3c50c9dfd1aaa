//! Settlement network configuration.
//!
//! The aggregator talks to exactly one settlement network. This module holds
//! the immutable connection settings shared by the encoder, the submission
//! backend and the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fee hint attached to every submission unless configured otherwise.
pub const DEFAULT_FEE: u32 = 100;
/// Validity window of a submission in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Address format of the settlement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressSchemeKind {
	/// Strkey accounts (`G...`), muxed accounts (`M...`) and contracts (`C...`).
	#[default]
	Stellar,
	/// 20-byte hex addresses.
	Evm,
}

impl fmt::Display for AddressSchemeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AddressSchemeKind::Stellar => f.write_str("stellar"),
			AddressSchemeKind::Evm => f.write_str("evm"),
		}
	}
}

/// Connection settings for the settlement network.
///
/// # Fields
///
/// * `contract_address` - Address of the aggregator contract
/// * `network_passphrase` - Network identifier every signature is bound to
/// * `rpc_url` - JSON-RPC endpoint of the settlement network
/// * `address_scheme` - How addresses are validated by the encoder
/// * `fee` - Fee hint attached to each submission
/// * `timeout_seconds` - Upper bound on one submit-and-resolve cycle
/// * `poll_interval_ms` - Delay between status polls of a pending submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub contract_address: String,
	pub network_passphrase: String,
	pub rpc_url: String,
	#[serde(default)]
	pub address_scheme: AddressSchemeKind,
	#[serde(default = "default_fee")]
	pub fee: u32,
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

impl NetworkConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

fn default_fee() -> u32 {
	DEFAULT_FEE
}

fn default_timeout_seconds() -> u64 {
	DEFAULT_TIMEOUT_SECONDS
}

fn default_poll_interval_ms() -> u64 {
	DEFAULT_POLL_INTERVAL_MS
}
