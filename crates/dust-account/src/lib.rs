//! Signing accounts for the dust aggregator.
//!
//! Every chain whose dust is deposited needs an account able to sign
//! submissions on the settlement network. Accounts are built once at startup
//! and collected into a [`SignerRegistry`], which is handed to the
//! orchestrator explicitly rather than discovered at run time.

use async_trait::async_trait;
use dust_types::{truncate_id, ConfigSchema, ImplementationRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// A credential able to sign submissions for one account.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Schema of this implementation's config table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address of the account on the settlement network.
	fn address(&self) -> String;

	/// Hex-encoded public key.
	fn public_key(&self) -> String;

	/// Signs `message`. Implementations backed by a wallet may suspend while
	/// the user approves.
	async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AccountError>;
}

pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// All registered account implementations as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Wraps an account implementation.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	pub fn address(&self) -> String {
		self.implementation.address()
	}

	pub fn public_key(&self) -> String {
		self.implementation.public_key()
	}

	pub async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AccountError> {
		self.implementation.sign(message).await
	}
}

/// Signing capabilities available to the aggregator, keyed by chain.
///
/// One entry is designated the settlement account; it submits settlement,
/// swaps and withdrawals.
#[derive(Clone)]
pub struct SignerRegistry {
	signers: HashMap<String, Arc<AccountService>>,
	settlement: Arc<AccountService>,
}

impl SignerRegistry {
	/// Fails if `settlement_chain` has no signer.
	pub fn new(
		signers: HashMap<String, Arc<AccountService>>,
		settlement_chain: impl Into<String>,
	) -> Result<Self, AccountError> {
		let settlement_chain: String = settlement_chain.into();
		let settlement = signers.get(&settlement_chain).cloned().ok_or_else(|| {
			AccountError::Implementation(format!(
				"Settlement account '{}' has no registered signer",
				settlement_chain
			))
		})?;
		for (chain, signer) in &signers {
			tracing::debug!(
				chain = %chain,
				account = %truncate_id(&signer.address()),
				"Registered signer"
			);
		}
		Ok(Self {
			signers,
			settlement,
		})
	}

	/// Signer for items discovered on `chain`, if one was configured.
	pub fn signer_for(&self, chain: &str) -> Option<Arc<AccountService>> {
		self.signers.get(chain).cloned()
	}

	pub fn settlement_signer(&self) -> Arc<AccountService> {
		self.settlement.clone()
	}

	/// Chains with a registered signer, sorted.
	pub fn chains(&self) -> Vec<&str> {
		let mut chains: Vec<&str> = self.signers.keys().map(String::as_str).collect();
		chains.sort_unstable();
		chains
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn mock_service(address: &'static str) -> Arc<AccountService> {
		let mut mock = MockAccountInterface::new();
		mock.expect_address().return_const(address.to_string());
		mock.expect_sign().returning(|message| Ok(message.to_vec()));
		Arc::new(AccountService::new(Box::new(mock)))
	}

	#[test]
	fn test_registry_requires_settlement_signer() {
		let mut signers = HashMap::new();
		signers.insert("ethereum".to_string(), mock_service("GETH"));
		assert!(SignerRegistry::new(signers, "stellar").is_err());
	}

	#[tokio::test]
	async fn test_registry_lookup() {
		let mut signers = HashMap::new();
		signers.insert("stellar".to_string(), mock_service("GSETTLE"));
		signers.insert("ethereum".to_string(), mock_service("GETH"));
		let registry = SignerRegistry::new(signers, "stellar").unwrap();

		assert_eq!(registry.settlement_signer().address(), "GSETTLE");
		assert_eq!(registry.signer_for("ethereum").unwrap().address(), "GETH");
		assert!(registry.signer_for("solana").is_none());
		assert_eq!(registry.chains(), vec!["ethereum", "stellar"]);

		let signature = registry.settlement_signer().sign(b"abc").await.unwrap();
		assert_eq!(signature, b"abc".to_vec());
	}
}
