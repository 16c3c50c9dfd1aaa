//! Local ed25519 signer.
//!
//! Holds the signing key in memory. The `secret` config field accepts a
//! Stellar secret seed (`S...`) or a 32-byte hex seed with or without a `0x`
//! prefix. The account address is the strkey of the public key unless an
//! explicit `address` is configured.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use async_trait::async_trait;
use dust_types::{
	without_0x_prefix, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	SecretString, ValidationError,
};
use ed25519_dalek::{Signer, SigningKey};

/// Parses a seed into raw key bytes.
fn parse_seed(secret: &SecretString) -> Result<[u8; 32], AccountError> {
	secret.with_exposed(|seed| {
		let seed = seed.trim();
		if seed.starts_with('S') {
			return stellar_strkey::ed25519::PrivateKey::from_string(seed)
				.map(|key| key.0)
				.map_err(|_| AccountError::InvalidKey("Malformed secret seed".to_string()));
		}
		let bytes = hex::decode(without_0x_prefix(seed))
			.map_err(|_| AccountError::InvalidKey("Seed is neither strkey nor hex".to_string()))?;
		bytes.try_into().map_err(|bytes: Vec<u8>| {
			AccountError::InvalidKey(format!("Seed must be 32 bytes, got {}", bytes.len()))
		})
	})
}

pub struct LocalAccountSchema;

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("secret", FieldType::String).with_validator(|value| {
				let seed = SecretString::from(value.as_str().unwrap_or_default());
				parse_seed(&seed).map(|_| ()).map_err(|e| e.to_string())
			})],
			vec![Field::new("address", FieldType::String)],
		);
		schema.validate(config)
	}
}

pub struct LocalAccount {
	signing_key: SigningKey,
	address: String,
}

impl LocalAccount {
	pub fn new(secret: &SecretString, address: Option<String>) -> Result<Self, AccountError> {
		let signing_key = SigningKey::from_bytes(&parse_seed(secret)?);
		let address = address.unwrap_or_else(|| {
			stellar_strkey::ed25519::PublicKey(signing_key.verifying_key().to_bytes()).to_string()
		});
		Ok(Self {
			signing_key,
			address,
		})
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAccountSchema)
	}

	fn address(&self) -> String {
		self.address.clone()
	}

	fn public_key(&self) -> String {
		hex::encode(self.signing_key.verifying_key().to_bytes())
	}

	async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AccountError> {
		Ok(self.signing_key.sign(message).to_bytes().to_vec())
	}
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}

/// Builds a [`LocalAccount`] from its config table.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid local account config: {}", e)))?;

	let secret = config
		.get("secret")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("secret is required".to_string()))?;
	let address = config
		.get("address")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	Ok(Box::new(LocalAccount::new(&secret, address)?))
}
