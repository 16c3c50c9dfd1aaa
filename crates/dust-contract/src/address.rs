//! Address validation for the settlement chain.

use alloy_primitives::Address;
use dust_types::AddressSchemeKind;
use std::str::FromStr;
use stellar_strkey::Strkey;

/// Decides whether a string is a valid address on the settlement chain.
pub trait AddressScheme: Send + Sync {
	fn kind(&self) -> AddressSchemeKind;

	fn validate(&self, address: &str) -> Result<(), String>;
}

/// Strkey addresses: accounts (`G...`), muxed accounts (`M...`) and contracts
/// (`C...`). Secret seeds and other strkey types are rejected.
pub struct StellarAddressScheme;

impl AddressScheme for StellarAddressScheme {
	fn kind(&self) -> AddressSchemeKind {
		AddressSchemeKind::Stellar
	}

	fn validate(&self, address: &str) -> Result<(), String> {
		match Strkey::from_string(address) {
			Ok(Strkey::PublicKeyEd25519(_))
			| Ok(Strkey::MuxedAccountEd25519(_))
			| Ok(Strkey::Contract(_)) => Ok(()),
			Ok(_) => Err(format!("'{}' is not an account or contract address", address)),
			Err(_) => Err(format!("'{}' is not a valid strkey", address)),
		}
	}
}

/// 20-byte hex addresses, with or without a `0x` prefix.
pub struct EvmAddressScheme;

impl AddressScheme for EvmAddressScheme {
	fn kind(&self) -> AddressSchemeKind {
		AddressSchemeKind::Evm
	}

	fn validate(&self, address: &str) -> Result<(), String> {
		Address::from_str(address)
			.map(|_| ())
			.map_err(|e| format!("'{}' is not a valid EVM address: {}", address, e))
	}
}

pub fn scheme_for(kind: AddressSchemeKind) -> Box<dyn AddressScheme> {
	match kind {
		AddressSchemeKind::Stellar => Box::new(StellarAddressScheme),
		AddressSchemeKind::Evm => Box::new(EvmAddressScheme),
	}
}
