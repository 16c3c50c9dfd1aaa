//! Invocation encoder.
//!
//! Turns typed [`OperationArgs`] into the position-encoded parameter list the
//! aggregator contract expects. Parameter order per operation:
//!
//! | operation     | parameters |
//! |---------------|------------|
//! | `deposit`     | contract, `auto_deposit`, owner, chain, asset, amount |
//! | `settle`      | contract, `batch_process` |
//! | `withdraw`    | contract, `withdraw`, owner, chain, asset |
//! | `swap`        | contract, `swap`, owner, chain, from asset, to asset, amount or void |
//! | `get_balance` | contract, `get_balance`, owner, chain, asset |

use crate::address::{scheme_for, AddressScheme};
use dust_types::{ContractValue, InvocationError, NetworkConfig, OperationArgs, OperationKind, OperationRequest};

/// Longest symbol the contract accepts.
pub const MAX_SYMBOL_LEN: usize = 32;

/// Whether `symbol` is 1 to 32 characters of `[A-Za-z0-9_]`.
pub fn is_valid_symbol(symbol: &str) -> bool {
	!symbol.is_empty()
		&& symbol.len() <= MAX_SYMBOL_LEN
		&& symbol
			.bytes()
			.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

pub struct InvocationEncoder {
	network: NetworkConfig,
	scheme: Box<dyn AddressScheme>,
}

impl InvocationEncoder {
	/// Builds an encoder for `network`, rejecting an invalid contract address.
	pub fn new(network: NetworkConfig) -> Result<Self, InvocationError> {
		let scheme = scheme_for(network.address_scheme);
		scheme
			.validate(&network.contract_address)
			.map_err(|e| InvocationError::Encoding(format!("Invalid contract address: {}", e)))?;
		Ok(Self { network, scheme })
	}

	/// Validates an address against the settlement address scheme.
	pub fn check_address(&self, address: &str) -> Result<(), InvocationError> {
		self.scheme.validate(address).map_err(InvocationError::Encoding)
	}

	/// Encodes `args` for the operation named `operation`.
	///
	/// Accepts either the short name (`deposit`) or the contract function name
	/// (`auto_deposit`). Fails when the name is unknown or does not match the
	/// argument variant.
	pub fn encode(
		&self,
		operation: &str,
		args: &OperationArgs,
	) -> Result<OperationRequest, InvocationError> {
		let kind: OperationKind = operation.parse().map_err(InvocationError::Encoding)?;
		if kind != args.kind() {
			return Err(InvocationError::Encoding(format!(
				"Arguments for {} do not match operation {}",
				args.kind(),
				kind
			)));
		}
		self.encode_args(args)
	}

	/// Encodes `args` for the operation they belong to.
	pub fn encode_args(&self, args: &OperationArgs) -> Result<OperationRequest, InvocationError> {
		let kind = args.kind();
		let mut parameters = vec![
			ContractValue::Address(self.network.contract_address.clone()),
			ContractValue::Symbol(kind.function_name().to_string()),
		];

		match args {
			OperationArgs::Deposit {
				owner,
				chain,
				asset,
				amount,
			} => {
				parameters.push(self.address(owner)?);
				parameters.push(symbol(chain)?);
				parameters.push(self.address(asset)?);
				parameters.push(ContractValue::U64(*amount));
			},
			OperationArgs::Settle => {},
			OperationArgs::Withdraw {
				owner,
				chain,
				asset,
			}
			| OperationArgs::GetBalance {
				owner,
				chain,
				asset,
			} => {
				parameters.push(self.address(owner)?);
				parameters.push(symbol(chain)?);
				parameters.push(self.address(asset)?);
			},
			OperationArgs::Swap {
				owner,
				from_chain,
				from_asset,
				to_asset,
				amount,
			} => {
				parameters.push(self.address(owner)?);
				parameters.push(symbol(from_chain)?);
				parameters.push(self.address(from_asset)?);
				parameters.push(self.address(to_asset)?);
				parameters.push(amount.map_or(ContractValue::Void, ContractValue::U64));
			},
		}

		let request = OperationRequest {
			operation: kind,
			contract_address: self.network.contract_address.clone(),
			network_id: self.network.network_passphrase.clone(),
			parameters,
			fee: self.network.fee,
			timeout_seconds: self.network.timeout_seconds,
		};
		request.validate().map_err(InvocationError::Encoding)?;

		tracing::trace!(operation = %kind, params = request.parameters.len(), "Encoded request");
		Ok(request)
	}

	fn address(&self, value: &str) -> Result<ContractValue, InvocationError> {
		self.check_address(value)?;
		Ok(ContractValue::Address(value.to_string()))
	}
}

fn symbol(value: &str) -> Result<ContractValue, InvocationError> {
	if !is_valid_symbol(value) {
		return Err(InvocationError::Encoding(format!(
			"'{}' is not a valid contract symbol",
			value
		)));
	}
	Ok(ContractValue::Symbol(value.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use dust_types::{networks::AddressSchemeKind, ParamType};

	const CONTRACT: &str = "CAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC526";
	const OWNER: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";
	const ETH_REF: &str = "CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ";
	const USDC_REF: &str = "CACQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQLC2U";

	fn network() -> NetworkConfig {
		NetworkConfig {
			contract_address: CONTRACT.to_string(),
			network_passphrase: "Test SDF Network ; September 2015".to_string(),
			rpc_url: "http://localhost:8000".to_string(),
			address_scheme: AddressSchemeKind::Stellar,
			fee: 100,
			timeout_seconds: 30,
			poll_interval_ms: 1000,
		}
	}

	fn encoder() -> InvocationEncoder {
		InvocationEncoder::new(network()).unwrap()
	}

	fn deposit(amount: u64) -> OperationArgs {
		OperationArgs::Deposit {
			owner: OWNER.to_string(),
			chain: "ethereum".to_string(),
			asset: ETH_REF.to_string(),
			amount,
		}
	}

	#[test]
	fn test_deposit_parameter_order() {
		let request = encoder().encode("deposit", &deposit(42)).unwrap();
		assert_eq!(
			request.parameters,
			vec![
				ContractValue::Address(CONTRACT.to_string()),
				ContractValue::Symbol("auto_deposit".to_string()),
				ContractValue::Address(OWNER.to_string()),
				ContractValue::Symbol("ethereum".to_string()),
				ContractValue::Address(ETH_REF.to_string()),
				ContractValue::U64(42),
			]
		);
		assert_eq!(request.fee, 100);
		assert_eq!(request.timeout_seconds, 30);
		assert_eq!(request.network_id, "Test SDF Network ; September 2015");
	}

	#[test]
	fn test_deposit_order_holds_for_any_amount() {
		let encoder = encoder();
		for amount in [0, 1, 13, 54, u64::MAX] {
			let request = encoder.encode("auto_deposit", &deposit(amount)).unwrap();
			let types: Vec<ParamType> =
				request.parameters.iter().map(|p| p.param_type()).collect();
			assert_eq!(types, OperationKind::Deposit.signature());
			assert_eq!(request.parameters[5], ContractValue::U64(amount));
		}
	}

	#[test]
	fn test_settle_has_no_extra_parameters() {
		let request = encoder().encode("settle", &OperationArgs::Settle).unwrap();
		assert_eq!(
			request.parameters,
			vec![
				ContractValue::Address(CONTRACT.to_string()),
				ContractValue::Symbol("batch_process".to_string()),
			]
		);
		let json = serde_json::to_string(&request).unwrap();
		let decoded: OperationRequest = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded.parameters.len(), 2);
	}

	#[test]
	fn test_swap_with_and_without_amount() {
		let encoder = encoder();
		let swap = |amount| OperationArgs::Swap {
			owner: OWNER.to_string(),
			from_chain: "stellar".to_string(),
			from_asset: ETH_REF.to_string(),
			to_asset: USDC_REF.to_string(),
			amount,
		};
		let with_amount = encoder.encode("swap", &swap(Some(109))).unwrap();
		assert_eq!(with_amount.parameters.len(), 7);
		assert_eq!(with_amount.parameters[5], ContractValue::Address(USDC_REF.to_string()));
		assert_eq!(with_amount.parameters[6], ContractValue::U64(109));

		let all = encoder.encode("swap", &swap(None)).unwrap();
		assert_eq!(all.parameters[6], ContractValue::Void);
	}

	#[test]
	fn test_withdraw_and_balance_share_layout() {
		let encoder = encoder();
		let withdraw = encoder
			.encode(
				"withdraw",
				&OperationArgs::Withdraw {
					owner: OWNER.to_string(),
					chain: "ethereum".to_string(),
					asset: ETH_REF.to_string(),
				},
			)
			.unwrap();
		let balance = encoder
			.encode(
				"get_balance",
				&OperationArgs::GetBalance {
					owner: OWNER.to_string(),
					chain: "ethereum".to_string(),
					asset: ETH_REF.to_string(),
				},
			)
			.unwrap();
		assert_eq!(withdraw.parameters[2..], balance.parameters[2..]);
		assert_eq!(
			balance.parameters[1],
			ContractValue::Symbol("get_balance".to_string())
		);
	}

	#[test]
	fn test_encoding_errors() {
		let encoder = encoder();
		assert!(matches!(
			encoder.encode("transfer", &OperationArgs::Settle),
			Err(InvocationError::Encoding(_))
		));
		assert!(matches!(
			encoder.encode("settle", &deposit(1)),
			Err(InvocationError::Encoding(_))
		));

		let bad_asset = OperationArgs::Deposit {
			owner: OWNER.to_string(),
			chain: "ethereum".to_string(),
			asset: "ETH".to_string(),
			amount: 1,
		};
		assert!(matches!(
			encoder.encode("deposit", &bad_asset),
			Err(InvocationError::Encoding(_))
		));

		let bad_chain = OperationArgs::Deposit {
			owner: OWNER.to_string(),
			chain: "bnb-chain".to_string(),
			asset: ETH_REF.to_string(),
			amount: 1,
		};
		assert!(encoder.encode("deposit", &bad_chain).is_err());
	}

	#[test]
	fn test_invalid_contract_rejected_at_construction() {
		let mut config = network();
		config.contract_address = "not-a-contract".to_string();
		assert!(InvocationEncoder::new(config).is_err());

		let mut evm = network();
		evm.address_scheme = AddressSchemeKind::Evm;
		assert!(InvocationEncoder::new(evm.clone()).is_err());
		evm.contract_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string();
		assert!(InvocationEncoder::new(evm).is_ok());
	}

	#[test]
	fn test_symbol_rules() {
		assert!(is_valid_symbol("ethereum"));
		assert!(is_valid_symbol("batch_process"));
		assert!(is_valid_symbol(&"a".repeat(32)));
		assert!(!is_valid_symbol(&"a".repeat(33)));
		assert!(!is_valid_symbol(""));
		assert!(!is_valid_symbol("bnb chain"));
	}
}
