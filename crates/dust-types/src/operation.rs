//! Remote operation descriptors.
//!
//! The aggregator contract exposes a fixed set of operations whose parameters
//! are position-encoded. [`OperationKind`] declares each operation's signature
//! and return type, and [`OperationArgs`] is the typed parameter schema the
//! encoder turns into an ordered [`ContractValue`] list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single position-encoded contract parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContractValue {
	/// An account or contract address on the settlement chain.
	Address(String),
	/// A short contract symbol.
	Symbol(String),
	/// An unsigned 64-bit integer.
	U64(u64),
	/// The absence of a value.
	Void,
}

impl ContractValue {
	/// Returns the parameter type of this value.
	pub fn param_type(&self) -> ParamType {
		match self {
			ContractValue::Address(_) => ParamType::Address,
			ContractValue::Symbol(_) => ParamType::Symbol,
			ContractValue::U64(_) => ParamType::U64,
			ContractValue::Void => ParamType::Void,
		}
	}
}

/// Declared type of a contract parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
	Address,
	Symbol,
	U64,
	Void,
	/// A slot accepting either a u64 or void.
	OptionalU64,
}

impl ParamType {
	/// Checks whether a value fits this slot.
	pub fn accepts(&self, value: &ContractValue) -> bool {
		match self {
			ParamType::OptionalU64 => {
				matches!(value, ContractValue::U64(_) | ContractValue::Void)
			},
			other => *other == value.param_type(),
		}
	}
}

/// Declared return type of a contract operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
	U64,
	Void,
}

impl ReturnType {
	/// The type tag the network uses for this return type.
	pub fn tag(&self) -> &'static str {
		match self {
			ReturnType::U64 => "u64",
			ReturnType::Void => "void",
		}
	}
}

/// Operations exposed by the aggregator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
	Deposit,
	Settle,
	Withdraw,
	Swap,
	GetBalance,
}

const DEPOSIT_SIGNATURE: &[ParamType] = &[
	ParamType::Address,
	ParamType::Symbol,
	ParamType::Address,
	ParamType::Symbol,
	ParamType::Address,
	ParamType::U64,
];
const SETTLE_SIGNATURE: &[ParamType] = &[ParamType::Address, ParamType::Symbol];
const WITHDRAW_SIGNATURE: &[ParamType] = &[
	ParamType::Address,
	ParamType::Symbol,
	ParamType::Address,
	ParamType::Symbol,
	ParamType::Address,
];
const SWAP_SIGNATURE: &[ParamType] = &[
	ParamType::Address,
	ParamType::Symbol,
	ParamType::Address,
	ParamType::Symbol,
	ParamType::Address,
	ParamType::Address,
	ParamType::OptionalU64,
];

impl OperationKind {
	/// Every operation, in declaration order.
	pub const ALL: [OperationKind; 5] = [
		OperationKind::Deposit,
		OperationKind::Settle,
		OperationKind::Withdraw,
		OperationKind::Swap,
		OperationKind::GetBalance,
	];

	/// Name of the function on the contract.
	pub fn function_name(&self) -> &'static str {
		match self {
			OperationKind::Deposit => "auto_deposit",
			OperationKind::Settle => "batch_process",
			OperationKind::Withdraw => "withdraw",
			OperationKind::Swap => "swap",
			OperationKind::GetBalance => "get_balance",
		}
	}

	/// Short operation name used by callers.
	pub fn short_name(&self) -> &'static str {
		match self {
			OperationKind::Deposit => "deposit",
			OperationKind::Settle => "settle",
			OperationKind::Withdraw => "withdraw",
			OperationKind::Swap => "swap",
			OperationKind::GetBalance => "get_balance",
		}
	}

	/// Full positional signature, including the contract reference and the
	/// function symbol in the first two slots.
	pub fn signature(&self) -> &'static [ParamType] {
		match self {
			OperationKind::Deposit => DEPOSIT_SIGNATURE,
			OperationKind::Settle => SETTLE_SIGNATURE,
			OperationKind::Withdraw | OperationKind::GetBalance => WITHDRAW_SIGNATURE,
			OperationKind::Swap => SWAP_SIGNATURE,
		}
	}

	pub fn return_type(&self) -> ReturnType {
		match self {
			OperationKind::Deposit | OperationKind::Settle => ReturnType::Void,
			OperationKind::Withdraw | OperationKind::Swap | OperationKind::GetBalance => {
				ReturnType::U64
			},
		}
	}

	/// Read-only operations are simulated, never submitted.
	pub fn is_read_only(&self) -> bool {
		matches!(self, OperationKind::GetBalance)
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.function_name())
	}
}

impl FromStr for OperationKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OperationKind::ALL
			.into_iter()
			.find(|kind| kind.short_name() == s || kind.function_name() == s)
			.ok_or_else(|| format!("Unknown operation: {}", s))
	}
}

/// Typed arguments for each contract operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationArgs {
	Deposit {
		owner: String,
		chain: String,
		asset: String,
		amount: u64,
	},
	Settle,
	Withdraw {
		owner: String,
		chain: String,
		asset: String,
	},
	Swap {
		owner: String,
		from_chain: String,
		from_asset: String,
		to_asset: String,
		amount: Option<u64>,
	},
	GetBalance {
		owner: String,
		chain: String,
		asset: String,
	},
}

impl OperationArgs {
	/// The operation these arguments belong to.
	pub fn kind(&self) -> OperationKind {
		match self {
			OperationArgs::Deposit { .. } => OperationKind::Deposit,
			OperationArgs::Settle => OperationKind::Settle,
			OperationArgs::Withdraw { .. } => OperationKind::Withdraw,
			OperationArgs::Swap { .. } => OperationKind::Swap,
			OperationArgs::GetBalance { .. } => OperationKind::GetBalance,
		}
	}
}

/// A remote call before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
	pub operation: OperationKind,
	/// Address of the aggregator contract.
	pub contract_address: String,
	/// Network passphrase or identifier the request is bound to.
	pub network_id: String,
	/// Position-encoded parameters, matching the operation signature exactly.
	pub parameters: Vec<ContractValue>,
	/// Fee hint attached to the submission.
	pub fee: u32,
	/// Validity window of the submission in seconds.
	pub timeout_seconds: u64,
}

impl OperationRequest {
	/// Checks the parameter list against the operation signature.
	///
	/// Verifies the parameter count, each slot's type, that the first slot is
	/// the contract address and that the second slot is the function symbol.
	pub fn validate(&self) -> Result<(), String> {
		let signature = self.operation.signature();
		if self.parameters.len() != signature.len() {
			return Err(format!(
				"{} expects {} parameters, got {}",
				self.operation,
				signature.len(),
				self.parameters.len()
			));
		}

		for (index, (slot, value)) in signature.iter().zip(&self.parameters).enumerate() {
			if !slot.accepts(value) {
				return Err(format!(
					"{} parameter {} expects {:?}, got {:?}",
					self.operation,
					index,
					slot,
					value.param_type()
				));
			}
		}

		match &self.parameters[..2] {
			[ContractValue::Address(contract), ContractValue::Symbol(function)]
				if contract == &self.contract_address
					&& function == self.operation.function_name() =>
			{
				Ok(())
			},
			_ => Err(format!(
				"{} must start with the contract reference and function symbol",
				self.operation
			)),
		}
	}
}
