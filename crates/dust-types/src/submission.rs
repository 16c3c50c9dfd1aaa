//! Submission and result types.
//!
//! A [`SignedSubmission`] is an [`OperationRequest`] bound to a source
//! account and a sequence number, plus the signature over both. The network
//! answers with a [`SubmissionHandle`] and, once the submission resolves, a
//! [`RawResult`] that the decoder checks against the operation's declared
//! return type.

use crate::OperationRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque hash assigned by the network when it accepts a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionHandle(pub String);

impl fmt::Display for SubmissionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Fresh view of a source account as reported by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
	pub address: String,
	/// Sequence number of the last submission the network accepted.
	pub sequence: u64,
}

/// A signed request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedSubmission {
	pub request: OperationRequest,
	/// Address of the submitting account.
	pub source: String,
	/// Sequence number this submission consumes.
	pub sequence: u64,
	/// Hex-encoded public key of the signer.
	pub public_key: String,
	/// Raw signature bytes.
	pub signature: Vec<u8>,
}

/// Typed value returned by a contract operation, as reported by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
	/// Type tag of the returned value, e.g. `"u64"` or `"void"`.
	pub type_tag: String,
	pub value: Option<String>,
}

impl RawResult {
	pub fn void() -> Self {
		Self {
			type_tag: "void".to_string(),
			value: None,
		}
	}

	pub fn u64(value: u64) -> Self {
		Self {
			type_tag: "u64".to_string(),
			value: Some(value.to_string()),
		}
	}
}

/// Resolution state of a submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
	/// Accepted but not yet resolved.
	Pending,
	Success { result: RawResult },
	Failed { error: String },
}

/// A decoded return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
	U64(u64),
	Void,
}

impl DecodedValue {
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			DecodedValue::U64(v) => Some(*v),
			DecodedValue::Void => None,
		}
	}
}

impl fmt::Display for DecodedValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DecodedValue::U64(v) => write!(f, "{}", v),
			DecodedValue::Void => f.write_str("void"),
		}
	}
}
