//! Errors raised while turning one operation into a decoded result.

use crate::FailureKind;
use thiserror::Error;

/// Failure of a single remote invocation.
///
/// Each stage of the encode, sign, submit and decode pipeline has its own
/// variant so that batch outcomes can report where an item failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvocationError {
	#[error("Encoding error: {0}")]
	Encoding(String),
	#[error("Signing error: {0}")]
	Signing(String),
	#[error("Submission error: {0}")]
	Submission(String),
	#[error("Timed out after {seconds}s")]
	Timeout { seconds: u64 },
	#[error("Decode error: expected {expected}, got {actual}")]
	Decode { expected: String, actual: String },
}

impl InvocationError {
	pub fn kind(&self) -> FailureKind {
		match self {
			InvocationError::Encoding(_) => FailureKind::Encoding,
			InvocationError::Signing(_) => FailureKind::Signing,
			InvocationError::Submission(_) => FailureKind::Submission,
			InvocationError::Timeout { .. } => FailureKind::Timeout,
			InvocationError::Decode { .. } => FailureKind::Decode,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_kind_mapping() {
		assert_eq!(
			InvocationError::Timeout { seconds: 30 }.kind(),
			FailureKind::Timeout
		);
		assert_eq!(
			InvocationError::Decode {
				expected: "u64".into(),
				actual: "void".into()
			}
			.kind(),
			FailureKind::Decode
		);
		assert_eq!(
			InvocationError::Timeout { seconds: 30 }.to_string(),
			"Timed out after 30s"
		);
	}
}
