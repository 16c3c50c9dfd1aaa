//! Result decoding.

use dust_types::{DecodedValue, InvocationError, OperationKind, RawResult, ReturnType};

/// Decodes `raw` against the declared return type.
///
/// The type tag must match exactly. A `u64` result must carry a value that
/// parses as an unsigned 64-bit integer; any value attached to a `void`
/// result is ignored.
pub fn decode(raw: &RawResult, expected: ReturnType) -> Result<DecodedValue, InvocationError> {
	if raw.type_tag != expected.tag() {
		return Err(InvocationError::Decode {
			expected: expected.tag().to_string(),
			actual: raw.type_tag.clone(),
		});
	}

	match expected {
		ReturnType::Void => Ok(DecodedValue::Void),
		ReturnType::U64 => {
			let value = raw.value.as_deref().ok_or_else(|| InvocationError::Decode {
				expected: "u64".to_string(),
				actual: "u64 without value".to_string(),
			})?;
			value
				.trim()
				.parse::<u64>()
				.map(DecodedValue::U64)
				.map_err(|_| InvocationError::Decode {
					expected: "u64".to_string(),
					actual: format!("'{}'", value),
				})
		},
	}
}

/// Decodes `raw` against the return type declared for `kind`.
pub fn decode_for(kind: OperationKind, raw: &RawResult) -> Result<DecodedValue, InvocationError> {
	decode(raw, kind.return_type())
}
