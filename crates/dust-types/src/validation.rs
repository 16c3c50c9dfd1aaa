//! Schema checks for implementation config tables.
//!
//! Every pluggable implementation (price tables, signers, submission
//! backends) declares a [`ConfigSchema`] for its `config` table. The builder
//! runs the schema before calling the factory so that a misconfigured
//! implementation is rejected at startup rather than mid-batch.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while checking a config table against a schema.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	/// Prefixes the offending field path with `parent`.
	fn nested_in(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", parent, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
			other => other,
		}
	}
}

/// Type of a config field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// A non-negative decimal written either as a TOML number or a string.
	///
	/// Prices are commonly written as strings to avoid float rounding.
	Decimal,
	/// Array whose elements all share one type.
	Array(Box<FieldType>),
	/// Nested table with its own schema.
	Table(Schema),
}

/// Extra check run on a field after its type has been verified.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches an extra check that runs after type checking passes.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a config table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks `config` against this schema.
	///
	/// Every required field must be present. Optional fields are only checked
	/// when present. Nested tables report failures with a dotted field path.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

/// Reads a TOML number or numeric string as a [`Decimal`].
pub fn decimal_from_toml(value: &toml::Value) -> Option<Decimal> {
	match value {
		toml::Value::String(s) => Decimal::from_str(s.trim()).ok(),
		toml::Value::Integer(i) => Some(Decimal::from(*i)),
		toml::Value::Float(f) => Decimal::from_str(&f.to_string()).ok(),
		_ => None,
	}
}

fn mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn check_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field_name, "string", value));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min.filter(|m| int_val < *m) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is less than minimum {}", int_val, min_val),
				});
			}
			if let Some(max_val) = max.filter(|m| int_val > *m) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is greater than maximum {}", int_val, max_val),
				});
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Decimal => {
			let decimal =
				decimal_from_toml(value).ok_or_else(|| mismatch(field_name, "decimal", value))?;
			if decimal.is_sign_negative() {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} must not be negative", decimal),
				});
			}
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				check_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema
				.validate(value)
				.map_err(|e| e.nested_in(field_name))?;
		},
	}

	Ok(())
}

/// A schema that can check an implementation's config table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
