//! Configuration validation utilities for resolver implementations.
//!
//! Each pluggable implementation describes its TOML table with a `Schema`.
//! Schemas are checked before a factory builds the implementation, so a bad
//! URL or address is reported with its field path instead of surfacing later
//! as a transport failure.

use alloy_primitives::Address;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// Error that occurs when a required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Represents the type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// A string holding an absolute http(s) URL.
	Url,
	/// A string holding a 20-byte hex address.
	Address,
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a configuration schema.
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
	/// Creates a new field with the given name and type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;

		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}

		Ok(())
	}
}

/// Validation schema for one TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a new schema with required and optional fields.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// Required fields must be present; optional fields are checked only when
	/// present. Unknown keys are ignored.
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

fn type_mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(type_mismatch(field_name, "string", value));
			}
		},
		FieldType::Url => {
			let url = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "url string", value))?;
			if !(url.starts_with("http://") || url.starts_with("https://")) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not an http(s) URL", url),
				});
			}
		},
		FieldType::Address => {
			let raw = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "address string", value))?;
			raw.parse::<Address>()
				.map_err(|e| ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not a valid address: {}", raw, e),
				})?;
		},
	}

	Ok(())
}

/// A configuration schema owned by one implementation.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML configuration value against this schema.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	#[test]
	fn test_missing_required_field() {
		let schema = Schema::new(vec![Field::new("url", FieldType::Url)], vec![]);
		let err = schema.validate(&parse("other = 1")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "url"));
	}

	#[test]
	fn test_url_field_requires_http_scheme() {
		let schema = Schema::new(vec![Field::new("url", FieldType::Url)], vec![]);
		assert!(schema.validate(&parse(r#"url = "https://hermes.pyth.network""#)).is_ok());

		let err = schema.validate(&parse(r#"url = "ftp://example.com""#)).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "url"));
	}

	#[test]
	fn test_address_field() {
		let schema = Schema::new(vec![], vec![Field::new("forwarder", FieldType::Address)]);
		assert!(schema
			.validate(&parse(
				r#"forwarder = "0xE2C5658cC5C448B48141168f3e475dF8f65A1e3e""#
			))
			.is_ok());
		assert!(schema.validate(&parse(r#"forwarder = "0x1234""#)).is_err());
		// Optional field may be absent
		assert!(schema.validate(&parse("")).is_ok());
	}

	#[test]
	fn test_type_mismatch_names_field() {
		let schema = Schema::new(vec![Field::new("endpoint", FieldType::Url)], vec![]);
		let err = schema.validate(&parse("endpoint = 42")).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Type mismatch for field 'endpoint': expected url string, got integer"
		);

		let err = Schema::new(vec![], vec![]).validate(&toml::Value::Integer(1)).unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { field, .. } if field == "root"));
	}

	#[test]
	fn test_custom_validator() {
		let schema = Schema::new(
			vec![Field::new("oracle_id", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if s.len() <= 32 => Ok(()),
					_ => Err("oracle_id must fit in bytes32".to_string()),
				}
			})],
			vec![],
		);

		assert!(schema.validate(&parse(r#"oracle_id = "PYTH""#)).is_ok());
		let long = format!(r#"oracle_id = "{}""#, "X".repeat(33));
		assert!(schema.validate(&parse(&long)).is_err());
	}
}
