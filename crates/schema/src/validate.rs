//! JSON Schema validation of assembled documents.

use serde_json::Value;
use thiserror::Error;

/// The schema itself failed to compile.
#[derive(Debug, Error)]
#[error("invalid JSON Schema: {0}")]
pub struct InvalidSchema(pub String);

/// A compiled validator for one root schema.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    pub fn new(schema: &Value) -> Result<Self, InvalidSchema> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| InvalidSchema(e.to_string()))?;
        Ok(Self { validator })
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validate `instance`, collecting every failure as
    /// `"<instance path>: <message>"`.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| {
                let location = e.instance_path.to_string();
                let location = if location.is_empty() { "/".to_string() } else { location };
                format!("{location}: {e}")
            })
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One-shot validation; a schema that does not compile is reported as a
/// single error.
pub fn validate_against(schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
    SchemaValidator::new(schema)
        .map_err(|e| vec![e.to_string()])?
        .validate(instance)
}
