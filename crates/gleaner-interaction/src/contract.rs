//! JSON Schema output contracts.

use gleaner_core::error::{GleanerError, Result};
use jsonschema::Validator;
use serde_json::Value;

/// A compiled JSON Schema describing what a step expects from the model.
///
/// The raw schema is also sent to the model as the output-shape hint.
pub struct OutputContract {
    schema: Value,
    validator: Validator,
}

impl std::fmt::Debug for OutputContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputContract")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl OutputContract {
    pub fn new(schema: Value) -> Result<Self> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| GleanerError::config(format!("invalid output schema: {e}")))?;
        Ok(Self { schema, validator })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validation errors for `value`, each prefixed with its instance path.
    pub fn violations(&self, value: &Value) -> Vec<String> {
        self.validator
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path.to_string();
                let path = if path.is_empty() || path == "/" { "(root)".to_string() } else { path };
                format!("{path}: {e}")
            })
            .collect()
    }
}
