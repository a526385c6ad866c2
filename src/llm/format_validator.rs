use jsonschema::Validator;
use serde_json::Value;

use crate::errors::Error;

/// Creates a JSON Schema validator from a schema string
pub fn build_validator(schema_content: &str) -> Result<Validator, Error> {
    let schema: Value = serde_json::from_str(schema_content)?;
    Ok(jsonschema::validator_for(&schema)?)
}

/// Removes a surrounding markdown code fence, if the model added one
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Validates a JSON string against a schema validator
pub fn validate_response(schema: &Validator, response: &str) -> Result<bool, Error> {
    let val: Value = serde_json::from_str(strip_code_fence(response))?;
    Ok(schema.is_valid(&val))
}
