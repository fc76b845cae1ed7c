use crate::validators::core::{type_name, ValidationResult};
use serde_json::{Map, Value};
use validator_macros::meta_validator;

/// TEXT blocks carry their rich-text document under `json`.
///
/// The document must be a non-empty object or array.
#[meta_validator(block_type = "TEXT")]
fn validate_text(meta: &Map<String, Value>) -> ValidationResult {
    match meta.get("json") {
        Some(Value::Object(doc)) if !doc.is_empty() => Ok(()),
        Some(Value::Array(doc)) if !doc.is_empty() => Ok(()),
        Some(Value::Object(_)) | Some(Value::Array(_)) => {
            Err("'json' must be a non-empty document".to_string())
        }
        Some(other) => Err(format!(
            "'json' must be a structured document, got {}",
            type_name(other)
        )),
        None => Err("'json' is required".to_string()),
    }
}
