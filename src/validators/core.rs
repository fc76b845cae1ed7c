use serde_json::{Map, Value};

/// Result type for metadata validation; the error is a human-readable detail.
pub type ValidationResult = Result<(), String>;

/// Schema check for the meta payload of one block type.
///
/// Implementations are normally generated with the `#[meta_validator]`
/// macro from a plain function.
pub trait MetaValidator: Send + Sync {
    /// Block type tag this validator applies to (e.g. "TEXT").
    fn block_type(&self) -> &str;

    /// Check a non-empty meta object.
    fn validate(&self, meta: &Map<String, Value>) -> ValidationResult;
}

/// Require `key` to be a string with non-whitespace content.
pub fn require_non_empty_str(meta: &Map<String, Value>, key: &str) -> ValidationResult {
    match meta.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(format!("'{}' must not be empty", key)),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, type_name(other))),
        None => Err(format!("'{}' is required", key)),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
