use crate::validators::core::{require_non_empty_str, ValidationResult};
use serde_json::{Map, Value};
use validator_macros::meta_validator;

#[meta_validator(block_type = "PAGE")]
fn validate_page(meta: &Map<String, Value>) -> ValidationResult {
    require_non_empty_str(meta, "title")
}
