use crate::validators::core::{require_non_empty_str, ValidationResult};
use serde_json::{Map, Value};
use validator_macros::meta_validator;

/// CONTAINER blocks are titled groups.
#[meta_validator(block_type = "CONTAINER")]
fn validate_container(meta: &Map<String, Value>) -> ValidationResult {
    require_non_empty_str(meta, "title")
}
