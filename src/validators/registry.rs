use super::core::MetaValidator;
use crate::error::{BlockError, BlockResult};
use crate::models::BlockType;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of metadata validators keyed by block type tag.
///
/// Validators are registered at initialization and looked up per request.
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn MetaValidator>>,
}

impl ValidatorRegistry {
    /// Create a new registry with all built-in validators registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// A registry that validates nothing.
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Register a validator, replacing any previous one for the same tag.
    pub fn register(&mut self, validator: Arc<dyn MetaValidator>) {
        self.validators
            .insert(validator.block_type().to_string(), validator);
    }

    pub fn get(&self, block_type: &str) -> Option<Arc<dyn MetaValidator>> {
        self.validators.get(block_type).cloned()
    }

    /// Check `meta` against the schema of `block_type`.
    ///
    /// Absent (`null`) or empty meta means "no content yet" and is accepted.
    /// Types without a registered validator are accepted unchecked.
    pub fn validate(&self, block_type: &BlockType, meta: &Value) -> BlockResult<()> {
        let meta = match meta {
            Value::Null => return Ok(()),
            Value::Object(obj) if obj.is_empty() => return Ok(()),
            Value::Object(obj) => obj,
            _ => {
                return Err(BlockError::validation(format!(
                    "{} meta must be a JSON object",
                    block_type
                )))
            }
        };

        let Some(validator) = self.validators.get(block_type.as_str()) else {
            log::debug!("validate | no validator for block type {}", block_type);
            return Ok(());
        };

        validator.validate(meta).map_err(|details| {
            log::debug!("validate | {} meta rejected: {}", block_type, details);
            BlockError::validation(format!("{} meta: {}", block_type, details))
        })
    }

    fn register_builtins(&mut self) {
        use super::builtins::*;

        self.register(Arc::new(TextMetaValidator));
        self.register(Arc::new(ContainerMetaValidator));
        self.register(Arc::new(PageMetaValidator));
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.validators.keys().collect();
        tags.sort();
        f.debug_struct("ValidatorRegistry").field("block_types", &tags).finish()
    }
}
