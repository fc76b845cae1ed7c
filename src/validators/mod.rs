pub mod builtins;
pub mod core;
pub mod registry;

pub use self::core::{MetaValidator, ValidationResult};
pub use registry::ValidatorRegistry;
