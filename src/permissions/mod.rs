pub mod evaluator;

pub use evaluator::{decide, Decision, PermissionEvaluator};
