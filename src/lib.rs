pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod permissions;
pub mod state;
pub mod utils;
pub mod validators;

pub use error::{BlockError, BlockResult};
pub use state::AppState;
