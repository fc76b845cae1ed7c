//! In-process command surface for adapters.
//!
//! Every command takes the shared [`AppState`](crate::state::AppState), a
//! request context, the authenticated actor id and a payload, and returns a
//! typed entity or a [`BlockError`](crate::error::BlockError).

pub mod access;
pub mod block;
pub mod nesting;

pub use nesting::{classify, Nesting};
