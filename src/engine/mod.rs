mod access_registry;
mod block_store;
mod context;
mod database;

pub use access_registry::AccessRegistry;
pub use block_store::BlockStore;
pub use context::RequestContext;
pub use database::Database;
