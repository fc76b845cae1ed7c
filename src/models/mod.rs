mod block;
mod grant;
pub mod payloads;

pub use block::{merge_meta, Block, BlockType, PageTitle};
pub use grant::{AccessGrant, GrantPatch, Permission};
pub use payloads::*;
