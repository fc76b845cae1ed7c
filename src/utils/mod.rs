pub mod path_codec;
pub mod time;

pub use path_codec::{new_block_id, BlockPath, PathCodecError};
