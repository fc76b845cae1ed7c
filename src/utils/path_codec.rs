//! Block identifiers and materialized paths.
//!
//! A path is the dot-separated chain of ancestor ids ending with the block's
//! own id (`page.container.text`). Ids are drawn from the URL-safe base64
//! alphabet, which contains neither `.` nor `/`; subtree scans use the
//! half-open range `[path + ".", path + "/")` because `/` is the byte right
//! after `.`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SEPARATOR: char = '.';

/// Byte that sorts immediately after `SEPARATOR`.
const SEPARATOR_SUCCESSOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathCodecError {
    #[error("block id must not be empty")]
    EmptyId,

    #[error("block id '{0}' contains the path separator")]
    SeparatorInId(String),

    #[error("malformed block path '{0}'")]
    Malformed(String),
}

/// Generate a new block id: 128 random bits, URL-safe base64 (22 chars).
pub fn new_block_id() -> String {
    URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes())
}

fn check_id(id: &str) -> Result<(), PathCodecError> {
    if id.is_empty() {
        return Err(PathCodecError::EmptyId);
    }
    if id.contains(SEPARATOR) {
        return Err(PathCodecError::SeparatorInId(id.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockPath(String);

impl BlockPath {
    /// Path of a root block (page): the id itself.
    pub fn root(id: &str) -> Result<Self, PathCodecError> {
        check_id(id)?;
        Ok(Self(id.to_string()))
    }

    /// Path of a child block: `parent + "." + id`.
    pub fn child(parent: &BlockPath, id: &str) -> Result<Self, PathCodecError> {
        check_id(id)?;
        Ok(Self(format!("{}{}{}", parent.0, SEPARATOR, id)))
    }

    /// Validate a path read back from storage or received from a caller.
    pub fn parse(value: &str) -> Result<Self, PathCodecError> {
        if value.is_empty() || value.split(SEPARATOR).any(str::is_empty) {
            return Err(PathCodecError::Malformed(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the page this path belongs to (first segment).
    pub fn page_id(&self) -> &str {
        self.0.split(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Id of the block this path points at (last segment).
    pub fn block_id(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    pub fn is_root(&self) -> bool {
        !self.0.contains(SEPARATOR)
    }

    pub fn parent(&self) -> Option<BlockPath> {
        self.0
            .rfind(SEPARATOR)
            .map(|idx| BlockPath(self.0[..idx].to_string()))
    }

    /// True when `other` is this path or lies anywhere beneath it.
    pub fn contains(&self, other: &BlockPath) -> bool {
        other.0 == self.0
            || (other.0.len() > self.0.len()
                && other.0.starts_with(&self.0)
                && other.0[self.0.len()..].starts_with(SEPARATOR))
    }

    /// Half-open range covering every strict descendant of this path.
    pub fn subtree_bounds(&self) -> (String, String) {
        (
            format!("{}{}", self.0, SEPARATOR),
            format!("{}{}", self.0, SEPARATOR_SUCCESSOR),
        )
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BlockPath {
    type Error = PathCodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BlockPath> for String {
    fn from(path: BlockPath) -> Self {
        path.0
    }
}

impl AsRef<str> for BlockPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
