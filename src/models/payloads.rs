use super::{BlockType, GrantPatch, Permission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Request payloads accepted by the command layer. Adapters deserialize their
// transport format into these and pass them in together with the actor id.

/// Payload for `create_page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePagePayload {
    pub title: String,
    #[serde(default)]
    pub order: i64,
}

/// Payload for `create_block`.
///
/// Exactly one of `parent_id` (nest under an existing block) or `page_id`
/// (attach at the top of a page) must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockPayload {
    pub block_type: BlockType,
    #[serde(default)]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
}

/// Payload for `update_block`. `meta` is merged shallowly into the stored meta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBlockPayload {
    pub block_id: String,
    /// Optional echo of the block type; must match the stored type.
    #[serde(default)]
    pub block_type: Option<BlockType>,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// Payload for `grant_access`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccessPayload {
    pub grantee_id: String,
    pub block_id: String,
    pub permission: Permission,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payload for `update_access`.
///
/// `expires_at` distinguishes "absent" (keep) from an explicit `null` (clear).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAccessPayload {
    pub access_id: String,
    #[serde(default)]
    pub permission: Option<Permission>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateAccessPayload {
    pub fn patch(&self) -> GrantPatch {
        GrantPatch {
            permission: self.permission,
            is_active: self.is_active,
            expires_at: self.expires_at,
        }
    }
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
