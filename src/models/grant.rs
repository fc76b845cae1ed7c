use crate::utils::BlockPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission levels, totally ordered `VIEW < EDIT < OWNER`.
///
/// A holder of `Owner` satisfies any requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    View,
    Edit,
    Owner,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::View => "VIEW",
            Permission::Edit => "EDIT",
            Permission::Owner => "OWNER",
        }
    }

    pub fn satisfies(self, required: Permission) -> bool {
        self >= required
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIEW" => Ok(Permission::View),
            "EDIT" => Ok(Permission::Edit),
            "OWNER" => Ok(Permission::Owner),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

/// A sharing edge from a subtree to a user.
///
/// The grant covers the block at `root_path` and everything beneath it.
/// At most one row exists per `(grantee_id, root_path)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: String,
    pub grantee_id: String,
    /// Actor that issued (or last re-issued) this grant.
    pub granted_by: String,
    pub root_path: BlockPath,
    pub permission: Permission,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Active and not yet expired at `now`.
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// Partial update for a grant. `expires_at: Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantPatch {
    pub permission: Option<Permission>,
    pub is_active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl GrantPatch {
    pub fn revoke() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permission.is_none() && self.is_active.is_none() && self.expires_at.is_none()
    }
}
