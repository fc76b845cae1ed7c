use crate::engine::{AccessRegistry, BlockStore, RequestContext};
use crate::error::{BlockError, BlockResult};
use crate::models::{AccessGrant, Block, Permission};
use crate::utils::time::now_utc;
use chrono::{DateTime, Utc};

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The actor owns the page the block lives on.
    Owner,
    /// An effective grant at least as strong as required.
    Granted(Permission),
    Denied,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Decision::Denied)
    }
}

/// Decide whether `actor_id` holds `required` on a block.
///
/// - Page owner always has access
/// - Otherwise the effective grant must be active, unexpired and rank at
///   least `required`
pub fn decide(
    actor_id: &str,
    page_owner: Option<&str>,
    grant: Option<&AccessGrant>,
    required: Permission,
    now: DateTime<Utc>,
) -> Decision {
    if page_owner == Some(actor_id) {
        return Decision::Owner;
    }

    match grant.filter(|g| g.grantee_id == actor_id && g.is_effective_at(now)) {
        Some(g) if g.permission.satisfies(required) => Decision::Granted(g.permission),
        _ => Decision::Denied,
    }
}

/// Answers "does this actor have at least P on this block's subtree?".
///
/// Ownership is consulted first, the access registry second. Holds no state
/// of its own beyond cloned store handles.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    blocks: BlockStore,
    access: AccessRegistry,
}

impl PermissionEvaluator {
    pub fn new(blocks: BlockStore, access: AccessRegistry) -> Self {
        Self { blocks, access }
    }

    /// Resolve `block_id` and check `required` on it. Returns the block on
    /// success so callers don't have to load it twice.
    pub async fn check_access(
        &self,
        ctx: &RequestContext,
        actor_id: &str,
        block_id: &str,
        required: Permission,
    ) -> BlockResult<Block> {
        let block = self.blocks.get_by_id(ctx, block_id).await?;
        self.check_block_access(ctx, actor_id, &block, required)
            .await?;
        Ok(block)
    }

    /// Check `required` on a block that is already loaded.
    pub async fn check_block_access(
        &self,
        ctx: &RequestContext,
        actor_id: &str,
        block: &Block,
        required: Permission,
    ) -> BlockResult<Decision> {
        let page_owner = if block.is_page() {
            block.owner_id.clone()
        } else {
            self.blocks.get_by_id(ctx, block.page_id()).await?.owner_id
        };

        let now = now_utc();
        let grant = if page_owner.as_deref() == Some(actor_id) {
            None
        } else {
            self.access
                .find_effective_grant(ctx, actor_id, &block.path, now)
                .await?
        };

        match decide(actor_id, page_owner.as_deref(), grant.as_ref(), required, now) {
            Decision::Denied => {
                log::warn!(
                    "check_access | access denied: user {} to block {} ({} required)",
                    actor_id,
                    block.id,
                    required
                );
                Err(BlockError::access_denied(actor_id, &block.id, required))
            }
            decision => {
                log::debug!(
                    "check_access | user {} on block {}: {:?}",
                    actor_id,
                    block.id,
                    decision
                );
                Ok(decision)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BlockPath;
    use chrono::Duration;

    fn grant(grantee: &str, permission: Permission, active: bool, expires_in: Option<i64>) -> AccessGrant {
        let now = Utc::now();
        AccessGrant {
            id: "g".to_string(),
            grantee_id: grantee.to_string(),
            granted_by: "alice".to_string(),
            root_path: BlockPath::parse("p1").unwrap(),
            permission,
            is_active: active,
            expires_at: expires_in.map(|s| now + Duration::seconds(s)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_owner_always_allowed() {
        let now = Utc::now();
        for required in [Permission::View, Permission::Edit, Permission::Owner] {
            assert_eq!(
                decide("alice", Some("alice"), None, required, now),
                Decision::Owner
            );
        }
    }

    #[test]
    fn test_owner_ignores_grant_state() {
        let now = Utc::now();
        let revoked = grant("alice", Permission::View, false, None);
        assert_eq!(
            decide("alice", Some("alice"), Some(&revoked), Permission::Owner, now),
            Decision::Owner
        );
    }

    #[test]
    fn test_no_grant_denied() {
        assert_eq!(
            decide("bob", Some("alice"), None, Permission::View, Utc::now()),
            Decision::Denied
        );
    }

    #[test]
    fn test_rank_comparison() {
        let now = Utc::now();
        let view = grant("bob", Permission::View, true, None);
        assert_eq!(
            decide("bob", Some("alice"), Some(&view), Permission::View, now),
            Decision::Granted(Permission::View)
        );
        assert_eq!(
            decide("bob", Some("alice"), Some(&view), Permission::Edit, now),
            Decision::Denied
        );

        let owner = grant("bob", Permission::Owner, true, None);
        assert!(decide("bob", Some("alice"), Some(&owner), Permission::Edit, now).is_allowed());
    }

    #[test]
    fn test_expired_or_inactive_treated_as_absent() {
        let now = Utc::now();
        let expired = grant("bob", Permission::Owner, true, Some(-1));
        let inactive = grant("bob", Permission::Owner, false, None);
        assert_eq!(
            decide("bob", Some("alice"), Some(&expired), Permission::View, now),
            Decision::Denied
        );
        assert_eq!(
            decide("bob", Some("alice"), Some(&inactive), Permission::View, now),
            Decision::Denied
        );
    }

    #[test]
    fn test_grant_for_other_user_ignored() {
        let carol = grant("carol", Permission::Owner, true, None);
        assert_eq!(
            decide("bob", Some("alice"), Some(&carol), Permission::View, Utc::now()),
            Decision::Denied
        );
    }
}
