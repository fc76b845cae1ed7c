use crate::engine::RequestContext;
use crate::error::{BlockError, BlockResult};
use crate::models::{AccessGrant, CreateAccessPayload, GrantPatch, Permission, UpdateAccessPayload};
use crate::state::AppState;
use crate::utils::time::{is_storable, to_db};
use chrono::{DateTime, Utc};

/// Share a block's subtree with another user.
///
/// The actor must hold `OWNER` on the block. Re-sharing the same block with
/// the same user overwrites the previous grant.
///
/// # Returns
/// * `Ok(AccessGrant)` - The created or refreshed grant
/// * `Err(ValidationFailed)` - Empty grantee, a grant to oneself or an
///   expiry outside years 0000-9999
/// * `Err(BlockNotFound)` / `Err(BlockAccessDenied)`
pub async fn grant_access(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    payload: CreateAccessPayload,
) -> BlockResult<AccessGrant> {
    if payload.grantee_id.is_empty() {
        return Err(BlockError::validation("grantee_id is required"));
    }
    if payload.grantee_id == actor_id {
        return Err(BlockError::validation("cannot grant access to yourself"));
    }
    check_expiry(payload.expires_at.as_ref())?;

    let block = state
        .evaluator
        .check_access(ctx, actor_id, &payload.block_id, Permission::Owner)
        .await?;

    state
        .access
        .grant(
            ctx,
            actor_id,
            &payload.grantee_id,
            &block.id,
            payload.permission,
            payload.expires_at,
        )
        .await
}

/// Patch permission, activity or expiry of an existing grant.
pub async fn update_access(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    payload: UpdateAccessPayload,
) -> BlockResult<AccessGrant> {
    let patch = payload.patch();
    if patch.is_empty() {
        return Err(BlockError::validation("nothing to update"));
    }
    check_expiry(patch.expires_at.flatten().as_ref())?;

    let grant = authorize_scope_owner(state, ctx, actor_id, &payload.access_id).await?;
    state.access.update(ctx, &grant.id, &patch).await
}

/// Soft-disable a grant.
pub async fn revoke_access(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    access_id: &str,
) -> BlockResult<AccessGrant> {
    let grant = authorize_scope_owner(state, ctx, actor_id, access_id).await?;
    state.access.update(ctx, &grant.id, &GrantPatch::revoke()).await
}

/// Remove a grant for good.
pub async fn delete_access(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    access_id: &str,
) -> BlockResult<()> {
    let grant = authorize_scope_owner(state, ctx, actor_id, access_id).await?;
    state.access.delete(ctx, &grant.id).await
}

/// Grants the actor has issued.
pub async fn list_issued_access(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
) -> BlockResult<Vec<AccessGrant>> {
    state.access.list_granted_by(ctx, actor_id).await
}

fn check_expiry(expires_at: Option<&DateTime<Utc>>) -> BlockResult<()> {
    match expires_at {
        Some(ts) if !is_storable(ts) => Err(BlockError::validation(format!(
            "expires_at {} is outside years 0000-9999",
            to_db(ts)
        ))),
        _ => Ok(()),
    }
}

/// Load a grant and require `OWNER` on the block its scope starts at.
async fn authorize_scope_owner(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    access_id: &str,
) -> BlockResult<AccessGrant> {
    let grant = state.access.get(ctx, access_id).await?;
    let scope = state.blocks.get_by_path(ctx, &grant.root_path).await?;

    state
        .evaluator
        .check_block_access(ctx, actor_id, &scope, Permission::Owner)
        .await?;
    Ok(grant)
}
