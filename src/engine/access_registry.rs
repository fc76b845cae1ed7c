use crate::engine::context::RequestContext;
use crate::error::{BlockError, BlockResult};
use crate::models::{AccessGrant, GrantPatch, Permission};
use crate::utils::time::{from_db, now_utc, to_db};
use crate::utils::BlockPath;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

const GRANT_COLUMNS: &str = "id, grantee_id, granted_by, root_path, permission, is_active, \
     expires_at, created_at, updated_at";

/// Ranks permissions inside SQL so the highest one sorts first.
const PERMISSION_RANK_SQL: &str =
    "CASE permission WHEN 'OWNER' THEN 3 WHEN 'EDIT' THEN 2 ELSE 1 END";

/// Sharing entries: who may act on which subtree, at which level, until when.
///
/// Authorization of the caller is the evaluator's job; the registry only
/// persists and queries grants.
#[derive(Debug, Clone)]
pub struct AccessRegistry {
    pool: SqlitePool,
}

impl AccessRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the grant for `(grantee_id, path of block_id)`.
    ///
    /// Re-granting overwrites permission and expiry, re-activates the grant
    /// and records the new issuer; the most recent call wins. The scope path
    /// is read from the live block row in the same statement, so granting on
    /// a block that is being deleted either lands first (and is removed by
    /// the cascade) or fails with `BlockNotFound`.
    pub async fn grant(
        &self,
        ctx: &RequestContext,
        granted_by: &str,
        grantee_id: &str,
        block_id: &str,
        permission: Permission,
        expires_at: Option<DateTime<Utc>>,
    ) -> BlockResult<AccessGrant> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = to_db(&now_utc());
        let expires_at = expires_at.as_ref().map(to_db);
        let sql = format!(
            "INSERT INTO access_grants
                (id, grantee_id, granted_by, root_path, permission, is_active, expires_at, created_at, updated_at)
             SELECT ?1, ?2, ?3, path, ?4, 1, ?5, ?6, ?6 FROM blocks WHERE id = ?7
             ON CONFLICT (grantee_id, root_path) DO UPDATE SET
                permission = excluded.permission,
                expires_at = excluded.expires_at,
                granted_by = excluded.granted_by,
                is_active = 1,
                updated_at = excluded.updated_at
             RETURNING {}",
            GRANT_COLUMNS
        );

        let grant = ctx
            .run(async {
                let row = sqlx::query(&sql)
                    .bind(&id)
                    .bind(grantee_id)
                    .bind(granted_by)
                    .bind(permission.as_str())
                    .bind(expires_at.as_deref())
                    .bind(&now)
                    .bind(block_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(BlockError::FailedToCreate)?
                    .ok_or_else(|| BlockError::BlockNotFound(block_id.to_string()))?;
                row_to_grant(&row).map_err(BlockError::Storage)
            })
            .await?;

        log::info!(
            "grant | {} granted {} {} on {}",
            granted_by,
            grantee_id,
            grant.permission,
            grant.root_path
        );
        Ok(grant)
    }

    pub async fn get(&self, ctx: &RequestContext, grant_id: &str) -> BlockResult<AccessGrant> {
        let sql = format!("SELECT {} FROM access_grants WHERE id = ?1", GRANT_COLUMNS);
        ctx.run(async {
            let row = sqlx::query(&sql)
                .bind(grant_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(BlockError::Storage)?
                .ok_or_else(|| BlockError::GrantNotFound(grant_id.to_string()))?;
            row_to_grant(&row).map_err(BlockError::Storage)
        })
        .await
    }

    /// Apply a partial update. Fields absent from `patch` are kept.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        grant_id: &str,
        patch: &GrantPatch,
    ) -> BlockResult<AccessGrant> {
        let now = to_db(&now_utc());
        let set_expiry = patch.expires_at.is_some();
        let expires_at = patch.expires_at.flatten().as_ref().map(to_db);
        let sql = format!(
            "UPDATE access_grants SET
                permission = COALESCE(?1, permission),
                is_active = COALESCE(?2, is_active),
                expires_at = CASE WHEN ?3 THEN ?4 ELSE expires_at END,
                updated_at = ?5
             WHERE id = ?6
             RETURNING {}",
            GRANT_COLUMNS
        );

        let grant = ctx
            .run(async {
                let row = sqlx::query(&sql)
                    .bind(patch.permission.map(Permission::as_str))
                    .bind(patch.is_active)
                    .bind(set_expiry)
                    .bind(expires_at.as_deref())
                    .bind(&now)
                    .bind(grant_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(BlockError::FailedToUpdate)?
                    .ok_or_else(|| BlockError::GrantNotFound(grant_id.to_string()))?;
                row_to_grant(&row).map_err(BlockError::Storage)
            })
            .await?;

        log::info!(
            "update_grant | grant {} now {} (active: {})",
            grant.id,
            grant.permission,
            grant.is_active
        );
        Ok(grant)
    }

    /// Soft-disable a grant.
    pub async fn revoke(&self, ctx: &RequestContext, grant_id: &str) -> BlockResult<AccessGrant> {
        self.update(ctx, grant_id, &GrantPatch::revoke()).await
    }

    /// Physically remove a grant.
    pub async fn delete(&self, ctx: &RequestContext, grant_id: &str) -> BlockResult<()> {
        let affected = ctx
            .run(async {
                sqlx::query("DELETE FROM access_grants WHERE id = ?1")
                    .bind(grant_id)
                    .execute(&self.pool)
                    .await
                    .map(|r| r.rows_affected())
                    .map_err(BlockError::FailedToDelete)
            })
            .await?;

        if affected == 0 {
            return Err(BlockError::GrantNotFound(grant_id.to_string()));
        }
        log::info!("delete_grant | grant {} removed", grant_id);
        Ok(())
    }

    /// The grant that decides `grantee_id`'s access to `path` at `now`.
    ///
    /// Candidates are grants scoped at `path` or any ancestor that are active
    /// and unexpired. The highest permission wins; among equals the most
    /// specific (longest) scope is returned.
    pub async fn find_effective_grant(
        &self,
        ctx: &RequestContext,
        grantee_id: &str,
        path: &BlockPath,
        now: DateTime<Utc>,
    ) -> BlockResult<Option<AccessGrant>> {
        let sql = format!(
            "SELECT {} FROM access_grants
             WHERE grantee_id = ?1
               AND (root_path = ?2 OR substr(?2, 1, length(root_path) + 1) = root_path || '.')
               AND is_active = 1
               AND (expires_at IS NULL OR expires_at > ?3)
             ORDER BY {} DESC, length(root_path) DESC
             LIMIT 1",
            GRANT_COLUMNS, PERMISSION_RANK_SQL
        );
        let now = to_db(&now);

        let grant = ctx
            .run(async {
                sqlx::query(&sql)
                    .bind(grantee_id)
                    .bind(path.as_str())
                    .bind(&now)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(BlockError::Storage)?
                    .map(|row| row_to_grant(&row).map_err(BlockError::Storage))
                    .transpose()
            })
            .await?;

        log::debug!(
            "find_effective_grant | {} on {}: {:?}",
            grantee_id,
            path,
            grant.as_ref().map(|g| g.permission)
        );
        Ok(grant)
    }

    /// All grants issued by `actor_id`, newest first.
    pub async fn list_granted_by(
        &self,
        ctx: &RequestContext,
        actor_id: &str,
    ) -> BlockResult<Vec<AccessGrant>> {
        let sql = format!(
            "SELECT {} FROM access_grants WHERE granted_by = ?1 ORDER BY updated_at DESC, id",
            GRANT_COLUMNS
        );
        ctx.run(async {
            let rows = sqlx::query(&sql)
                .bind(actor_id)
                .fetch_all(&self.pool)
                .await
                .map_err(BlockError::Storage)?;
            rows.iter()
                .map(|row| row_to_grant(row).map_err(BlockError::Storage))
                .collect()
        })
        .await
    }
}

/// Convert a database row to an AccessGrant.
fn row_to_grant(row: &SqliteRow) -> Result<AccessGrant, sqlx::Error> {
    let id: String = row.try_get(0)?;
    let grantee_id: String = row.try_get(1)?;
    let granted_by: String = row.try_get(2)?;
    let root_path: String = row.try_get(3)?;
    let permission: String = row.try_get(4)?;
    let is_active: bool = row.try_get(5)?;
    let expires_at: Option<String> = row.try_get(6)?;
    let created_at: String = row.try_get(7)?;
    let updated_at: String = row.try_get(8)?;

    let decode = |e: Box<dyn std::error::Error + Send + Sync>| sqlx::Error::Decode(e);

    Ok(AccessGrant {
        id,
        grantee_id,
        granted_by,
        root_path: BlockPath::parse(&root_path).map_err(|e| decode(Box::new(e)))?,
        permission: permission
            .parse()
            .map_err(|e: String| decode(e.into()))?,
        is_active,
        expires_at: expires_at
            .as_deref()
            .map(from_db)
            .transpose()
            .map_err(|e| decode(Box::new(e)))?,
        created_at: from_db(&created_at).map_err(|e| decode(Box::new(e)))?,
        updated_at: from_db(&updated_at).map_err(|e| decode(Box::new(e)))?,
    })
}
