use crate::engine::context::RequestContext;
use crate::error::{BlockError, BlockResult};
use crate::models::{merge_meta, Block, BlockType, PageTitle};
use crate::utils::time::{from_db, now_utc, to_db};
use crate::utils::{new_block_id, BlockPath};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

const BLOCK_COLUMNS: &str =
    "id, block_type, meta, path, owner_id, sort_order, created_at, updated_at";

/// CRUD over the block tree.
///
/// The store owns the path invariants but performs no authorization; callers
/// go through the permission evaluator first. Each method is one unit of
/// storage work under the caller's [`RequestContext`].
#[derive(Debug, Clone)]
pub struct BlockStore {
    pool: SqlitePool,
}

impl BlockStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a root page owned by `owner_id`. Its path is its own id.
    pub async fn create_page(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        title: &str,
        order: i64,
    ) -> BlockResult<Block> {
        let id = new_block_id();
        let path = BlockPath::root(&id)?;
        let meta = serde_json::json!({ "title": title });
        let now = to_db(&now_utc());
        let sql = format!(
            "INSERT INTO blocks (id, block_type, meta, path, owner_id, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING {}",
            BLOCK_COLUMNS
        );

        let block = ctx
            .run(async {
                let row = sqlx::query(&sql)
                    .bind(&id)
                    .bind(BlockType::Page.as_str())
                    .bind(meta.to_string())
                    .bind(path.as_str())
                    .bind(owner_id)
                    .bind(order)
                    .bind(&now)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(create_failed)?;
                row_to_block(&row).map_err(BlockError::Storage)
            })
            .await?;

        log::info!("create_page | user {} created page {}", owner_id, block.id);
        Ok(block)
    }

    /// Create a block under `parent_id`.
    ///
    /// The insert is conditional on the parent row still carrying the path it
    /// was resolved with, so a concurrent subtree delete can never leave an
    /// orphan behind.
    pub async fn create_child(
        &self,
        ctx: &RequestContext,
        parent_id: &str,
        block_type: &BlockType,
        meta: &Value,
        order: i64,
    ) -> BlockResult<Block> {
        let id = new_block_id();
        let meta = if meta.is_null() {
            Value::Object(Map::new())
        } else {
            meta.clone()
        };
        let now = to_db(&now_utc());
        let sql = format!(
            "INSERT INTO blocks (id, block_type, meta, path, owner_id, sort_order, created_at, updated_at)
             SELECT ?1, ?2, ?3, ?4, NULL, ?5, ?6, ?6
             WHERE EXISTS (SELECT 1 FROM blocks WHERE id = ?7 AND path = ?8)
             RETURNING {}",
            BLOCK_COLUMNS
        );

        let block = ctx
            .run(async {
                let parent_path = self.resolve_path(parent_id).await?;
                let path = BlockPath::child(&parent_path, &id)?;

                let row = sqlx::query(&sql)
                    .bind(&id)
                    .bind(block_type.as_str())
                    .bind(meta.to_string())
                    .bind(path.as_str())
                    .bind(order)
                    .bind(&now)
                    .bind(parent_id)
                    .bind(parent_path.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(create_failed)?
                    .ok_or_else(|| BlockError::BlockNotFound(parent_id.to_string()))?;
                row_to_block(&row).map_err(BlockError::Storage)
            })
            .await?;

        log::info!(
            "create_child | {} block {} created at {}",
            block.block_type,
            block.id,
            block.path
        );
        Ok(block)
    }

    /// Merge `partial_meta` into the stored meta and optionally move the block
    /// among its siblings. `updated_at` is always bumped.
    pub async fn update_block(
        &self,
        ctx: &RequestContext,
        block_id: &str,
        partial_meta: &Map<String, Value>,
        order: Option<i64>,
    ) -> BlockResult<Block> {
        let now = to_db(&now_utc());
        let sql = format!(
            "UPDATE blocks SET meta = ?1 WHERE id = ?2 RETURNING {}",
            BLOCK_COLUMNS
        );

        let block = ctx
            .run(async {
                let mut tx = self.pool.begin().await.map_err(BlockError::FailedToUpdate)?;

                // Write first so the transaction holds the write lock before
                // the stored meta is read back for merging.
                let row = sqlx::query(
                    "UPDATE blocks SET updated_at = ?1, sort_order = COALESCE(?2, sort_order)
                     WHERE id = ?3
                     RETURNING meta",
                )
                .bind(&now)
                .bind(order)
                .bind(block_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(BlockError::FailedToUpdate)?
                .ok_or_else(|| BlockError::BlockNotFound(block_id.to_string()))?;

                let stored: String = row.try_get(0).map_err(BlockError::FailedToUpdate)?;
                let mut meta: Value = serde_json::from_str(&stored)
                    .map_err(|e| BlockError::FailedToUpdate(sqlx::Error::Decode(Box::new(e))))?;
                merge_meta(&mut meta, partial_meta);

                let row = sqlx::query(&sql)
                    .bind(meta.to_string())
                    .bind(block_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(BlockError::FailedToUpdate)?;
                let block = row_to_block(&row).map_err(BlockError::FailedToUpdate)?;

                tx.commit().await.map_err(BlockError::FailedToUpdate)?;
                Ok(block)
            })
            .await?;

        log::info!("update_block | block {} updated", block.id);
        Ok(block)
    }

    pub async fn get_by_id(&self, ctx: &RequestContext, block_id: &str) -> BlockResult<Block> {
        let sql = format!("SELECT {} FROM blocks WHERE id = ?1", BLOCK_COLUMNS);
        ctx.run(async {
            let row = sqlx::query(&sql)
                .bind(block_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(BlockError::Storage)?
                .ok_or_else(|| BlockError::BlockNotFound(block_id.to_string()))?;
            row_to_block(&row).map_err(BlockError::Storage)
        })
        .await
    }

    /// Look a block up by its materialized path.
    pub async fn get_by_path(&self, ctx: &RequestContext, path: &BlockPath) -> BlockResult<Block> {
        let sql = format!("SELECT {} FROM blocks WHERE path = ?1", BLOCK_COLUMNS);
        ctx.run(async {
            let row = sqlx::query(&sql)
                .bind(path.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(BlockError::Storage)?
                .ok_or_else(|| BlockError::BlockNotFound(path.block_id().to_string()))?;
            row_to_block(&row).map_err(BlockError::Storage)
        })
        .await
    }

    pub async fn get_path_of(&self, ctx: &RequestContext, block_id: &str) -> BlockResult<BlockPath> {
        ctx.run(self.resolve_path(block_id)).await
    }

    /// Direct children of `parent_id`, in sibling order.
    pub async fn list_children(
        &self,
        ctx: &RequestContext,
        parent_id: &str,
    ) -> BlockResult<Vec<Block>> {
        let sql = format!(
            "SELECT {} FROM blocks
             WHERE path >= ?1 AND path < ?2
               AND instr(substr(path, length(?1) + 1), '.') = 0
             ORDER BY sort_order, created_at, id",
            BLOCK_COLUMNS
        );

        ctx.run(async {
            let parent_path = self.resolve_path(parent_id).await?;
            let (lower, upper) = parent_path.subtree_bounds();

            let rows = sqlx::query(&sql)
                .bind(&lower)
                .bind(&upper)
                .fetch_all(&self.pool)
                .await
                .map_err(BlockError::Storage)?;

            rows.iter()
                .map(|row| row_to_block(row).map_err(BlockError::Storage))
                .collect()
        })
        .await
    }

    /// Pages owned by `user_id` or shared with them through a grant that is
    /// active and unexpired at `now`. Pages are roots, so only grants scoped
    /// at the page itself can reach them.
    pub async fn list_pages_for_user(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> BlockResult<Vec<Block>> {
        let sql = format!(
            "SELECT {} FROM blocks b
             WHERE b.block_type = 'PAGE'
               AND (b.owner_id = ?1 OR EXISTS (
                    SELECT 1 FROM access_grants g
                    WHERE g.grantee_id = ?1
                      AND g.root_path = b.path
                      AND g.is_active = 1
                      AND (g.expires_at IS NULL OR g.expires_at > ?2)))
             ORDER BY b.sort_order, b.created_at, b.id",
            BLOCK_COLUMNS
        );
        let now = to_db(&now);

        ctx.run(async {
            let rows = sqlx::query(&sql)
                .bind(user_id)
                .bind(&now)
                .fetch_all(&self.pool)
                .await
                .map_err(BlockError::Storage)?;

            rows.iter()
                .map(|row| row_to_block(row).map_err(BlockError::Storage))
                .collect()
        })
        .await
    }

    /// Ids and titles of the pages `user_id` owns.
    pub async fn list_owned_page_titles(
        &self,
        ctx: &RequestContext,
        user_id: &str,
    ) -> BlockResult<Vec<PageTitle>> {
        ctx.run(async {
            let rows = sqlx::query(
                "SELECT id, meta FROM blocks
                 WHERE owner_id = ?1 AND block_type = 'PAGE'
                 ORDER BY sort_order, created_at, id",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(BlockError::Storage)?;

            let mut titles = Vec::with_capacity(rows.len());
            for row in rows {
                let id: String = row.try_get(0).map_err(BlockError::Storage)?;
                let meta: String = row.try_get(1).map_err(BlockError::Storage)?;
                let title = serde_json::from_str::<Value>(&meta)
                    .ok()
                    .and_then(|m| m.get("title").and_then(Value::as_str).map(str::to_string));
                titles.push(PageTitle { id, title });
            }
            Ok(titles)
        })
        .await
    }

    /// Delete `block_id` and everything beneath it, together with every grant
    /// scoped inside that subtree. All or nothing.
    pub async fn delete_subtree(&self, ctx: &RequestContext, block_id: &str) -> BlockResult<()> {
        let (grants, blocks) = ctx
            .run(async {
                let mut tx = self.pool.begin().await.map_err(BlockError::FailedToDelete)?;

                // Resolve the path with a write so the transaction holds the
                // write lock before anything else happens.
                let row = sqlx::query(
                    "UPDATE blocks SET updated_at = updated_at WHERE id = ?1 RETURNING path",
                )
                .bind(block_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(BlockError::FailedToDelete)?
                .ok_or_else(|| BlockError::BlockNotFound(block_id.to_string()))?;

                let stored: String = row.try_get(0).map_err(BlockError::FailedToDelete)?;
                let path = BlockPath::parse(&stored)
                    .map_err(|e| BlockError::FailedToDelete(sqlx::Error::Decode(Box::new(e))))?;
                let (lower, upper) = path.subtree_bounds();

                let grants = sqlx::query(
                    "DELETE FROM access_grants
                     WHERE root_path = ?1 OR (root_path >= ?2 AND root_path < ?3)",
                )
                .bind(path.as_str())
                .bind(&lower)
                .bind(&upper)
                .execute(&mut *tx)
                .await
                .map_err(BlockError::FailedToDelete)?
                .rows_affected();

                let blocks = sqlx::query(
                    "DELETE FROM blocks WHERE path = ?1 OR (path >= ?2 AND path < ?3)",
                )
                .bind(path.as_str())
                .bind(&lower)
                .bind(&upper)
                .execute(&mut *tx)
                .await
                .map_err(BlockError::FailedToDelete)?
                .rows_affected();

                tx.commit().await.map_err(BlockError::FailedToDelete)?;
                Ok((grants, blocks))
            })
            .await
            .map_err(|e| {
                if matches!(e, BlockError::FailedToDelete(_)) {
                    log::error!("delete_subtree | rolled back delete of {}: {}", block_id, e);
                }
                e
            })?;

        log::info!(
            "delete_subtree | removed {} blocks and {} grants under {}",
            blocks,
            grants,
            block_id
        );
        Ok(())
    }

    async fn resolve_path(&self, block_id: &str) -> BlockResult<BlockPath> {
        let row = sqlx::query("SELECT path FROM blocks WHERE id = ?1")
            .bind(block_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(BlockError::Storage)?
            .ok_or_else(|| BlockError::BlockNotFound(block_id.to_string()))?;

        let stored: String = row.try_get(0).map_err(BlockError::Storage)?;
        BlockPath::parse(&stored).map_err(|e| BlockError::Storage(sqlx::Error::Decode(Box::new(e))))
    }
}

fn create_failed(e: sqlx::Error) -> BlockError {
    let err = BlockError::FailedToCreate(e);
    if err.is_unique_violation() {
        log::warn!("create | unique constraint violated: {}", err);
    }
    err
}

/// Convert a database row to a Block.
pub(crate) fn row_to_block(row: &SqliteRow) -> Result<Block, sqlx::Error> {
    let id: String = row.try_get(0)?;
    let block_type: String = row.try_get(1)?;
    let meta_json: String = row.try_get(2)?;
    let path: String = row.try_get(3)?;
    let owner_id: Option<String> = row.try_get(4)?;
    let order: i64 = row.try_get(5)?;
    let created_at: String = row.try_get(6)?;
    let updated_at: String = row.try_get(7)?;

    let meta: Value =
        serde_json::from_str(&meta_json).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let path = BlockPath::parse(&path).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let created_at = from_db(&created_at).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let updated_at = from_db(&updated_at).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Block {
        id,
        block_type: BlockType::from(block_type),
        meta,
        path,
        owner_id,
        order,
        created_at,
        updated_at,
    })
}
