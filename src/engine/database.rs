use crate::config::NotedConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// SQLite bootstrap for the block tree and the access registry.
///
/// This implementation uses sqlx for async database operations,
/// making it compatible with tokio runtime and safe to use across threads.
pub struct Database;

impl Database {
    /// Open the database described by `config` and initialize the schema.
    ///
    /// The path can be:
    /// - A file path like "noted.db" or "./data/noted.db"
    /// - ":memory:" for in-memory database (testing)
    pub async fn connect(config: &NotedConfig) -> Result<SqlitePool, sqlx::Error> {
        let pool = if config.is_in_memory() {
            // sqlx names each ":memory:" database uniquely and shares it across
            // the pool's connections; one connection keeps it alive and
            // avoids shared-cache table locks.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
                .await?
        } else {
            let path = std::path::Path::new(&config.database_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }

            SqlitePoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .connect_with(
                    SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal)
                        .foreign_keys(true)
                        .busy_timeout(Duration::from_secs(5)),
                )
                .await?
        };

        Self::init_schema(&pool).await?;
        log::debug!("Block database ready at {}", config.database_path);

        Ok(pool)
    }

    /// Initialize the database schema (tables and indexes).
    async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        // `path` is the materialized path; subtree scans are range queries on
        // its unique index.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS blocks (
                id TEXT PRIMARY KEY,
                block_type TEXT NOT NULL,
                meta TEXT NOT NULL,
                path TEXT NOT NULL UNIQUE,
                owner_id TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_blocks_owner ON blocks(owner_id)")
            .execute(pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS access_grants (
                id TEXT PRIMARY KEY,
                grantee_id TEXT NOT NULL,
                granted_by TEXT NOT NULL,
                root_path TEXT NOT NULL REFERENCES blocks(path) ON DELETE CASCADE,
                permission TEXT NOT NULL CHECK (permission IN ('VIEW', 'EDIT', 'OWNER')),
                is_active INTEGER NOT NULL DEFAULT 1,
                expires_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (grantee_id, root_path)
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_grants_root_path ON access_grants(root_path)")
            .execute(pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_grants_granted_by ON access_grants(granted_by)")
            .execute(pool)
            .await?;

        Ok(())
    }
}
