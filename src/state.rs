use crate::config::NotedConfig;
use crate::engine::{AccessRegistry, BlockStore, Database, RequestContext};
use crate::permissions::PermissionEvaluator;
use crate::validators::ValidatorRegistry;
use sqlx::SqlitePool;

/// State shared by every command.
///
/// Holds cloned pool handles and immutable registries only, so one instance
/// can serve any number of concurrent requests.
#[derive(Debug)]
pub struct AppState {
    pub config: NotedConfig,
    pub blocks: BlockStore,
    pub access: AccessRegistry,
    pub evaluator: PermissionEvaluator,
    pub validators: ValidatorRegistry,
}

impl AppState {
    /// Open the configured database and wire up the components.
    pub async fn open(config: NotedConfig) -> Result<Self, sqlx::Error> {
        let pool = Database::connect(&config).await?;
        Ok(Self::with_pool(config, pool))
    }

    pub fn with_pool(config: NotedConfig, pool: SqlitePool) -> Self {
        let blocks = BlockStore::new(pool.clone());
        let access = AccessRegistry::new(pool);
        let evaluator = PermissionEvaluator::new(blocks.clone(), access.clone());

        Self {
            config,
            blocks,
            access,
            evaluator,
            validators: ValidatorRegistry::new(),
        }
    }

    /// A fresh request context carrying the configured default timeout.
    pub fn context(&self) -> RequestContext {
        RequestContext::new().with_optional_timeout(self.config.query_timeout())
    }
}
