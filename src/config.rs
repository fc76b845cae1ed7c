/// Configuration management for the Noted block core
///
/// Configuration is stored at: `$USER_HOME/.noted/config.json`
/// and can be redirected with the `NOTED_CONFIG_PATH` environment variable.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "NOTED_CONFIG_PATH";

/// Database path meaning "private in-memory database".
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to get user home directory")]
    NoHomeDir,

    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotedConfig {
    /// SQLite database file, or ":memory:".
    pub database_path: String,

    /// Upper bound on pooled connections. In-memory databases always use one.
    pub max_connections: u32,

    /// Default per-operation timeout applied by `AppState::context`.
    /// Zero disables the timeout.
    pub query_timeout_ms: u64,
}

impl Default for NotedConfig {
    fn default() -> Self {
        let database_path = dirs::home_dir()
            .map(|home| home.join(".noted").join("noted.db"))
            .unwrap_or_else(|| PathBuf::from("noted.db"))
            .to_string_lossy()
            .into_owned();

        Self {
            database_path,
            max_connections: 5,
            query_timeout_ms: 5_000,
        }
    }
}

impl NotedConfig {
    pub fn in_memory() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_ms > 0).then(|| Duration::from_millis(self.query_timeout_ms))
    }
}

/// Get the path to the config file
///
/// Returns: `$USER_HOME/.noted/config.json`
/// Respects `NOTED_CONFIG_PATH` environment variable.
fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home_dir.join(".noted").join("config.json"))
}

/// Load configuration from disk
///
/// If the config file doesn't exist, creates a new one with default values.
pub fn load_config() -> Result<NotedConfig, ConfigError> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let config: NotedConfig = serde_json::from_str(&content)?;
        Ok(config)
    } else {
        let config = NotedConfig::default();
        save_config(&config)?;
        log::info!("Created default config at {}", config_path.display());
        Ok(config)
    }
}

/// Save configuration to disk
///
/// Creates the parent directory if it doesn't exist.
pub fn save_config(config: &NotedConfig) -> Result<(), ConfigError> {
    let config_path = get_config_path()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)?;

    Ok(())
}
