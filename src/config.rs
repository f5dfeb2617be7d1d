// Configuration loading and parsing (draft.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

/// Top-level assembled configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub draft: DraftConfig,
    pub websocket: WebsocketConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub trade: TradeConfig,
    pub ingest: IngestConfig,
}

/// `[draft]` — per-pick window and draft shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    /// Seconds each team has to make its pick before the auto-pick fires.
    pub pick_seconds: u64,
    /// Number of snake rounds per draft.
    pub rounds: u32,
}

/// `[websocket]` — real-time channel listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebsocketConfig {
    pub port: u16,
    /// Bounded outbound queue depth per connection. A connection that
    /// falls this far behind is dropped rather than buffered further.
    pub connection_queue: usize,
}

/// `[database]` — SQLite system of record.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

/// `[catalog]` — movie seed data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// CSV file of seed movies, imported once into an empty database.
    pub seed_csv: Option<String>,
}

/// `[trade]` — trade analyzer tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Projected-point differential beyond which a trade stops being "even".
    pub threshold: f64,
}

/// `[ingest]` — external box-office data source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the movie data API. Ingestion is disabled when empty.
    pub base_url: String,
    pub api_key: String,
    /// Minutes between catalog syncs.
    pub sync_interval_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            draft: DraftConfig::default(),
            websocket: WebsocketConfig::default(),
            database: DatabaseConfig::default(),
            catalog: CatalogConfig::default(),
            trade: TradeConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        DraftConfig {
            pick_seconds: 90,
            rounds: 15,
        }
    }
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        WebsocketConfig {
            port: 9003,
            connection_queue: 64,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: "reel-draft.db".to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig { seed_csv: None }
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        TradeConfig { threshold: 10.0 }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            base_url: String::new(),
            api_key: String::new(),
            sync_interval_minutes: 60,
        }
    }
}

impl Config {
    /// The per-pick window as a [`Duration`].
    pub fn pick_duration(&self) -> Duration {
        Duration::from_secs(self.draft.pick_seconds)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration from `path`. A missing file yields the defaults so a
/// dev instance boots without any setup; a present-but-invalid file is an
/// error.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draft.pick_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.pick_seconds".to_string(),
            message: "must be at least 1 second".to_string(),
        });
    }
    if config.draft.rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.rounds".to_string(),
            message: "must be at least 1 round".to_string(),
        });
    }
    if config.websocket.connection_queue == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.connection_queue".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if config.trade.threshold < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "trade.threshold".to_string(),
            message: "must be non-negative".to_string(),
        });
    }
    if config.ingest.sync_interval_minutes == 0 {
        return Err(ConfigError::ValidationError {
            field: "ingest.sync_interval_minutes".to_string(),
            message: "must be at least 1 minute".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.draft.pick_seconds, 90);
        assert_eq!(config.draft.rounds, 15);
        assert_eq!(config.trade.threshold, 10.0);
        assert!(config.ingest.base_url.is_empty());
        assert_eq!(config.pick_duration(), Duration::from_secs(90));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/draft.toml")).unwrap();
        assert_eq!(config.draft.rounds, 15);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let raw = r#"
            [draft]
            pick_seconds = 30
            rounds = 3

            [websocket]
            port = 4000
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.draft.pick_seconds, 30);
        assert_eq!(config.draft.rounds, 3);
        assert_eq!(config.websocket.port, 4000);
        // Untouched sections keep their defaults.
        assert_eq!(config.websocket.connection_queue, 64);
        assert_eq!(config.database.path, "reel-draft.db");
    }

    #[test]
    fn zero_pick_seconds_fails_validation() {
        let config: Config = toml::from_str("[draft]\npick_seconds = 0\n").unwrap();
        let err = validate(&config).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "draft.pick_seconds");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_rounds_fails_validation() {
        let config: Config = toml::from_str("[draft]\nrounds = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn negative_trade_threshold_fails_validation() {
        let config: Config = toml::from_str("[trade]\nthreshold = -1.0\n").unwrap();
        assert!(validate(&config).is_err());
    }
}
