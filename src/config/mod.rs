//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Connection pool settings for the relational store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long an operation waits for a free connection, in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,

    /// Create the `player` and `match` tables on connect if missing
    #[serde(default = "default_create_schema")]
    pub create_schema: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_create_schema() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
            create_schema: default_create_schema(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_database_url() -> String {
    "sqlite://tournament.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            log_level: default_log_level(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Configuration pointing at the given database URL, other settings default.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(ConfigError::ValidationError(format!(
                "database_url must be a sqlite: URL, got {:?}",
                self.database_url
            )));
        }

        if self.store.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.store.acquire_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "store.acquire_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.database_url, "sqlite://tournament.db");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.store.max_connections, 5);
        assert!(config.store.create_schema);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let config = AppConfig::with_database_url("postgres://localhost/tournament");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_connections() {
        let mut config = AppConfig::default();
        config.store.max_connections = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = AppConfig::default();
        config.store.acquire_timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "database_url = \"sqlite://swiss.db\"\n\n[store]\nmax_connections = 2\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.database_url, "sqlite://swiss.db");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.store.max_connections, 2);
        assert_eq!(config.store.acquire_timeout_seconds, 5);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/swiss.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.database_url, parsed.database_url);
    }
}
