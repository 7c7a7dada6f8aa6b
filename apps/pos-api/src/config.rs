//! # API Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_BIND_ADDR=0.0.0.0:8080                                       │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $TALLY_CONFIG, else ./tally.toml if present                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//!
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [sales]
//! max_attempts = 5
//! retry_backoff_ms = 25
//! derive_tax_from_catalog = false
//!
//! [receipt]
//! store_name = "Tally Market"
//! address_lines = ["12 Harbour Street"]
//! currency_symbol = "$"
//! lines_per_page = 60
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tally_db::DbConfig;
use tally_receipt::ReceiptOptions;
use tally_sales::SaleServiceConfig;
use thiserror::Error;
use tracing::{debug, info};

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: PathBuf::from("tally.db"),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseSettings {
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Full server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub sales: SaleServiceConfig,
    pub receipt: ReceiptOptions,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`path`, `$TALLY_CONFIG` or `./tally.toml`)
    /// 3. Environment variables
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = path.or_else(|| std::env::var_os("TALLY_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let fallback = PathBuf::from("tally.toml");
                if fallback.exists() {
                    Self::from_file(&fallback)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        info!(
            bind_addr = %config.server.bind_addr,
            db_path = %config.database.path.display(),
            max_attempts = config.sales.max_attempts,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses a TOML file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "Loading config file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup("TALLY_BIND_ADDR") {
            debug!(bind_addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(name) = lookup("TALLY_STORE_NAME") {
            self.receipt.store_name = name;
        }

        if let Some(symbol) = lookup("TALLY_CURRENCY_SYMBOL") {
            self.receipt.currency_symbol = symbol;
        }

        if let Some(attempts) = lookup("TALLY_MAX_ATTEMPTS") {
            self.sales.max_attempts =
                attempts
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "TALLY_MAX_ATTEMPTS",
                        value: attempts.clone(),
                    })?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.sales.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sales.max_attempts must be at least 1".into(),
            ));
        }
        self.receipt
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "server.bind_addr",
                value: self.server.bind_addr.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sales.max_attempts, 5);
        assert_eq!(config.receipt.lines_per_page, 60);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ApiConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/tally.db"

            [sales]
            derive_tax_from_catalog = true

            [receipt]
            store_name = "Tally Market"
            address_lines = ["12 Harbour Street"]
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/tally.db"));
        assert_eq!(config.database.max_connections, 5);
        assert!(config.sales.derive_tax_from_catalog);
        assert_eq!(config.sales.max_attempts, 5);
        assert_eq!(config.receipt.address_lines, vec!["12 Harbour Street"]);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_BIND_ADDR", "0.0.0.0:9000"),
            ("TALLY_DB_PATH", "/data/pos.db"),
            ("TALLY_MAX_ATTEMPTS", "8"),
            ("TALLY_CURRENCY_SYMBOL", "R$ "),
        ]
        .into_iter()
        .collect();

        let mut config = ApiConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.database.path, PathBuf::from("/data/pos.db"));
        assert_eq!(config.sales.max_attempts, 8);
        assert_eq!(config.receipt.currency_symbol, "R$ ");
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_overrides(|key| (key == "TALLY_MAX_ATTEMPTS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TALLY_MAX_ATTEMPTS", .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ApiConfig::default();
        config.server.bind_addr = "not an address".to_string();
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.sales.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.receipt.lines_per_page = 2;
        assert!(config.validate().is_err());
    }
}
