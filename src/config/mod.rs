//! Layered application configuration.
//!
//! Loaded via the `config` crate from `config/default.toml`, an optional
//! `config/local.toml` override, and `APP_`-prefixed environment variables,
//! in that order — the same layering the teacher's `ConfigManager` uses.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::errors::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://kodit.db".to_string(),
            max_connections: 10,
            busy_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Worker runtime tuning. `poll_interval_ms` is the sleep between empty
/// polls described in spec §4.4 ("default short — on the order of hundreds
/// of milliseconds").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub poll_interval_ms: u64,
    pub worker_count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            worker_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let defaults = AppConfig::default();
        let builder = config::Config::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("database.busy_timeout_seconds", defaults.database.busy_timeout_seconds)?
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("worker.poll_interval_ms", defaults.worker.poll_interval_ms as i64)?
            .set_default("worker.worker_count", defaults.worker.worker_count as i64)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", "compact")?
            .set_default("environment", "development")?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database.url.is_empty() {
            return Err(config::ConfigError::Message("database.url must not be empty".into()).into());
        }
        if self.server.port == 0 {
            return Err(config::ConfigError::Message("server.port must be nonzero".into()).into());
        }
        if self.worker.worker_count == 0 {
            return Err(config::ConfigError::Message("worker.worker_count must be nonzero".into()).into());
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Thin wrapper matching the teacher's `ConfigManager`, giving call sites
/// `Deref<Target = AppConfig>` ergonomics.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AppConfig,
}

impl ConfigManager {
    pub fn new() -> AppResult<Self> {
        let config = AppConfig::from_env()?;
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }
}

impl Deref for ConfigManager {
    type Target = AppConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_address_combines_host_and_port() {
        let config = AppConfig::default();
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }
}
