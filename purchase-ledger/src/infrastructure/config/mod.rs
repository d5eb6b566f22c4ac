//! Configuration loading for the purchase ledger
//!
//! JSON file, every field defaulted, then environment overrides:
//! `HOST`, `PORT`, `TREASURY_BASE_URL`, `DATABASE_PATH`.

use crate::application::services::RatePolicy;
use crate::infrastructure::rate_source::{
    CircuitBreakerConfig, DEFAULT_TREASURY_BASE_URL, RetryPolicy,
};
use fx_core::CurrencyCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub rates: RatesConfig,

    #[serde(default)]
    pub rate_source: RateSourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl LedgerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST`, `PORT`, `TREASURY_BASE_URL` and `DATABASE_PATH`
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {port}")))?;
        }
        if let Some(url) = lookup("TREASURY_BASE_URL") {
            self.rate_source.base_url = url;
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            self.storage.sqlite_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates.pivot()?;
        if self.rates.lookback_months == 0 {
            return Err(ConfigError::Invalid(
                "rates.lookback_months must be at least 1".to_string(),
            ));
        }
        if self.rate_source.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "rate_source.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.rate_source.backoff_max_ms < self.rate_source.backoff_base_ms {
            return Err(ConfigError::Invalid(
                "rate_source.backoff_max_ms is below backoff_base_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Rate resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    #[serde(default = "default_pivot_currency")]
    pub pivot_currency: String,
}

fn default_lookback_months() -> u32 {
    6
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_pivot_currency() -> String {
    "USD".to_string()
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback_months(),
            cache_ttl_hours: default_cache_ttl_hours(),
            pivot_currency: default_pivot_currency(),
        }
    }
}

impl RatesConfig {
    pub fn pivot(&self) -> Result<CurrencyCode, ConfigError> {
        CurrencyCode::new(&self.pivot_currency)
            .map_err(|e| ConfigError::Invalid(format!("rates.pivot_currency: {e}")))
    }

    pub fn to_policy(&self) -> RatePolicy {
        RatePolicy {
            lookback_months: self.lookback_months,
            cache_ttl: Duration::from_secs(self.cache_ttl_hours * 60 * 60),
        }
    }
}

/// Upstream rate source and resilience settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_open_duration_secs")]
    pub open_duration_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_TREASURY_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2000
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_duration_secs() -> u64 {
    30
}

impl Default for RateSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            failure_threshold: default_failure_threshold(),
            open_duration_secs: default_open_duration_secs(),
        }
    }
}

impl RateSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
            attempt_timeout: self.timeout(),
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            open_duration: Duration::from_secs(self.open_duration_secs),
        }
    }
}

/// Storage settings. No SQLite path means in-memory storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = LedgerConfig::from_json("{}").unwrap();

        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.rates.lookback_months, 6);
        assert_eq!(config.rates.cache_ttl_hours, 24);
        assert_eq!(config.rates.pivot().unwrap(), CurrencyCode::usd());
        assert_eq!(config.rate_source.base_url, DEFAULT_TREASURY_BASE_URL);
        assert_eq!(config.rate_source.max_retries, 3);
        assert_eq!(config.rate_source.failure_threshold, 5);
        assert!(config.storage.sqlite_path.is_none());
    }

    #[test]
    fn test_parse_partial_sections() {
        let json = r#"{
            "server": { "port": 9000 },
            "rates": { "lookback_months": 3, "pivot_currency": "eur" },
            "rate_source": { "max_retries": 1, "backoff_base_ms": 50 },
            "storage": { "sqlite_path": "/var/lib/ledger.db" }
        }"#;

        let config = LedgerConfig::from_json(json).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.rates.lookback_months, 3);
        assert_eq!(config.rates.pivot().unwrap().as_str(), "EUR");
        assert_eq!(config.rate_source.max_retries, 1);
        assert_eq!(config.rate_source.backoff_max_ms, 2000);
        assert_eq!(
            config.storage.sqlite_path,
            Some(PathBuf::from("/var/lib/ledger.db"))
        );
    }

    #[test]
    fn test_derived_settings() {
        let config = LedgerConfig::default();

        let policy = config.rates.to_policy();
        assert_eq!(policy, RatePolicy::default());

        let retry = config.rate_source.retry_policy();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.backoff_base, Duration::from_millis(200));
        assert_eq!(retry.backoff_max, Duration::from_millis(2000));
        assert_eq!(retry.attempt_timeout, Duration::from_secs(10));

        let breaker = config.rate_source.breaker_config();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.open_duration, Duration::from_secs(30));

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            LedgerConfig::from_json(r#"{"rates": {"pivot_currency": "DOLLAR"}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json(r#"{"rates": {"lookback_months": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json(
                r#"{"rate_source": {"backoff_base_ms": 500, "backoff_max_ms": 100}}"#
            ),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("TREASURY_BASE_URL", "http://localhost:8081"),
            ("DATABASE_PATH", "ledger.db"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.rate_source.base_url, "http://localhost:8081");
        assert_eq!(config.storage.sqlite_path, Some(PathBuf::from("ledger.db")));
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = LedgerConfig::default();
        let result = config.apply_overrides(|name| (name == "PORT").then(|| "http".to_string()));

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 7070}}}}"#).unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 7070);

        let missing = LedgerConfig::from_file("/nonexistent/ledger.json");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
