//! Connection and telemetry configuration.
//!
//! Every value has a fixed default and can be overridden from the
//! environment (`DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`).

use crate::types::error::{Result, WorkloadError};
use std::fmt;

pub const DEFAULT_DB_HOST: &str = "127.0.0.1";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_PASSWORD: &str = "Secret5555";
pub const DEFAULT_DB_NAME: &str = "project_db";

pub const DEFAULT_SERVICE_NAME: &str = "climate-test";
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// MySQL connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// Database (schema) holding `ClimateData`
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            database: DEFAULT_DB_NAME.to_string(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl DbConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::ConfigError` if `DB_PORT` is not a valid port
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Missing variables fall back to the defaults.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of a variable, if set
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::ConfigError` if `DB_PORT` is not a valid port
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                WorkloadError::ConfigError(format!("Invalid DB_PORT '{}': {}", raw, e))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port,
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
            database: lookup("DB_NAME").unwrap_or(defaults.database),
        })
    }

    /// `host:port`, used as `server.address` on spans.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log line format for the fmt layer. Log lines are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging and trace export settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute
    pub service_name: String,
    /// OTLP/gRPC collector endpoint; `None` disables export
    pub otlp_endpoint: Option<String>,
    /// `EnvFilter` directives for log output and exported spans
    pub log_filter: String,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            otlp_endpoint: Some(DEFAULT_OTLP_ENDPOINT.to_string()),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Configuration with OTLP export turned off (logs only).
    pub fn logs_only() -> Self {
        Self {
            otlp_endpoint: None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = DbConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DbConfig::default());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.user, "root");
        assert_eq!(config.database, "project_db");
        assert_eq!(config.address(), "127.0.0.1:3306");
    }

    #[test]
    fn test_environment_overrides() {
        let config = DbConfig::from_lookup(lookup_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_USER", "loader"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_NAME", "climate"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.user, "loader");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.database, "climate");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = DbConfig::from_lookup(lookup_from(&[("DB_PORT", "mysql")])).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", DbConfig::default());
        assert!(!rendered.contains(DEFAULT_DB_PASSWORD));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_logs_only_disables_export() {
        assert!(TelemetryConfig::default().otlp_endpoint.is_some());
        assert!(TelemetryConfig::logs_only().otlp_endpoint.is_none());
    }
}
