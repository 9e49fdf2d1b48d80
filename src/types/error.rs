//! Error types for workload operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkloadError>;

/// Error type for every store, telemetry and launcher operation.
#[derive(Error, Debug)]
pub enum WorkloadError {
    /// Store unreachable or credentials rejected
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution or commit failed
    #[error("Statement failed: {0}")]
    StatementError(String),

    /// Tracing or exporter setup failed
    #[error("Telemetry error: {0}")]
    TelemetryError(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Record outside its documented ranges
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// I/O error (thread spawn)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WorkloadError {
    /// Create a connection error with context.
    ///
    /// # Arguments
    ///
    /// * `msg` - Error message
    ///
    /// # Returns
    ///
    /// `WorkloadError::ConnectionError`
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a statement error with context.
    ///
    /// # Arguments
    ///
    /// * `msg` - Error message
    ///
    /// # Returns
    ///
    /// `WorkloadError::StatementError`
    pub fn statement(msg: impl Into<String>) -> Self {
        Self::StatementError(msg.into())
    }

    /// Short, stable name of the error class.
    ///
    /// Recorded as `error.type` on spans and in task outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionError(_) => "connection",
            Self::StatementError(_) => "statement",
            Self::TelemetryError(_) => "telemetry",
            Self::ConfigError(_) => "config",
            Self::InvalidRecord(_) => "invalid_record",
            Self::IoError(_) => "io",
            Self::InternalError(_) => "internal",
        }
    }
}
