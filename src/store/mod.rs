//! Store access for workload tasks.
//!
//! A `Connector` hands out one independent `StoreConnection` per call;
//! tasks never share connections. Implementations:
//! - `MySqlConnector`: the real `ClimateData` table over sqlx
//! - `MemoryStore`: in-process table with the same statement semantics
//! - `TracedConnector`: wraps any connector with database spans

pub mod memory;
pub mod mysql;
pub mod traced;

pub use memory::{FaultMode, MemoryStore};
pub use mysql::MySqlConnector;
pub use traced::TracedConnector;

use crate::otel::DbOperation;
use crate::types::{ClimateRecord, Location, Result};
use async_trait::async_trait;

/// Table every statement targets.
pub const CLIMATE_TABLE: &str = "ClimateData";

/// The fixed statement set executed by workload tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    /// Insert one record
    InsertRecord,
    /// Count records above a temperature
    CountWarmerThan,
    /// Add 1 to humidity for one location
    IncrementHumidity,
}

impl Statement {
    /// Parameterized SQL text (MySQL placeholders).
    pub fn sql(&self) -> &'static str {
        match self {
            Self::InsertRecord => {
                "INSERT INTO ClimateData (location, record_date, temperature, precipitation, humidity) \
                 VALUES (?, ?, ?, ?, ?)"
            }
            Self::CountWarmerThan => "SELECT COUNT(*) FROM ClimateData WHERE temperature > ?",
            Self::IncrementHumidity => {
                "UPDATE ClimateData SET humidity = humidity + 1 WHERE location = ?"
            }
        }
    }

    /// Operation name recorded on spans.
    pub fn operation(&self) -> DbOperation {
        match self {
            Self::InsertRecord => DbOperation::Insert,
            Self::CountWarmerThan => DbOperation::Select,
            Self::IncrementHumidity => DbOperation::Update,
        }
    }
}

/// Factory for independent store connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::ConnectionError` if the store is unreachable
    /// or rejects the credentials
    async fn connect(&self) -> Result<Box<dyn StoreConnection>>;

    /// Store kind, recorded as `db.system.name`.
    fn system(&self) -> &'static str;

    /// Database name, recorded as `db.namespace`.
    fn namespace(&self) -> &str;

    /// Server address, recorded as `server.address` when known.
    fn address(&self) -> Option<String> {
        None
    }
}

/// One open connection, owned by exactly one task.
///
/// Dropping a connection releases it; writes not yet committed are rolled
/// back. `close` is the orderly path.
#[async_trait]
pub trait StoreConnection: Send {
    /// Insert one record and commit.
    async fn insert_record(&mut self, record: &ClimateRecord) -> Result<()>;

    /// Count records with `temperature > threshold`.
    async fn count_warmer_than(&mut self, threshold: f64) -> Result<i64>;

    /// Add 1 to `humidity` of every record at `location` and commit.
    ///
    /// # Returns
    ///
    /// Number of rows changed
    async fn increment_humidity(&mut self, location: Location) -> Result<u64>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_target_climate_table() {
        for statement in [
            Statement::InsertRecord,
            Statement::CountWarmerThan,
            Statement::IncrementHumidity,
        ] {
            assert!(statement.sql().contains(CLIMATE_TABLE));
        }
    }

    #[test]
    fn test_insert_binds_every_column() {
        assert_eq!(Statement::InsertRecord.sql().matches('?').count(), 5);
        assert_eq!(Statement::CountWarmerThan.operation(), DbOperation::Select);
    }
}
