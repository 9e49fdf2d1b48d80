//! MySQL store over sqlx.
//!
//! Opens a fresh `MySqlConnection` per task; no pool. Writes run in an
//! explicit transaction that is committed before the call returns.

use crate::config::DbConfig;
use crate::store::{Connector, Statement, StoreConnection};
use crate::types::{ClimateRecord, Location, Result, WorkloadError};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;

/// Connector for the `ClimateData` table on a MySQL server.
///
/// # Example
///
/// ```rust,ignore
/// let connector = MySqlConnector::new(&DbConfig::from_env()?);
/// let mut conn = connector.connect().await?;
/// let warm = conn.count_warmer_than(20.0).await?;
/// conn.close().await?;
/// ```
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    database: String,
    address: String,
}

impl MySqlConnector {
    /// Create connector from connection settings.
    ///
    /// Does not touch the network; every `connect` call dials the server.
    pub fn new(config: &DbConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        Self {
            options,
            database: config.database.clone(),
            address: config.address(),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>> {
        let conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| {
                WorkloadError::connection(format!("{}/{}: {}", self.address, self.database, e))
            })?;

        Ok(Box::new(MySqlStoreConnection { conn }))
    }

    fn system(&self) -> &'static str {
        "mysql"
    }

    fn namespace(&self) -> &str {
        &self.database
    }

    fn address(&self) -> Option<String> {
        Some(self.address.clone())
    }
}

struct MySqlStoreConnection {
    conn: MySqlConnection,
}

#[async_trait]
impl StoreConnection for MySqlStoreConnection {
    async fn insert_record(&mut self, record: &ClimateRecord) -> Result<()> {
        let mut tx = self.conn.begin().await.map_err(statement_error)?;

        sqlx::query(Statement::InsertRecord.sql())
            .bind(record.location.as_str())
            .bind(record.record_date)
            .bind(record.temperature)
            .bind(record.precipitation)
            .bind(record.humidity)
            .execute(&mut *tx)
            .await
            .map_err(statement_error)?;

        tx.commit().await.map_err(statement_error)
    }

    async fn count_warmer_than(&mut self, threshold: f64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(Statement::CountWarmerThan.sql())
            .bind(threshold)
            .fetch_one(&mut self.conn)
            .await
            .map_err(statement_error)
    }

    async fn increment_humidity(&mut self, location: Location) -> Result<u64> {
        let mut tx = self.conn.begin().await.map_err(statement_error)?;

        let result = sqlx::query(Statement::IncrementHumidity.sql())
            .bind(location.as_str())
            .execute(&mut *tx)
            .await
            .map_err(statement_error)?;

        tx.commit().await.map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.conn
            .close()
            .await
            .map_err(|e| WorkloadError::connection(format!("close failed: {}", e)))
    }
}

fn statement_error(err: sqlx::Error) -> WorkloadError {
    WorkloadError::statement(err.to_string())
}
