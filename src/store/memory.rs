//! In-process store.
//!
//! Holds `ClimateData` rows in memory with the same statement semantics as
//! the MySQL backend. Used by tests and by `--dry-run`. Tracks open
//! connections so release on every exit path can be checked, and can inject
//! connection or statement failures.

use crate::store::{Connector, StoreConnection};
use crate::types::{ClimateRecord, Location, Result, WorkloadError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Failure injected by a `MemoryStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    /// Behave normally
    #[default]
    None,
    /// Every `connect` fails, as if the server were down
    RefuseConnections,
    /// Connections open, every statement fails
    RejectStatements,
}

/// Shared in-memory `ClimateData` table.
///
/// Clones share the same rows.
///
/// # Example
///
/// ```rust,ignore
/// let store = MemoryStore::new();
/// let mut conn = store.connect().await?;
/// conn.insert_record(&record).await?;
/// conn.close().await?;
/// assert_eq!(store.len().await, 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    rows: Mutex<Vec<ClimateRecord>>,
    open: AtomicUsize,
    opened_total: AtomicUsize,
    fault: FaultMode,
}

impl MemoryStore {
    /// Create empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty store that injects `fault`.
    pub fn with_fault(fault: FaultMode) -> Self {
        Self {
            inner: Arc::new(Shared {
                fault,
                ..Shared::default()
            }),
        }
    }

    /// Add rows directly, bypassing connections.
    pub async fn seed(&self, records: impl IntoIterator<Item = ClimateRecord>) {
        self.inner.rows.lock().await.extend(records);
    }

    /// Snapshot of every row.
    pub async fn rows(&self) -> Vec<ClimateRecord> {
        self.inner.rows.lock().await.clone()
    }

    /// Number of rows.
    pub async fn len(&self) -> usize {
        self.inner.rows.lock().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Connections currently open.
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Connections opened since creation.
    pub fn connections_opened(&self) -> usize {
        self.inner.opened_total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>> {
        if self.inner.fault == FaultMode::RefuseConnections {
            return Err(WorkloadError::connection("memory store refused connection"));
        }

        self.inner.open.fetch_add(1, Ordering::SeqCst);
        self.inner.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.inner),
        }))
    }

    fn system(&self) -> &'static str {
        "memory"
    }

    fn namespace(&self) -> &str {
        "memory"
    }
}

struct MemoryConnection {
    shared: Arc<Shared>,
}

impl MemoryConnection {
    fn check_statements(&self) -> Result<()> {
        if self.shared.fault == FaultMode::RejectStatements {
            return Err(WorkloadError::statement("memory store rejected statement"));
        }
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn insert_record(&mut self, record: &ClimateRecord) -> Result<()> {
        self.check_statements()?;
        self.shared.rows.lock().await.push(record.clone());
        Ok(())
    }

    async fn count_warmer_than(&mut self, threshold: f64) -> Result<i64> {
        self.check_statements()?;
        let rows = self.shared.rows.lock().await;
        Ok(rows.iter().filter(|r| r.temperature > threshold).count() as i64)
    }

    async fn increment_humidity(&mut self, location: Location) -> Result<u64> {
        self.check_statements()?;
        let mut rows = self.shared.rows.lock().await;
        let mut changed = 0;
        for row in rows.iter_mut().filter(|r| r.location == location) {
            row.humidity += 1.0;
            changed += 1;
        }
        Ok(changed)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(location: Location, temperature: f64, humidity: f64) -> ClimateRecord {
        ClimateRecord {
            location,
            record_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            temperature,
            precipitation: 4.2,
            humidity,
        }
    }

    #[tokio::test]
    async fn test_update_without_matching_rows_is_noop() {
        let store = MemoryStore::new();
        store.seed([record(Location::Toronto, 21.0, 50.0)]).await;

        let mut conn = store.connect().await.unwrap();
        let changed = conn.increment_humidity(Location::Ottawa).await.unwrap();
        conn.close().await.unwrap();

        assert_eq!(changed, 0);
        assert_eq!(store.rows().await, vec![record(Location::Toronto, 21.0, 50.0)]);
    }

    #[tokio::test]
    async fn test_update_bumps_humidity_by_one() {
        let store = MemoryStore::new();
        store.seed([record(Location::Ottawa, 5.0, 61.25)]).await;

        let mut conn = store.connect().await.unwrap();
        assert_eq!(conn.increment_humidity(Location::Ottawa).await.unwrap(), 1);
        conn.close().await.unwrap();

        assert_eq!(store.rows().await[0].humidity, 62.25);
    }

    #[tokio::test]
    async fn test_count_is_strictly_above_threshold() {
        let store = MemoryStore::new();
        store
            .seed([
                record(Location::Ottawa, 20.0, 40.0),
                record(Location::Montreal, 20.01, 40.0),
                record(Location::Vancouver, 34.5, 40.0),
            ])
            .await;

        let mut conn = store.connect().await.unwrap();
        let count = conn.count_warmer_than(20.0).await.unwrap();
        assert_eq!(count, 2);
        assert!(count as usize <= store.len().await);
    }

    #[tokio::test]
    async fn test_connections_released_on_drop_and_close() {
        let store = MemoryStore::new();
        let first = store.connect().await.unwrap();
        let second = store.connect().await.unwrap();
        assert_eq!(store.open_connections(), 2);

        drop(first);
        second.close().await.unwrap();
        assert_eq!(store.open_connections(), 0);
        assert_eq!(store.connections_opened(), 2);
    }

    #[tokio::test]
    async fn test_fault_modes() {
        let down = MemoryStore::with_fault(FaultMode::RefuseConnections);
        assert_eq!(down.connect().await.err().unwrap().kind(), "connection");
        assert_eq!(down.open_connections(), 0);

        let broken = MemoryStore::with_fault(FaultMode::RejectStatements);
        let mut conn = broken.connect().await.unwrap();
        let err = conn.count_warmer_than(20.0).await.unwrap_err();
        assert_eq!(err.kind(), "statement");
        drop(conn);
        assert_eq!(broken.open_connections(), 0);
    }
}
