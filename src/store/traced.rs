//! Tracing wrapper for any connector.
//!
//! Every connect, statement and close runs inside a `db` client span with
//! the statement text, row counts and outcome recorded on it. The wrapped
//! store never sees the spans.

use crate::otel::{db_query_span, db_span, record_db_metrics, record_db_outcome, DbOperation};
use crate::store::{Connector, Statement, StoreConnection, CLIMATE_TABLE};
use crate::types::{ClimateRecord, Location, Result};
use async_trait::async_trait;
use tracing::{Instrument, Span};

/// Connector that traces everything done through it.
///
/// # Example
///
/// ```rust,ignore
/// let connector = TracedConnector::new(MySqlConnector::new(&config));
/// let mut conn = connector.connect().await?;   // "connect" span
/// conn.insert_record(&record).await?;          // "INSERT ClimateData" span
/// conn.close().await?;                         // "close" span
/// ```
#[derive(Debug, Clone)]
pub struct TracedConnector<C> {
    inner: C,
}

impl<C: Connector> TracedConnector<C> {
    /// Wrap a connector.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped connector.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn span(&self, operation: DbOperation) -> Span {
        let span = db_span(
            operation,
            self.inner.system(),
            None,
            Some(self.inner.namespace()),
        );
        if let Some(address) = self.inner.address() {
            span.record("server.address", address.as_str());
        }
        span
    }
}

#[async_trait]
impl<C: Connector> Connector for TracedConnector<C> {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>> {
        let span = self.span(DbOperation::Connect);
        let result = self.inner.connect().instrument(span.clone()).await;
        record_db_outcome(&span, &result);

        Ok(Box::new(TracedConnection {
            inner: result?,
            system: self.inner.system(),
            namespace: self.inner.namespace().to_string(),
            address: self.inner.address(),
        }))
    }

    fn system(&self) -> &'static str {
        self.inner.system()
    }

    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn address(&self) -> Option<String> {
        self.inner.address()
    }
}

struct TracedConnection {
    inner: Box<dyn StoreConnection>,
    system: &'static str,
    namespace: String,
    address: Option<String>,
}

impl TracedConnection {
    fn statement_span(&self, statement: Statement) -> Span {
        let span = db_query_span(
            statement.operation(),
            statement.sql(),
            self.system,
            CLIMATE_TABLE,
            Some(&self.namespace),
        );
        if let Some(address) = &self.address {
            span.record("server.address", address.as_str());
        }
        span
    }
}

#[async_trait]
impl StoreConnection for TracedConnection {
    async fn insert_record(&mut self, record: &ClimateRecord) -> Result<()> {
        let span = self.statement_span(Statement::InsertRecord);
        let result = self.inner.insert_record(record).instrument(span.clone()).await;
        if result.is_ok() {
            record_db_metrics(&span, None, Some(1));
        }
        record_db_outcome(&span, &result);
        result
    }

    async fn count_warmer_than(&mut self, threshold: f64) -> Result<i64> {
        let span = self.statement_span(Statement::CountWarmerThan);
        let result = self.inner.count_warmer_than(threshold).instrument(span.clone()).await;
        if result.is_ok() {
            record_db_metrics(&span, Some(1), None);
        }
        record_db_outcome(&span, &result);
        result
    }

    async fn increment_humidity(&mut self, location: Location) -> Result<u64> {
        let span = self.statement_span(Statement::IncrementHumidity);
        let result = self.inner.increment_humidity(location).instrument(span.clone()).await;
        if let Ok(changed) = &result {
            record_db_metrics(&span, None, Some(*changed));
        }
        record_db_outcome(&span, &result);
        result
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let TracedConnection {
            inner,
            system,
            namespace,
            address,
        } = *self;

        let span = db_span(DbOperation::Close, system, None, Some(&namespace));
        if let Some(address) = &address {
            span.record("server.address", address.as_str());
        }

        let result = inner.close().instrument(span.clone()).await;
        record_db_outcome(&span, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FaultMode, MemoryStore};
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects `db.operation.name` of every new span.
    #[derive(Clone, Default)]
    struct OperationRecorder {
        operations: Arc<Mutex<Vec<String>>>,
    }

    struct OperationVisitor<'a>(&'a mut Vec<String>);

    impl Visit for OperationVisitor<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "db.operation.name" {
                self.0.push(value.to_string());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for OperationRecorder {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut operations = self.operations.lock().unwrap();
            attrs.record(&mut OperationVisitor(&mut operations));
        }
    }

    fn sample_record() -> ClimateRecord {
        ClimateRecord {
            location: Location::Ottawa,
            record_date: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            temperature: 22.4,
            precipitation: 0.0,
            humidity: 70.0,
        }
    }

    #[tokio::test]
    async fn test_spans_for_connect_statements_and_close() {
        let recorder = OperationRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let store = MemoryStore::new();
        let connector = TracedConnector::new(store.clone());
        let mut conn = connector.connect().await.unwrap();
        conn.insert_record(&sample_record()).await.unwrap();
        assert_eq!(conn.count_warmer_than(20.0).await.unwrap(), 1);
        assert_eq!(conn.increment_humidity(Location::Ottawa).await.unwrap(), 1);
        conn.close().await.unwrap();

        let operations = recorder.operations.lock().unwrap().clone();
        assert_eq!(operations, vec!["connect", "INSERT", "SELECT", "UPDATE", "close"]);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_failures_pass_through_unchanged() {
        let connector = TracedConnector::new(MemoryStore::with_fault(FaultMode::RejectStatements));
        let mut conn = connector.connect().await.unwrap();
        let err = conn.insert_record(&sample_record()).await.unwrap_err();
        assert_eq!(err.kind(), "statement");

        let refused = TracedConnector::new(MemoryStore::with_fault(FaultMode::RefuseConnections));
        assert_eq!(refused.connect().await.err().unwrap().kind(), "connection");
        assert_eq!(refused.system(), "memory");
    }
}
