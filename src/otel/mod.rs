//! OpenTelemetry instrumentation for the workload.
//!
//! Follows OpenTelemetry semantic conventions for database client spans:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//!
//! # Database Semantic Conventions
//!
//! **Span naming**: `{db.operation.name} {target}`
//! - Example: `INSERT ClimateData`, `SELECT ClimateData`, `connect`
//!
//! **Required attributes**:
//! - `db.system.name`: `"mysql"` (or `"memory"` for the in-process store)
//!
//! **Conditionally required**:
//! - `db.collection.name`: Table name (`ClimateData`)
//! - `db.namespace`: Database name
//! - `db.operation.name`: `INSERT`, `SELECT`, `UPDATE`, `connect`, `close`
//!
//! **Recommended**:
//! - `db.query.text`: Parameterized statement text
//! - `server.address`: `host:port` of the store
//!
//! # Thread Conventions
//!
//! Every worker thread runs inside an `INTERNAL` span that opens when the
//! thread starts and closes when it stops, with `thread.name`, `task.kind`
//! and `task.status` attributes.
//!
//! # Example
//!
//! ```rust,ignore
//! use climate_load::otel::{db_span, DbOperation};
//!
//! let span = db_span(DbOperation::Connect, "mysql", None, Some("project_db"));
//! let conn = connect().instrument(span.clone()).await;
//! record_db_outcome(&span, &conn);
//! ```

pub mod db;
pub mod telemetry;
pub mod thread;

pub use db::{db_query_span, db_span, record_db_metrics, record_db_outcome, DbOperation};
pub use telemetry::Telemetry;
pub use thread::{record_thread_outcome, thread_span, workload_span};
