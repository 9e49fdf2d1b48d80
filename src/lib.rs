//! climate-load - concurrent ClimateData workload runner
//!
//! Exercises a MySQL `ClimateData` table with concurrent, uncoordinated
//! worker threads:
//! - Insert tasks add one randomly sampled record each
//! - Select tasks count records warmer than 20°C
//! - Update tasks bump humidity for every Ottawa record
//!
//! Every store call and every worker thread is traced through `tracing`
//! spans that are exported over OTLP when telemetry is enabled.

pub mod types;
pub mod config;
pub mod store;
pub mod otel;
pub mod workload;

pub use config::{DbConfig, LogFormat, TelemetryConfig};
pub use otel::Telemetry;
pub use store::{Connector, StoreConnection};
pub use types::{ClimateRecord, Location, Result, WorkloadError};
pub use workload::{TaskKind, TaskOutcome, WorkloadPlan, WorkloadReport, WorkloadRunner};
