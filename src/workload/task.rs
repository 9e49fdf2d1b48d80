//! Insert, select and update task bodies.
//!
//! Each task opens its own connection, runs one statement and closes the
//! connection. On an error the connection is dropped on the way out, which
//! releases it and rolls back anything uncommitted.

use crate::store::Connector;
use crate::types::{ClimateRecord, Location, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Select tasks count records strictly warmer than this, in °C.
pub const WARM_THRESHOLD_CELSIUS: f64 = 20.0;

/// Update tasks bump humidity at this location.
pub const UPDATE_LOCATION: Location = Location::Ottawa;

/// Kind of unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Insert,
    Select,
    Update,
}

impl TaskKind {
    /// One of each, in launch order.
    pub const ALL: [TaskKind; 3] = [TaskKind::Insert, TaskKind::Select, TaskKind::Update];

    /// Lowercase name, used for thread names and span attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful task produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Record written by an insert task
    Inserted { record: ClimateRecord },
    /// Count read by a select task
    Counted { warm_records: i64 },
    /// Rows changed by an update task
    Updated { rows_affected: u64 },
}

/// Run one task against a fresh connection.
///
/// # Arguments
///
/// * `kind` - Task to run
/// * `connector` - Source of the task's connection
///
/// # Errors
///
/// Connection and statement errors from the store, unchanged
pub async fn run_task(kind: TaskKind, connector: &dyn Connector) -> Result<TaskOutput> {
    match kind {
        TaskKind::Insert => insert_record(connector)
            .await
            .map(|record| TaskOutput::Inserted { record }),
        TaskKind::Select => select_records(connector)
            .await
            .map(|warm_records| TaskOutput::Counted { warm_records }),
        TaskKind::Update => update_records(connector)
            .await
            .map(|rows_affected| TaskOutput::Updated { rows_affected }),
    }
}

/// Insert one randomly sampled record and commit.
pub async fn insert_record(connector: &dyn Connector) -> Result<ClimateRecord> {
    let today = Local::now().date_naive();
    let record = ClimateRecord::sample(&mut rand::thread_rng(), today);

    let mut conn = connector.connect().await?;
    conn.insert_record(&record).await?;
    conn.close().await?;

    debug!(
        location = %record.location,
        record_date = %record.record_date,
        temperature = record.temperature,
        "Inserted climate record"
    );
    Ok(record)
}

/// Count records warmer than 20°C and log the count.
pub async fn select_records(connector: &dyn Connector) -> Result<i64> {
    let mut conn = connector.connect().await?;
    let count = conn.count_warmer_than(WARM_THRESHOLD_CELSIUS).await?;

    info!(
        warm_records = count,
        threshold = WARM_THRESHOLD_CELSIUS,
        "Records with temperature > 20°C: {}",
        count
    );

    conn.close().await?;
    Ok(count)
}

/// Add 1 to humidity of every Ottawa record and commit.
pub async fn update_records(connector: &dyn Connector) -> Result<u64> {
    let mut conn = connector.connect().await?;
    let changed = conn.increment_humidity(UPDATE_LOCATION).await?;
    conn.close().await?;

    debug!(location = %UPDATE_LOCATION, rows_affected = changed, "Updated humidity");
    Ok(changed)
}
