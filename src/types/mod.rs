//! Core data types for the workload.
//!
//! - `ClimateRecord`: One row of the `ClimateData` table
//! - `Location`: The four sampled cities
//! - `WorkloadError`: Error types for all operations
//! - `Result`: Convenient result type alias

pub mod error;
pub mod record;

pub use error::{Result, WorkloadError};
pub use record::{ClimateRecord, Location};
