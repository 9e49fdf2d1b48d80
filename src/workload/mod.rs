//! Concurrent workload: task bodies and the thread-per-task launcher.

pub mod launcher;
pub mod task;

pub use launcher::{TaskOutcome, TaskSpec, TaskStatus, WorkloadPlan, WorkloadReport, WorkloadRunner};
pub use task::{run_task, TaskKind, TaskOutput, UPDATE_LOCATION, WARM_THRESHOLD_CELSIUS};
