//! Worker thread instrumentation.
//!
//! Worker threads are not database client operations, so their spans use
//! the INTERNAL span kind. A thread span opens when the thread starts and
//! closes when it stops.

use std::time::Duration;
use tracing::field::Empty;
use tracing::{span, Level, Span};
use uuid::Uuid;

/// Create the span covering one whole workload run.
///
/// # Arguments
///
/// * `run_id` - Identifier of the run
/// * `task_count` - Number of tasks in the plan
///
/// # Returns
///
/// Root span for the run; thread spans are created as its children
pub fn workload_span(run_id: Uuid, task_count: usize) -> Span {
    span!(
        Level::INFO,
        "workload.run",
        otel.name = "workload run",
        otel.kind = "internal",
        workload.run_id = %run_id,
        workload.task_count = task_count,
        workload.failed_tasks = Empty,
    )
}

/// Create worker thread span.
///
/// # Arguments
///
/// * `parent` - Span of the launching workload run
/// * `task` - Task kind executed by the thread
/// * `iteration` - Plan iteration the task belongs to
/// * `thread_name` - OS thread name
///
/// # Returns
///
/// Tracing span with thread attributes
///
/// # Example
///
/// ```rust,ignore
/// let span = thread_span(&run_span, "insert", 0, "insert-0");
/// let _guard = span.enter();
/// ```
pub fn thread_span(parent: &Span, task: &str, iteration: usize, thread_name: &str) -> Span {
    span!(
        parent: parent,
        Level::INFO,
        "thread.run",
        otel.name = format!("thread {}", thread_name),
        otel.kind = "internal",
        otel.status_code = Empty,
        thread.name = thread_name,
        task.kind = task,
        task.iteration = iteration,
        task.status = Empty,
        task.duration_ms = Empty,
        error.type = Empty,
    )
}

/// Record how a worker thread ended.
///
/// # Arguments
///
/// * `span` - Thread span
/// * `status` - `"succeeded"`, `"failed"` or `"panicked"`
/// * `error_type` - Error class when the task failed
/// * `duration` - Time the task ran
pub fn record_thread_outcome(
    span: &Span,
    status: &str,
    error_type: Option<&str>,
    duration: Duration,
) {
    span.record("task.status", status);
    span.record("task.duration_ms", duration.as_millis() as u64);
    match error_type {
        Some(kind) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.type", kind);
        }
        None => {
            span.record("otel.status_code", "OK");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_span_is_child_of_run() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let run = workload_span(Uuid::new_v4(), 15);
            let thread = thread_span(&run, "insert", 0, "insert-0");
            assert_eq!(thread.metadata().unwrap().name(), "thread.run");
            record_thread_outcome(&thread, "succeeded", None, Duration::from_millis(12));
        });
    }
}
