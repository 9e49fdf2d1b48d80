//! Workload launcher.
//!
//! Starts every task of a plan on its own OS thread, waits for all of them
//! (join-barrier), then collects their outcomes from a result channel into
//! a `WorkloadReport`. Tasks are never cancelled and never time out; one
//! task failing or panicking does not affect the others.

use crate::otel::{record_thread_outcome, thread_span, workload_span};
use crate::store::Connector;
use crate::types::{Result, WorkloadError};
use crate::workload::task::{run_task, TaskKind, TaskOutput};
use crossbeam::channel::{self, Sender};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn, Dispatch, Span};
use uuid::Uuid;

/// One task of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskSpec {
    /// Task to run
    pub kind: TaskKind,
    /// Plan iteration the task belongs to
    pub iteration: usize,
}

impl TaskSpec {
    /// OS thread name, e.g. `insert-0`.
    pub fn thread_name(&self) -> String {
        format!("{}-{}", self.kind.as_str(), self.iteration)
    }
}

/// Ordered list of tasks launched together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadPlan {
    tasks: Vec<TaskSpec>,
}

impl WorkloadPlan {
    /// Iterations of the standard plan.
    pub const STANDARD_ITERATIONS: usize = 5;

    /// Five repetitions of insert, select, update (15 tasks).
    pub fn standard() -> Self {
        Self::repeat(Self::STANDARD_ITERATIONS, &TaskKind::ALL)
    }

    /// `iterations` repetitions of `kinds`, iteration-major.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// // Five concurrent inserts
    /// let plan = WorkloadPlan::repeat(5, &[TaskKind::Insert]);
    /// ```
    pub fn repeat(iterations: usize, kinds: &[TaskKind]) -> Self {
        let tasks = (0..iterations)
            .flat_map(|iteration| kinds.iter().map(move |&kind| TaskSpec { kind, iteration }))
            .collect();
        Self { tasks }
    }

    /// Tasks in launch order.
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks of one kind.
    pub fn count(&self, kind: TaskKind) -> usize {
        self.tasks.iter().filter(|spec| spec.kind == kind).count()
    }
}

impl Default for WorkloadPlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task finished normally
    Succeeded { output: TaskOutput },
    /// Task returned an error
    Failed { error_type: String, message: String },
    /// Worker thread panicked
    Panicked { message: String },
}

/// Result of one task, as collected by the launcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    pub iteration: usize,
    pub thread: String,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl TaskOutcome {
    fn new(spec: TaskSpec, elapsed: Duration, status: TaskStatus) -> Self {
        Self {
            kind: spec.kind,
            iteration: spec.iteration,
            thread: spec.thread_name(),
            elapsed_ms: elapsed.as_millis() as u64,
            status,
        }
    }

    fn from_result(spec: TaskSpec, elapsed: Duration, result: Result<TaskOutput>) -> Self {
        let status = match result {
            Ok(output) => TaskStatus::Succeeded { output },
            Err(err) => TaskStatus::Failed {
                error_type: err.kind().to_string(),
                message: err.to_string(),
            },
        };
        Self::new(spec, elapsed, status)
    }

    /// Whether the task succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded { .. })
    }

    /// `"succeeded"`, `"failed"` or `"panicked"`.
    pub fn status_str(&self) -> &'static str {
        match self.status {
            TaskStatus::Succeeded { .. } => "succeeded",
            TaskStatus::Failed { .. } => "failed",
            TaskStatus::Panicked { .. } => "panicked",
        }
    }

    /// Error class of a failed or panicked task.
    pub fn error_type(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Succeeded { .. } => None,
            TaskStatus::Failed { error_type, .. } => Some(error_type),
            TaskStatus::Panicked { .. } => Some("panic"),
        }
    }

    /// Output of a successful task.
    pub fn output(&self) -> Option<&TaskOutput> {
        match &self.status {
            TaskStatus::Succeeded { output } => Some(output),
            _ => None,
        }
    }
}

/// Outcomes of one workload run, in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub run_id: Uuid,
    pub elapsed_ms: u64,
    pub outcomes: Vec<TaskOutcome>,
}

impl WorkloadReport {
    /// Number of tasks that succeeded.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Tasks that failed or panicked.
    pub fn failed(&self) -> Vec<&TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    /// Whether every task succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_success)
    }

    /// Rows added by successful insert tasks.
    pub fn rows_inserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.output(), Some(TaskOutput::Inserted { .. })))
            .count()
    }
}

/// Runs a workload plan with one thread per task.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = tokio::runtime::Runtime::new()?;
/// let runner = WorkloadRunner::new(MemoryStore::new(), tracing::Dispatch::none());
/// let report = runner.run(runtime.handle());
/// assert_eq!(report.outcomes.len(), 15);
/// ```
pub struct WorkloadRunner {
    connector: Arc<dyn Connector>,
    plan: WorkloadPlan,
    dispatch: Dispatch,
}

impl WorkloadRunner {
    /// Create runner for the standard plan.
    ///
    /// # Arguments
    ///
    /// * `connector` - Source of per-task connections
    /// * `dispatch` - Subscriber installed on the launcher and every worker
    pub fn new<C: Connector + 'static>(connector: C, dispatch: Dispatch) -> Self {
        Self {
            connector: Arc::new(connector),
            plan: WorkloadPlan::standard(),
            dispatch,
        }
    }

    /// Replace the plan.
    pub fn with_plan(mut self, plan: WorkloadPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Plan this runner launches.
    pub fn plan(&self) -> &WorkloadPlan {
        &self.plan
    }

    /// Launch every task, wait for all of them, and report.
    ///
    /// Must not be called from a runtime worker thread: workers drive their
    /// tasks with `Handle::block_on`.
    ///
    /// # Arguments
    ///
    /// * `runtime` - Runtime providing the I/O driver for store calls
    ///
    /// # Returns
    ///
    /// One outcome per task of the plan, in plan order
    pub fn run(&self, runtime: &Handle) -> WorkloadReport {
        tracing::dispatcher::with_default(&self.dispatch, || self.run_with_dispatch(runtime))
    }

    fn run_with_dispatch(&self, runtime: &Handle) -> WorkloadReport {
        let run_id = Uuid::new_v4();
        let run_span = workload_span(run_id, self.plan.len());
        let _entered = run_span.enter();
        let started = Instant::now();

        info!(run_id = %run_id, tasks = self.plan.len(), "Starting workload");

        let (results_tx, results_rx) = channel::unbounded();
        let mut workers = Vec::with_capacity(self.plan.len());
        let mut outcomes = Vec::with_capacity(self.plan.len());

        for &spec in self.plan.tasks() {
            match self.spawn_worker(spec, runtime, &run_span, results_tx.clone()) {
                Ok(handle) => workers.push((spec, Instant::now(), handle)),
                Err(err) => {
                    warn!(thread = %spec.thread_name(), error = %err, "Failed to spawn worker");
                    outcomes.push(TaskOutcome::from_result(spec, Duration::ZERO, Err(err)));
                }
            }
        }
        drop(results_tx);

        // Join-barrier: every worker has returned or unwound past this loop.
        // Task panics are caught on the worker; this only sees panics outside
        // the task body.
        for (spec, launched, handle) in workers {
            if let Err(payload) = handle.join() {
                let message = panic_message(payload.as_ref());
                error!(thread = %spec.thread_name(), panic = %message, "Worker panicked");
                outcomes.push(TaskOutcome::new(
                    spec,
                    launched.elapsed(),
                    TaskStatus::Panicked { message },
                ));
            }
        }
        outcomes.extend(results_rx.iter());
        outcomes.sort_by_key(|o| (o.iteration, o.kind));

        let report = WorkloadReport {
            run_id,
            elapsed_ms: started.elapsed().as_millis() as u64,
            outcomes,
        };

        let failed = report.outcomes.len() - report.succeeded();
        run_span.record("workload.failed_tasks", failed);
        info!(
            succeeded = report.succeeded(),
            failed,
            rows_inserted = report.rows_inserted(),
            elapsed_ms = report.elapsed_ms,
            "Workload finished"
        );

        report
    }

    fn spawn_worker(
        &self,
        spec: TaskSpec,
        runtime: &Handle,
        parent: &Span,
        results: Sender<TaskOutcome>,
    ) -> Result<JoinHandle<()>> {
        let connector = Arc::clone(&self.connector);
        let dispatch = self.dispatch.clone();
        let runtime = runtime.clone();
        let parent = parent.clone();
        let thread_name = spec.thread_name();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    let span = thread_span(&parent, spec.kind.as_str(), spec.iteration, &thread_name);
                    let _entered = span.enter();
                    debug!("Worker thread started");

                    let started = Instant::now();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        runtime.block_on(run_task(spec.kind, connector.as_ref()))
                    }));
                    let elapsed = started.elapsed();

                    let outcome = match result {
                        Ok(result) => {
                            if let Err(err) = &result {
                                warn!(error.type = err.kind(), error = %err, "Task failed");
                            }
                            TaskOutcome::from_result(spec, elapsed, result)
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            error!(panic = %message, "Task panicked");
                            TaskOutcome::new(spec, elapsed, TaskStatus::Panicked { message })
                        }
                    };
                    record_thread_outcome(&span, outcome.status_str(), outcome.error_type(), elapsed);
                    debug!(status = outcome.status_str(), "Worker thread finished");

                    if results.send(outcome).is_err() {
                        warn!("Result channel closed, outcome dropped");
                    }
                })
            })
            .map_err(WorkloadError::from)?;

        Ok(handle)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConnection;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::span::{Id, Record};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    struct PanickingConnector;

    /// Collects `task.status` and `otel.status_code` values recorded on spans.
    #[derive(Clone, Default)]
    struct StatusRecorder {
        task_status: Arc<Mutex<Vec<String>>>,
        status_code: Arc<Mutex<Vec<String>>>,
    }

    impl Visit for StatusRecorder {
        fn record_str(&mut self, field: &Field, value: &str) {
            match field.name() {
                "task.status" => self.task_status.lock().unwrap().push(value.to_string()),
                "otel.status_code" => self.status_code.lock().unwrap().push(value.to_string()),
                _ => {}
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for StatusRecorder {
        fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
            values.record(&mut self.clone());
        }
    }

    #[async_trait]
    impl Connector for PanickingConnector {
        async fn connect(&self) -> Result<Box<dyn StoreConnection>> {
            panic!("driver bug");
        }

        fn system(&self) -> &'static str {
            "test"
        }

        fn namespace(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_standard_plan_shape() {
        let plan = WorkloadPlan::standard();
        assert_eq!(plan.len(), 15);
        for kind in TaskKind::ALL {
            assert_eq!(plan.count(kind), 5);
        }

        let first: Vec<TaskKind> = plan.tasks()[..3].iter().map(|s| s.kind).collect();
        assert_eq!(first, TaskKind::ALL.to_vec());
        assert_eq!(plan.tasks()[14], TaskSpec { kind: TaskKind::Update, iteration: 4 });
    }

    #[test]
    fn test_thread_names() {
        let spec = TaskSpec { kind: TaskKind::Select, iteration: 3 };
        assert_eq!(spec.thread_name(), "select-3");
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(payload.as_ref()), "kaboom");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_panicking_workers_are_reported() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let runner = WorkloadRunner::new(PanickingConnector, Dispatch::none())
            .with_plan(WorkloadPlan::repeat(2, &TaskKind::ALL));

        let report = runner.run(runtime.handle());

        assert_eq!(report.outcomes.len(), 6);
        assert!(!report.is_success());
        for outcome in &report.outcomes {
            assert_eq!(
                outcome.status,
                TaskStatus::Panicked { message: "driver bug".to_string() }
            );
            assert_eq!(outcome.error_type(), Some("panic"));
        }
    }

    #[test]
    fn test_panicking_worker_span_gets_outcome() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let recorder = StatusRecorder::default();
        let dispatch = Dispatch::new(tracing_subscriber::registry().with(recorder.clone()));
        let runner = WorkloadRunner::new(PanickingConnector, dispatch)
            .with_plan(WorkloadPlan::repeat(1, &[TaskKind::Insert]));

        let report = runner.run(runtime.handle());

        assert_eq!(report.outcomes[0].status_str(), "panicked");
        assert_eq!(*recorder.task_status.lock().unwrap(), vec!["panicked".to_string()]);
        assert_eq!(*recorder.status_code.lock().unwrap(), vec!["ERROR".to_string()]);
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let spec = TaskSpec { kind: TaskKind::Select, iteration: 0 };
        let outcome = TaskOutcome::from_result(
            spec,
            Duration::from_millis(8),
            Ok(TaskOutput::Counted { warm_records: 3 }),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["kind"], "select");
        assert_eq!(json["thread"], "select-0");
        assert_eq!(json["output"]["warm_records"], 3);
    }
}
