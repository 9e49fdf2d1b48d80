//! climate-load CLI
//!
//! Runs the fixed ClimateData workload (five rounds of insert, select and
//! update, all concurrent) once and exits. Every flag has an environment
//! variable and a default, so no arguments are needed. The summary (or the
//! JSON report) goes to stdout and log lines go to stderr. Exits with 1 if
//! any task failed or panicked.

use clap::Parser;
use climate_load::config::{DEFAULT_LOG_FILTER, DEFAULT_OTLP_ENDPOINT, DEFAULT_SERVICE_NAME};
use climate_load::store::{MemoryStore, MySqlConnector, TracedConnector};
use climate_load::workload::{TaskOutput, TaskStatus, WARM_THRESHOLD_CELSIUS};
use climate_load::{DbConfig, LogFormat, Telemetry, TelemetryConfig, WorkloadReport, WorkloadRunner};
use std::process::ExitCode;

/// Concurrent ClimateData workload with OpenTelemetry tracing
#[derive(Parser)]
#[command(name = "climate-load")]
#[command(about = "Run concurrent insert/select/update tasks against ClimateData", long_about = None)]
#[command(version)]
struct Cli {
    /// MySQL host [env: DB_HOST, default: 127.0.0.1]
    #[arg(long)]
    db_host: Option<String>,

    /// MySQL port [env: DB_PORT, default: 3306]
    #[arg(long)]
    db_port: Option<u16>,

    /// MySQL user [env: DB_USER, default: root]
    #[arg(long)]
    db_user: Option<String>,

    /// MySQL password [env: DB_PASSWORD]
    #[arg(long)]
    db_password: Option<String>,

    /// Database holding the ClimateData table [env: DB_NAME, default: project_db]
    #[arg(long)]
    db_name: Option<String>,

    /// OTLP/gRPC collector endpoint
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value = DEFAULT_OTLP_ENDPOINT)]
    otlp_endpoint: String,

    /// service.name reported with every span
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME)]
    service_name: String,

    /// Do not export spans
    #[arg(long)]
    no_otel: bool,

    /// Log filter directives for stderr log lines
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json_report: bool,

    /// Run against an in-process table instead of MySQL
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// `DB_*` environment over the defaults, then flags over both.
    fn db_config(&self) -> climate_load::Result<DbConfig> {
        let mut config = DbConfig::from_env()?;
        if let Some(host) = &self.db_host {
            config.host = host.clone();
        }
        if let Some(port) = self.db_port {
            config.port = port;
        }
        if let Some(user) = &self.db_user {
            config.user = user.clone();
        }
        if let Some(password) = &self.db_password {
            config.password = password.clone();
        }
        if let Some(database) = &self.db_name {
            config.database = database.clone();
        }
        Ok(config)
    }

    fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.service_name.clone(),
            otlp_endpoint: (!self.no_otel).then(|| self.otlp_endpoint.clone()),
            log_filter: self.log_filter.clone(),
            log_format: self.log_format,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("climate-load-io")
        .build()?;

    // The batch span processor spawns onto the runtime it is built in.
    let telemetry = {
        let _guard = runtime.enter();
        Telemetry::init(&cli.telemetry_config())?
    };
    let _dispatch = tracing::dispatcher::set_default(telemetry.dispatch());

    let dispatch = telemetry.dispatch().clone();
    let runner = if cli.dry_run {
        tracing::info!("Dry run: using in-process store");
        WorkloadRunner::new(TracedConnector::new(MemoryStore::new()), dispatch)
    } else {
        let db_config = cli.db_config()?;
        tracing::info!(db = ?db_config, "Using MySQL store");
        WorkloadRunner::new(TracedConnector::new(MySqlConnector::new(&db_config)), dispatch)
    };

    let report = runner.run(runtime.handle());

    if cli.json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    {
        let _guard = runtime.enter();
        telemetry.shutdown();
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(report: &WorkloadReport) {
    println!("Workload {} finished in {} ms", report.run_id, report.elapsed_ms);
    println!(
        "  Tasks: {} succeeded, {} failed",
        report.succeeded(),
        report.outcomes.len() - report.succeeded()
    );
    println!("  Rows inserted: {}", report.rows_inserted());

    for outcome in &report.outcomes {
        if let Some(TaskOutput::Counted { warm_records }) = outcome.output() {
            println!(
                "  Records with temperature > {}°C: {} ({})",
                WARM_THRESHOLD_CELSIUS, warm_records, outcome.thread
            );
        }
    }

    for outcome in report.failed() {
        match &outcome.status {
            TaskStatus::Failed { message, .. } => {
                println!("  ✗ {}: {}", outcome.thread, message);
            }
            TaskStatus::Panicked { message } => {
                println!("  ✗ {}: panicked: {}", outcome.thread, message);
            }
            TaskStatus::Succeeded { .. } => {}
        }
    }
}
