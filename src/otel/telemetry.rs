//! Telemetry setup.
//!
//! Builds the log output (always on stderr) and the OTLP span pipeline
//! once at startup and hands back a `Telemetry` value. Nothing is installed
//! globally: callers pass `Telemetry::dispatch()` to whatever needs to emit
//! spans.

use crate::config::{LogFormat, TelemetryConfig};
use crate::types::error::{Result, WorkloadError};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
use std::io::IsTerminal;
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Instrumentation scope name for exported spans.
const TRACER_NAME: &str = "climate-load";

/// Initialized logging and trace export.
///
/// # Example
///
/// ```rust,ignore
/// let telemetry = Telemetry::init(&TelemetryConfig::default())?;
/// let runner = WorkloadRunner::new(connector, telemetry.dispatch().clone());
/// let report = runner.run(runtime.handle());
/// telemetry.shutdown();
/// ```
pub struct Telemetry {
    dispatch: Dispatch,
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Build the subscriber and, if configured, the OTLP exporter.
    ///
    /// Must be called inside a Tokio runtime context when export is enabled:
    /// the batch span processor runs on that runtime.
    ///
    /// An exporter that cannot be built is logged and skipped; span export
    /// never gets in the way of the workload.
    ///
    /// # Arguments
    ///
    /// * `config` - Telemetry settings
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::TelemetryError` if the log filter is invalid
    pub fn init(config: &TelemetryConfig) -> Result<Self> {
        let filter = EnvFilter::try_new(&config.log_filter).map_err(|e| {
            WorkloadError::TelemetryError(format!(
                "Invalid log filter '{}': {}",
                config.log_filter, e
            ))
        })?;

        // stdout carries the run report; log lines go to stderr.
        let ansi = std::io::stderr().is_terminal();
        let fmt_layer = match config.log_format {
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_thread_names(true)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_thread_names(true)
                .boxed(),
        };

        let (provider, export_error) = match config.otlp_endpoint.as_deref() {
            Some(endpoint) => match build_provider(&config.service_name, endpoint) {
                Ok(provider) => (Some(provider), None),
                Err(err) => (None, Some(err)),
            },
            None => (None, None),
        };

        let otel_layer = provider
            .as_ref()
            .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME)));

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(otel_layer);
        let dispatch = Dispatch::new(subscriber);

        tracing::dispatcher::with_default(&dispatch, || match (&export_error, &config.otlp_endpoint) {
            (Some(err), _) => tracing::warn!(error = %err, "Span export disabled"),
            (None, Some(endpoint)) => {
                tracing::debug!(endpoint = %endpoint, service = %config.service_name, "Span export enabled")
            }
            (None, None) => tracing::debug!("Span export not configured"),
        });

        Ok(Self { dispatch, provider })
    }

    /// Subscriber to install on every thread that emits spans.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Whether spans are exported over OTLP.
    pub fn export_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Flush pending spans and stop the exporter.
    ///
    /// Flush failures are logged, not returned.
    pub fn shutdown(self) {
        let Telemetry { dispatch, provider } = self;
        if let Some(provider) = provider {
            if let Err(err) = provider.shutdown() {
                tracing::dispatcher::with_default(&dispatch, || {
                    tracing::warn!(error = %err, "Failed to flush spans on shutdown");
                });
            }
        }
    }
}

fn build_provider(service_name: &str, endpoint: &str) -> Result<TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| {
            WorkloadError::TelemetryError(format!("OTLP exporter for {}: {}", endpoint, e))
        })?;

    let resource = Resource::new(vec![KeyValue::new(SERVICE_NAME, service_name.to_string())]);

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource)
        .build())
}
