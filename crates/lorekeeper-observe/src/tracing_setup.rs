//! Tracing subscriber initialization with structured logging, a daily
//! rolling log file, and optional OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use lorekeeper_observe::{LogOptions, init_tracing};
//!
//! let _guard = init_tracing(&LogOptions::default()).unwrap();
//! ```

use std::path::PathBuf;
use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is unset (e.g. `"info"`).
    pub default_filter: String,
    /// Directory for the rolling log file. `None` logs to stderr only.
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
    /// Rotated files kept on disk.
    pub max_files: usize,
    pub otel: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            dir: None,
            file_prefix: "lorekeeper.log".to_string(),
            max_files: 30,
            otel: false,
        }
    }
}

/// Keeps the background file writer alive. Buffered lines are flushed when
/// this is dropped, so hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    _file: Option<WorkerGuard>,
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Build the non-blocking daily rolling file writer.
fn file_writer(
    options: &LogOptions,
) -> Result<Option<(NonBlocking, WorkerGuard)>, Box<dyn std::error::Error>> {
    let Some(dir) = &options.dir else {
        return Ok(None);
    };
    std::fs::create_dir_all(dir)?;
    let appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(&options.file_prefix)
        .max_log_files(options.max_files.max(1))
        .build(dir)?;
    Ok(Some(tracing_appender::non_blocking(appender)))
}

/// Initialize the global tracing subscriber.
///
/// - Always installs a structured stderr `fmt` layer with target visibility
///   and span close timing.
/// - When `options.dir` is set, adds a plain-text layer writing to a daily
///   rolling file, keeping `max_files` rotations.
/// - When `options.otel` is true, bridges spans to OpenTelemetry using a
///   stdout exporter.
/// - Respects `RUST_LOG`, falling back to `options.default_filter`.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or the
/// log directory cannot be created.
pub fn init_tracing(options: &LogOptions) -> Result<TracingGuard, Box<dyn std::error::Error>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let (file_layer, file_guard) = match file_writer(options)? {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    let otel_layer = if options.otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("lorekeeper");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter(&options.default_filter))
        .with(stderr_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(TracingGuard { _file: file_guard })
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Warning: OTel tracer provider shutdown error: {e}");
    }
}
