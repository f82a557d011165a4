//! Tracing and OpenTelemetry initialization.
//!
//! Always installs a fmt layer honoring `RUST_LOG` (or the `-v` count). When
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over OTLP.

use anyhow::Result;
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::{runtime::Tokio, trace::TracerProvider, Resource};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be built or a subscriber is
/// already installed.
pub fn init(verbosity_level: Option<tracing::Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    // RUST_LOG=
    let env_filter = match verbosity_level {
        Some(level) => EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy(),
        None => EnvFilter::builder()
            .with_default_directive(tracing::Level::ERROR.into())
            .from_env_lossy(),
    };

    let telemetry = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, Tokio)
            .with_resource(Resource::new(vec![
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]))
            .build();

        Some(OpenTelemetryLayer::new(provider.tracer(env!("CARGO_PKG_NAME"))))
    } else {
        None
    };

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(telemetry)
        .with(env_filter);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
