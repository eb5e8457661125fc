// Telemetry: structured JSON logging and Prometheus metrics

use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting. Log level comes from
/// `RUST_LOG` when set, otherwise from configuration.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level = log_level, "Structured logging initialized");
    Ok(())
}

/// Install the Prometheus exporter and register the engine's metrics.
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!(
        "trigger_jobs_scheduled_total",
        "Generation jobs handed to the scheduling service, by trigger category"
    );
    describe_counter!(
        "trigger_duplicates_suppressed_total",
        "Candidates suppressed because an equivalent job was already pending"
    );
    describe_counter!(
        "trigger_businesses_skipped_total",
        "Businesses skipped for one cycle, by failure reason"
    );
    describe_histogram!(
        "trigger_cycle_duration_seconds",
        "Wall-clock duration of one full evaluation cycle, by path"
    );

    tracing::info!(
        metrics_port = metrics_port,
        "Prometheus metrics exporter initialized"
    );
    Ok(())
}
