//! Metric names and logging setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const INFERENCE_REQUESTS: &str = "leafscan_inference_requests_total";
pub const INFERENCE_FAILURES: &str = "leafscan_inference_failures_total";
pub const INFERENCE_TICKS_SKIPPED: &str = "leafscan_inference_ticks_skipped_total";
pub const INFERENCE_LATENCY: &str = "leafscan_inference_latency_seconds";
pub const STALE_RESPONSES: &str = "leafscan_stale_responses_discarded_total";
pub const FRAMES_RENDERED: &str = "leafscan_frames_rendered_total";
pub const SESSIONS_STARTED: &str = "leafscan_sessions_started_total";

/// Initialize tracing: colored output for dev, JSON when `LOG_FORMAT=json`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("leafscan=info,leafscan_detector=info,leafscan_client=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Serve Prometheus metrics on `METRICS_PORT` when it is set.
///
/// Must be called from within the tokio runtime.
pub fn init_metrics() -> Result<Option<SocketAddr>, BuildError> {
    let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return Ok(None);
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!(%addr, "Prometheus exporter listening");
    Ok(Some(addr))
}
