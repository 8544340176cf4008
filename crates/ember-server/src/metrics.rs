//! Metrics collection and export for the ember relay.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const POLLS_TOTAL: &str = "ember_polls_total";
    pub const PUBLISHES_TOTAL: &str = "ember_publishes_total";
    pub const CHANNELS_ACTIVE: &str = "ember_channels_active";
    pub const SUBSCRIBERS_ACTIVE: &str = "ember_subscribers_active";
    pub const PRESENCE_SUBSCRIBERS_ACTIVE: &str = "ember_presence_subscribers_active";
    pub const ERRORS_TOTAL: &str = "ember_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(names::POLLS_TOTAL, "Total number of sub requests");
    metrics::describe_counter!(names::PUBLISHES_TOTAL, "Total number of published messages");
    metrics::describe_gauge!(names::CHANNELS_ACTIVE, "Current number of live channels");
    metrics::describe_gauge!(
        names::SUBSCRIBERS_ACTIVE,
        "Current number of parked subscribers"
    );
    metrics::describe_gauge!(
        names::PRESENCE_SUBSCRIBERS_ACTIVE,
        "Current number of parked presence subscribers"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of rejected requests");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a sub request.
pub fn record_poll() {
    counter!(names::POLLS_TOTAL).increment(1);
}

/// Record a published message.
pub fn record_publish() {
    counter!(names::PUBLISHES_TOTAL).increment(1);
}

/// Record a rejected request.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

/// Update the live channel count.
pub fn set_channels(count: usize) {
    gauge!(names::CHANNELS_ACTIVE).set(count as f64);
}

/// Update the parked subscriber count.
pub fn set_subscribers(count: usize) {
    gauge!(names::SUBSCRIBERS_ACTIVE).set(count as f64);
}

/// Update the parked presence subscriber count.
pub fn set_presence_subscribers(count: usize) {
    gauge!(names::PRESENCE_SUBSCRIBERS_ACTIVE).set(count as f64);
}
