//! Metrics export for the relay server.
//!
//! The hub records its own metrics through `plotrelay_core::metrics`; this
//! module adds admission metrics and exports everything in Prometheus format.

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use plotrelay_core::Role;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const REJECTIONS_TOTAL: &str = "relay_rejections_total";
    pub const UPGRADE_FAILURES_TOTAL: &str = "relay_upgrade_failures_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    plotrelay_core::metrics::describe();

    metrics::describe_counter!(
        names::REJECTIONS_TOTAL,
        "Total number of refused upgrade requests"
    );
    metrics::describe_counter!(
        names::UPGRADE_FAILURES_TOTAL,
        "Total number of upgrades that failed after the response was sent"
    );

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

/// Record a refused upgrade request.
pub fn record_rejection(role: Role) {
    counter!(names::REJECTIONS_TOTAL, "role" => role.as_str()).increment(1);
}

/// Record an upgrade that failed after the handshake response.
pub fn record_upgrade_failure(role: Role) {
    counter!(names::UPGRADE_FAILURES_TOTAL, "role" => role.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_exporter() {
        // Just test that it doesn't panic
        init_metrics();
        record_rejection(Role::Observer);
        record_upgrade_failure(Role::Provider);
    }
}
