//! Hub instrumentation.
//!
//! Recorded through the `metrics` facade; a binary decides where they go by
//! installing a recorder (the server installs a Prometheus exporter). With
//! no recorder installed every call is a no-op.

use crate::id::Role;
use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "relay_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "relay_connections_active";
    pub const REMOVALS_TOTAL: &str = "relay_removals_total";
    pub const BROADCASTS_TOTAL: &str = "relay_broadcasts_total";
    pub const BROADCAST_BYTES: &str = "relay_broadcast_bytes_total";
    pub const DELIVERIES_TOTAL: &str = "relay_deliveries_total";
    pub const ERRORS_TOTAL: &str = "relay_errors_total";
}

/// Register descriptions for every hub metric.
pub fn describe() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of admitted connections since start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of registered connections"
    );
    metrics::describe_counter!(names::REMOVALS_TOTAL, "Total number of removed connections");
    metrics::describe_counter!(names::BROADCASTS_TOTAL, "Total number of broadcast events");
    metrics::describe_counter!(names::BROADCAST_BYTES, "Total bytes received for broadcast");
    metrics::describe_counter!(
        names::DELIVERIES_TOTAL,
        "Total number of successful observer writes"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");
}

/// Record an admitted connection.
pub fn record_admission(role: Role) {
    counter!(names::CONNECTIONS_TOTAL, "role" => role.as_str()).increment(1);
}

/// Record a removed connection.
pub fn record_removal(role: Role) {
    counter!(names::REMOVALS_TOTAL, "role" => role.as_str()).increment(1);
}

/// Publish current registry sizes.
pub fn set_registry_size(providers: usize, observers: usize) {
    gauge!(names::CONNECTIONS_ACTIVE, "role" => Role::Provider.as_str()).set(providers as f64);
    gauge!(names::CONNECTIONS_ACTIVE, "role" => Role::Observer.as_str()).set(observers as f64);
}

/// Record one broadcast and its fan-out.
pub fn record_broadcast(bytes: usize, delivered: usize) {
    counter!(names::BROADCASTS_TOTAL).increment(1);
    counter!(names::BROADCAST_BYTES).increment(bytes as u64);
    counter!(names::DELIVERIES_TOTAL).increment(delivered as u64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}
