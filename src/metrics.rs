//! Metric helpers for `cdr-collect`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking active connections.
pub const CONNECTIONS_ACTIVE: &str = "cdr_collect_connections_active";
/// Name of the counter tracking chunks read from switch connections.
pub const CHUNKS_RECEIVED: &str = "cdr_collect_chunks_received_total";
/// Name of the counter tracking records accepted by the sender.
pub const RECORDS_EXPORTED: &str = "cdr_collect_records_exported_total";
/// Name of the counter tracking error occurrences, labelled by `kind`.
pub const ERRORS_TOTAL: &str = "cdr_collect_errors_total";

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a chunk read from a connection.
pub fn inc_chunks() {
    #[cfg(feature = "metrics")]
    counter!(CHUNKS_RECEIVED).increment(1);
}

/// Record a record delivered to the sender.
pub fn inc_records_exported() {
    #[cfg(feature = "metrics")]
    counter!(RECORDS_EXPORTED).increment(1);
}

/// Record an error occurrence of the given kind.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "no-op without metrics"))]
pub fn inc_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}
