//! Metrics collection and exposition.
//!
//! # Metrics
//! - `crowdfund_attempts_total` (counter): terminal attempts by kind, outcome
//! - `crowdfund_attempt_duration_seconds` (histogram): request-to-terminal latency
//! - `crowdfund_confirmation_polls_total` (counter): status checks issued
//! - `crowdfund_remote_errors_total` (counter): remote failures by service, kind
//! - `crowdfund_wallet_connected` (gauge): 1=session active, 0=none

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(kind: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!("crowdfund_attempts_total", "kind" => kind, "outcome" => outcome).increment(1);
    histogram!("crowdfund_attempt_duration_seconds", "kind" => kind).record(elapsed.as_secs_f64());
}

pub fn record_confirmation_poll() {
    counter!("crowdfund_confirmation_polls_total").increment(1);
}

pub fn record_remote_error(service: &'static str, kind: &'static str) {
    counter!("crowdfund_remote_errors_total", "service" => service, "kind" => kind).increment(1);
}

pub fn record_wallet_connected(connected: bool) {
    gauge!("crowdfund_wallet_connected").set(if connected { 1.0 } else { 0.0 });
}
