//! Prometheus metrics
//!
//! Counters and gauges are recorded through the `metrics` facade. Until a
//! recorder is installed they are no-ops, so handlers record unconditionally.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

pub const SAMPLES_INGESTED: &str = "fleetview_samples_ingested_total";
pub const ALERTS_RAISED: &str = "fleetview_alerts_raised_total";
pub const LOGINS: &str = "fleetview_logins_total";
pub const LOGIN_FAILURES: &str = "fleetview_login_failures_total";
pub const WS_CLIENTS: &str = "fleetview_websocket_clients";

/// Install the global Prometheus recorder
pub fn install() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe();
            Some(handle)
        }
        Err(err) => {
            warn!(error = %err, "Prometheus recorder not installed");
            None
        }
    }
}

fn describe() {
    describe_counter!(SAMPLES_INGESTED, "Tracking samples accepted");
    describe_counter!(ALERTS_RAISED, "Alerts stored, by type");
    describe_counter!(LOGINS, "Successful logins");
    describe_counter!(LOGIN_FAILURES, "Rejected logins");
    describe_gauge!(WS_CLIENTS, "Connected WebSocket clients");
}

pub fn sample_ingested() {
    counter!(SAMPLES_INGESTED).increment(1);
}

pub fn alert_raised(kind: &'static str) {
    counter!(ALERTS_RAISED, "type" => kind).increment(1);
}

pub fn login(success: bool) {
    if success {
        counter!(LOGINS).increment(1);
    } else {
        counter!(LOGIN_FAILURES).increment(1);
    }
}

pub fn ws_connected() {
    gauge!(WS_CLIENTS).increment(1.0);
}

pub fn ws_disconnected() {
    gauge!(WS_CLIENTS).decrement(1.0);
}
