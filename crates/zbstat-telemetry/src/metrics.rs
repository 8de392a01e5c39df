//! Prometheus metrics for the zbstat feed client.
//!
//! Covers:
//! - Connection state
//! - Reconnection attempts
//! - Inbound message classification
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, which must crash at startup.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Encoder, Gauge,
    GaugeVec, TextEncoder,
};

/// Lifecycle states exported by `zbstat_ws_state`.
const WS_STATES: &[&str] = &[
    "idle",
    "connecting",
    "open",
    "closed",
    "reconnect_pending",
    "shutdown",
];

/// WebSocket connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "zbstat_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Connection manager lifecycle state.
/// Labels: state (idle/connecting/open/closed/reconnect_pending/shutdown)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "zbstat_ws_state",
        "Connection manager current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnection attempts.
/// Labels: reason (closed/error)
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "zbstat_ws_reconnect_total",
        "Total WebSocket reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Inbound messages by classification.
/// Labels: kind (status/details/unknown_key/malformed)
pub static MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "zbstat_messages_total",
        "Inbound status feed messages by kind",
        &["kind"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record WebSocket connected.
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    /// Record WebSocket disconnected.
    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Set the lifecycle state.
    /// Only the active state is set to 1, all others to 0.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record a scheduled reconnection.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an inbound message.
    pub fn message_received(kind: &str) {
        MESSAGES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
