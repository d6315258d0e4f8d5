//! Prometheus metrics for tickstop.
//!
//! Covers:
//! - Connection state and reconnects
//! - Inbound frames by kind, dropped frames by reason
//! - Depth snapshots and book-order events per instrument
//! - Trigger firing and order placement latency
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. Registration only fails on duplicate
//! metric names, which is a programming error caught at first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_gauge, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, IntGauge,
    TextEncoder,
};

/// WebSocket connection state (1 = connected, 0 = otherwise).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "tickstop_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Connection manager current state.
/// Labels: state (disconnected/connecting/connected/closed)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "tickstop_ws_state",
        "Connection manager current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnect requests.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tickstop_ws_reconnect_total",
        "Total reconnect requests by cause",
        &["reason"]
    )
    .unwrap()
});

/// Inbound frames by classification.
pub static WS_FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tickstop_ws_frames_total",
        "Inbound frames by kind",
        &["kind"]
    )
    .unwrap()
});

/// Frames dropped by the dispatcher.
pub static WS_FRAMES_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tickstop_ws_frames_dropped_total",
        "Inbound frames dropped by reason",
        &["reason"]
    )
    .unwrap()
});

/// Running update handlers.
pub static UPDATE_HANDLERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tickstop_update_handlers",
        "Number of running per-instrument update handlers"
    )
    .unwrap()
});

/// Depth snapshots processed.
/// Labels: outcome (changed/unchanged)
pub static DEPTH_SNAPSHOTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tickstop_depth_snapshots_total",
        "Depth snapshots processed by update handlers",
        &["instrument", "outcome"]
    )
    .unwrap()
});

/// Book-order events emitted.
pub static BOOK_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tickstop_book_events_total",
        "Book-order events emitted",
        &["instrument", "kind"]
    )
    .unwrap()
});

/// Stop conditions met.
pub static TRIGGERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tickstop_triggers_total",
        "Stop conditions met",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Order placement round trip.
pub static ORDER_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tickstop_order_latency_ms",
        "Order placement round trip in milliseconds",
        &["outcome"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

const WS_STATES: &[&str] = &["disconnected", "connecting", "connected", "closed"];

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Set connection manager state. Only the active state reads 1.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "connected" { 1.0 } else { 0.0 });
    }

    /// Record a reconnect request.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an inbound frame after classification.
    pub fn frame_received(kind: &str) {
        WS_FRAMES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a frame dropped by the dispatcher.
    pub fn frame_dropped(reason: &str) {
        WS_FRAMES_DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn handler_started() {
        UPDATE_HANDLERS.inc();
    }

    pub fn handler_stopped() {
        UPDATE_HANDLERS.dec();
    }

    /// Record a processed snapshot.
    pub fn depth_snapshot(instrument: &str, changed: bool) {
        let outcome = if changed { "changed" } else { "unchanged" };
        DEPTH_SNAPSHOTS_TOTAL
            .with_label_values(&[instrument, outcome])
            .inc();
    }

    /// Record an emitted book-order event.
    pub fn book_event(instrument: &str, kind: &str) {
        BOOK_EVENTS_TOTAL
            .with_label_values(&[instrument, kind])
            .inc();
    }

    /// Record the stop condition firing.
    pub fn trigger_fired(instrument: &str, side: &str) {
        TRIGGERS_TOTAL.with_label_values(&[instrument, side]).inc();
    }

    /// Record order placement latency.
    pub fn order_latency(outcome: &str, latency_ms: f64) {
        ORDER_LATENCY_MS
            .with_label_values(&[outcome])
            .observe(latency_ms);
    }

    /// Render every registered collector in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
    }
}
