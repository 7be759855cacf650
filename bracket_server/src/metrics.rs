//! Prometheus metrics for monitoring bracket server health and activity.
//!
//! Metrics are recorded through the `metrics` facade and exported in
//! Prometheus text format when an exporter address is configured. Without an
//! exporter every helper here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration by route and status
//! - **WebSocket Metrics**: Spectator connections and messages pushed
//! - **Bracket Metrics**: Brackets created and generated, ends recorded,
//!   matches finished and rejected operations
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/brackets", 201);
//! metrics::websocket_connections_active(3);
//! ```

use archery_bracket::ErrorKind;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Increments the total HTTP request counter with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set number of open spectator connections.
pub fn websocket_connections_active(count: u64) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total spectator connections.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment updates pushed to spectators.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent_total").increment(1);
}

/// Increment updates a lagging spectator missed.
pub fn websocket_messages_dropped(count: u64) {
    metrics::counter!("websocket_messages_dropped_total").increment(count);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Increment draft brackets created.
pub fn brackets_created_total() {
    metrics::counter!("brackets_created_total").increment(1);
}

/// Increment generated brackets, labelled by size.
pub fn brackets_generated_total(size: u32) {
    metrics::counter!("brackets_generated_total", "size" => size.to_string()).increment(1);
}

/// Increment recorded (or overwritten) ends.
pub fn ends_recorded_total() {
    metrics::counter!("ends_recorded_total").increment(1);
}

/// Increment finished matches; `final_match` marks the match that crowned a champion.
pub fn matches_finished_total(final_match: bool) {
    metrics::counter!("matches_finished_total", "final" => final_match.to_string()).increment(1);
}

/// Increment failed bracket operations by error kind.
pub fn bracket_errors_total(kind: ErrorKind) {
    metrics::counter!("bracket_errors_total", "kind" => kind.as_str()).increment(1);
}
