//! # Bracket Server
//!
//! HTTP and WebSocket front end for the `archery_bracket` engine.
//!
//! - [`api`]: axum router, bracket and match handlers, spectator WebSocket
//! - [`config`]: environment and command-line configuration
//! - [`logging`]: tracing subscriber setup
//! - [`metrics`]: Prometheus counters for bracket operations

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
