//! HTTP/WebSocket API for the bracket server.
//!
//! # Modules
//!
//! - [`brackets`]: Bracket lifecycle and match scoring handlers
//! - [`websocket`]: Spectator WebSocket and the [`EventHub`] change broadcaster
//! - [`request_id`]: Request correlation middleware
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use archery_bracket::{MemoryBracketRepository, StaticCandidates};
//! use bracket_server::api::{AppState, EventHub, create_router};
//! use bracket_server::config::BracketDefaultsConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(
//!     Arc::new(MemoryBracketRepository::new()),
//!     Arc::new(StaticCandidates::new()),
//!     Arc::new(EventHub::new(64)),
//!     None,
//!     BracketDefaultsConfig::default(),
//! );
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod request_id;
pub mod websocket;

pub use websocket::EventHub;

use archery_bracket::{BracketManager, BracketRepository, CandidateSource, Database};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::BracketDefaultsConfig;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned per request; every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BracketManager>,
    pub hub: Arc<EventHub>,
    /// Pool for health checks; `None` with the in-memory store
    pub database: Option<Database>,
    pub bracket_defaults: BracketDefaultsConfig,
}

impl AppState {
    /// Wire a bracket manager that publishes its changes through `hub`
    pub fn new(
        repo: Arc<dyn BracketRepository>,
        candidates: Arc<dyn CandidateSource>,
        hub: Arc<EventHub>,
        database: Option<Database>,
        bracket_defaults: BracketDefaultsConfig,
    ) -> Self {
        let manager = BracketManager::new(repo, candidates).with_notifier(hub.clone());
        Self {
            manager: Arc::new(manager),
            hub,
            database,
            bracket_defaults,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health                                   - Health check
/// GET    /ws/events/{event_id}                     - Spectator WebSocket
/// POST   /api/v1/brackets                          - Create draft bracket
/// GET    /api/v1/events/{event_id}/brackets        - List brackets (?category_id=)
/// GET    /api/v1/brackets/{bracket_id}             - Bracket with rounds and scores
/// PUT    /api/v1/brackets/{bracket_id}             - Reconfigure draft
/// DELETE /api/v1/brackets/{bracket_id}             - Delete draft or generated bracket
/// POST   /api/v1/brackets/{bracket_id}/generate    - Seed and build the match tree
/// POST   /api/v1/brackets/{bracket_id}/start       - Generated -> running
/// POST   /api/v1/brackets/{bracket_id}/close       - Running -> closed
/// PUT    /api/v1/brackets/{bracket_id}/targets     - Assign match targets in bulk
/// GET    /api/v1/matches/{match_id}                - Match with ends and score
/// POST   /api/v1/matches/{match_id}/ends           - Record (or overwrite) an end
/// PUT    /api/v1/matches/{match_id}/schedule       - Set or clear scheduled time
/// POST   /api/v1/matches/{match_id}/finish         - Finish with explicit winner
/// POST   /api/v1/matches/{match_id}/end            - Finish from recorded scores
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/events/{event_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let bracket_routes = Router::new()
        .route("/brackets", post(brackets::create_bracket))
        .route("/events/{event_id}/brackets", get(brackets::list_brackets))
        .route(
            "/brackets/{bracket_id}",
            get(brackets::get_bracket)
                .put(brackets::update_bracket)
                .delete(brackets::delete_bracket),
        )
        .route("/brackets/{bracket_id}/generate", post(brackets::generate_bracket))
        .route("/brackets/{bracket_id}/start", post(brackets::start_bracket))
        .route("/brackets/{bracket_id}/close", post(brackets::close_bracket))
        .route("/brackets/{bracket_id}/targets", put(brackets::assign_targets));

    let match_routes = Router::new()
        .route("/matches/{match_id}", get(brackets::get_match))
        .route("/matches/{match_id}/ends", post(brackets::record_end))
        .route("/matches/{match_id}/schedule", put(brackets::schedule_match))
        .route("/matches/{match_id}/finish", post(brackets::finish_match))
        .route("/matches/{match_id}/end", post(brackets::end_match));

    Router::new().merge(bracket_routes).merge(match_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":"postgres","database":true,"live_channels":2,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (store, db_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "database": db_healthy,
        "live_channels": state.hub.channel_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(body))
}
