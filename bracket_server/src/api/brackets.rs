//! Bracket and match API handlers.
//!
//! Thin wrappers over [`BracketManager`](archery_bracket::BracketManager):
//! decode the request, call one operation, encode the result. Failures map
//! by [`ErrorKind`]: validation 400, conflict 409, not found 404, internal 500.
//!
//! # Examples
//!
//! Create and generate a bracket:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/brackets \
//!   -H "Content-Type: application/json" \
//!   -d '{"event_id":"...","category_id":"...","bracket_type":"individual","format":"recurve_set","size":8}'
//! curl -X POST http://localhost:8080/api/v1/brackets/BRACKET_ID/generate
//! ```
//!
//! Record an end from arrow values and from totals:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/matches/MATCH_ID/ends \
//!   -H "Content-Type: application/json" \
//!   -d '{"end_no":1,"side_a":{"arrows":["X","10","9"]},"side_b":{"total":27,"x_count":0,"ten_count":1}}'
//! ```

use archery_bracket::bracket::{
    Bracket, BracketConfig, BracketId, BracketSummary, BracketType, BracketView, CategoryId,
    EndInput, EntryId, EventId, FinishOutcome, GenerationSummary, MatchDetail, MatchId,
    ScoringFormat, TargetAssignment,
};
use archery_bracket::{BracketError, BracketStatus, ErrorKind, Match};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// A failed bracket operation on its way to the client
#[derive(Debug)]
pub struct ApiError(pub BracketError);

impl From<BracketError> for ApiError {
    fn from(err: BracketError) -> Self {
        ApiError(err)
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        logging::log_bracket_error(&self.0);
        metrics::bracket_errors_total(kind);

        let body = ErrorResponse {
            error: self.0.client_message(),
            kind: kind.as_str().to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct CreateBracketRequest {
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub bracket_type: BracketType,
    pub format: ScoringFormat,
    pub size: u32,
    pub ends_per_match: Option<u32>,
    pub arrows_per_end: Option<u32>,
}

/// Replacement configuration for a draft; the event cannot change
#[derive(Debug, Deserialize)]
pub struct UpdateBracketRequest {
    pub category_id: CategoryId,
    pub bracket_type: BracketType,
    pub format: ScoringFormat,
    pub size: u32,
    pub ends_per_match: Option<u32>,
    pub arrows_per_end: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListBracketsQuery {
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Deserialize)]
pub struct RecordEndRequest {
    pub end_no: i32,
    pub side_a: EndInput,
    pub side_b: EndInput,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// `null` clears the schedule
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Bulk target assignment for matches of one bracket
#[derive(Debug, Deserialize)]
pub struct AssignTargetsRequest {
    pub assignments: Vec<TargetAssignment>,
}

#[derive(Debug, Deserialize)]
pub struct FinishMatchRequest {
    pub winner_entry_id: EntryId,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndMatchRequest {
    /// Winner to apply only if the recorded scores are level
    #[serde(default)]
    pub override_winner_id: Option<EntryId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub bracket_id: BracketId,
    pub status: BracketStatus,
}

/// Create a draft bracket
///
/// Ends and arrows per end fall back to the server's configured defaults.
pub async fn create_bracket(
    State(state): State<AppState>,
    Json(request): Json<CreateBracketRequest>,
) -> ApiResult<(StatusCode, Json<Bracket>)> {
    let defaults = state.bracket_defaults;
    let config = BracketConfig {
        event_id: request.event_id,
        category_id: request.category_id,
        bracket_type: request.bracket_type,
        format: request.format,
        size: request.size,
        ends_per_match: request.ends_per_match.unwrap_or(defaults.ends_per_match),
        arrows_per_end: request.arrows_per_end.unwrap_or(defaults.arrows_per_end),
    };

    let bracket = state.manager.create_bracket(config).await?;
    metrics::brackets_created_total();
    Ok((StatusCode::CREATED, Json(bracket)))
}

/// Reconfigure a draft bracket
///
/// Omitted ends and arrows keep the bracket's current values.
pub async fn update_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
    Json(request): Json<UpdateBracketRequest>,
) -> ApiResult<Json<Bracket>> {
    let current = state.manager.bracket(bracket_id).await?;
    let config = BracketConfig {
        event_id: current.event_id,
        category_id: request.category_id,
        bracket_type: request.bracket_type,
        format: request.format,
        size: request.size,
        ends_per_match: request.ends_per_match.unwrap_or(current.ends_per_match),
        arrows_per_end: request.arrows_per_end.unwrap_or(current.arrows_per_end),
    };

    let bracket = state.manager.update_bracket(bracket_id, config).await?;
    Ok(Json(bracket))
}

pub async fn list_brackets(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Query(query): Query<ListBracketsQuery>,
) -> ApiResult<Json<Vec<BracketSummary>>> {
    let brackets = state
        .manager
        .list_brackets(event_id, query.category_id)
        .await?;
    Ok(Json(brackets))
}

pub async fn get_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<BracketView>> {
    Ok(Json(state.manager.get_bracket(bracket_id).await?))
}

pub async fn generate_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<GenerationSummary>> {
    let summary = state.manager.generate(bracket_id).await?;
    metrics::brackets_generated_total(1 << summary.round_count);
    Ok(Json(summary))
}

pub async fn start_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<StatusResponse>> {
    state.manager.start_bracket(bracket_id).await?;
    Ok(Json(StatusResponse {
        bracket_id,
        status: BracketStatus::Running,
    }))
}

pub async fn close_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Json<StatusResponse>> {
    state.manager.close_bracket(bracket_id).await?;
    Ok(Json(StatusResponse {
        bracket_id,
        status: BracketStatus::Closed,
    }))
}

pub async fn delete_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<StatusCode> {
    state.manager.delete_bracket(bracket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear the targets of several matches in one transaction
pub async fn assign_targets(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
    Json(request): Json<AssignTargetsRequest>,
) -> ApiResult<Json<Vec<Match>>> {
    let updated = state
        .manager
        .assign_targets(bracket_id, request.assignments)
        .await?;
    Ok(Json(updated))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<MatchDetail>> {
    Ok(Json(state.manager.get_match(match_id).await?))
}

/// Record both sides of one end; resubmitting an end overwrites it
pub async fn record_end(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<RecordEndRequest>,
) -> ApiResult<Json<Match>> {
    let updated = state
        .manager
        .record_end(match_id, request.end_no, request.side_a, request.side_b)
        .await?;
    metrics::ends_recorded_total();
    Ok(Json(updated))
}

pub async fn schedule_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<ScheduleRequest>,
) -> ApiResult<Json<Match>> {
    let updated = state
        .manager
        .schedule_match(match_id, request.scheduled_at)
        .await?;
    Ok(Json(updated))
}

/// Finish a match with an explicitly named winner
pub async fn finish_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<FinishMatchRequest>,
) -> ApiResult<Json<FinishOutcome>> {
    let outcome = state
        .manager
        .finish_match(match_id, request.winner_entry_id)
        .await?;
    metrics::matches_finished_total(outcome.champion().is_some());
    Ok(Json(outcome))
}

/// Finish a match from its recorded scores
///
/// The body is optional; `override_winner_id` only settles a level match.
pub async fn end_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    request: Option<Json<EndMatchRequest>>,
) -> ApiResult<Json<FinishOutcome>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let outcome = state
        .manager
        .end_match(match_id, request.override_winner_id)
        .await?;
    metrics::matches_finished_total(outcome.champion().is_some());
    Ok(Json(outcome))
}
