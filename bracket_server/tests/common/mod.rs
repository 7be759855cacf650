//! Shared fixtures: a router over the in-memory store.

#![allow(dead_code)]

use archery_bracket::bracket::{Candidate, Participant, QualificationTotals};
use archery_bracket::{MemoryBracketRepository, StaticCandidates};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bracket_server::api::{AppState, EventHub, create_router};
use bracket_server::config::BracketDefaultsConfig;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method
use uuid::Uuid;

pub struct TestServer {
    pub app: Router,
    pub state: AppState,
    pub candidates: StaticCandidates,
    pub event_id: Uuid,
    pub category_id: Uuid,
}

/// Helper to create a test server with its own store and candidate source
pub fn create_test_server() -> TestServer {
    let candidates = StaticCandidates::new();
    let state = AppState::new(
        Arc::new(MemoryBracketRepository::new()),
        Arc::new(candidates.clone()),
        Arc::new(EventHub::new(16)),
        None,
        BracketDefaultsConfig {
            ends_per_match: 4,
            arrows_per_end: 6,
        },
    );

    TestServer {
        app: create_router(state.clone()),
        state,
        candidates,
        event_id: Uuid::new_v4(),
        category_id: Uuid::new_v4(),
    }
}

/// `count` archers with distinct, descending qualification scores
pub fn archers(count: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            Candidate::new(
                Participant::Archer(Uuid::new_v4()),
                QualificationTotals::new(650 - i as i32, 10, 20),
            )
        })
        .collect()
}

impl TestServer {
    /// Send a request and decode the JSON body (`Value::Null` when empty)
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Create a recurve bracket of `size` for the fixture's category
    pub async fn create_bracket(&self, size: u32) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/brackets",
                Some(json!({
                    "event_id": self.event_id,
                    "category_id": self.category_id,
                    "bracket_type": "individual",
                    "format": "recurve_set",
                    "size": size,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    /// Create and generate a bracket of `size` from `size` ranked archers
    pub async fn generated_bracket(&self, size: u32) -> String {
        self.candidates
            .set(self.event_id, self.category_id, archers(size as usize));
        let bracket = self.create_bracket(size).await;
        let id = bracket["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .send("POST", &format!("/api/v1/brackets/{id}/generate"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    /// Id of match `match_no` in round `round_no` of a bracket view
    pub fn match_id(view: &Value, round_no: u64, match_no: u64) -> String {
        view["rounds"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["round_no"] == round_no)
            .and_then(|r| {
                r["matches"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .find(|m| m["match_no"] == match_no)
            })
            .map(|m| m["id"].as_str().unwrap().to_string())
            .unwrap()
    }
}
