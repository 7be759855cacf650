//! Live bracket updates for spectators.
//!
//! [`EventHub`] is the server's [`ChangeNotifier`]: every committed bracket
//! change is serialized once and broadcast to the spectators of its event.
//! A channel exists only while an event has at least one spectator.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/events/{event_id}`
//! 2. Server replies with `{"type":"subscribed","event_id":...}`
//! 3. Each change to a bracket of that event arrives as one JSON text frame,
//!    tagged by `type` (`bracket_generated`, `end_recorded`, `match_finished`, ...)
//! 4. A spectator that falls behind receives `{"type":"lagged","skipped":n}`
//!    and should reload the bracket over HTTP
//!
//! The socket is receive-only; client text frames are ignored.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws/events/5f0c...');
//! ws.onmessage = (event) => {
//!   const change = JSON.parse(event.data);
//!   if (change.type === 'match_finished') refreshBracket();
//! };
//! ```

use archery_bracket::bracket::EventId;
use archery_bracket::{BracketChange, ChangeNotifier};
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use super::AppState;
use super::request_id::RequestId;
use crate::metrics;

/// Control messages sent by the server alongside bracket changes
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed { event_id: EventId },
    Lagged { skipped: u64 },
}

/// Per-event broadcast registry for spectator connections
pub struct EventHub {
    channels: Mutex<HashMap<EventId, broadcast::Sender<String>>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub buffering up to `capacity` updates per event
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<EventId, broadcast::Sender<String>>> {
        // the map stays consistent even if a holder panicked
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start receiving updates for `event_id`, creating its channel on first use
    pub fn subscribe(self: &Arc<Self>, event_id: EventId) -> Subscription {
        let receiver = {
            let mut channels = self.channels();
            channels
                .entry(event_id)
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        metrics::websocket_connections_active(self.subscriber_total() as u64);

        Subscription {
            hub: Arc::clone(self),
            event_id,
            receiver: Some(receiver),
        }
    }

    /// Drop the channel of `event_id` once nobody listens to it
    fn release(&self, event_id: EventId) {
        {
            let mut channels = self.channels();
            if channels
                .get(&event_id)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                channels.remove(&event_id);
                debug!("Closed live channel for event {}", event_id);
            }
        }
        metrics::websocket_connections_active(self.subscriber_total() as u64);
    }

    /// Number of events with an open channel
    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Spectators currently subscribed to `event_id`
    pub fn subscriber_count(&self, event_id: EventId) -> usize {
        self.channels()
            .get(&event_id)
            .map_or(0, |sender| sender.receiver_count())
    }

    fn subscriber_total(&self) -> usize {
        self.channels()
            .values()
            .map(|sender| sender.receiver_count())
            .sum()
    }
}

impl ChangeNotifier for EventHub {
    fn notify(&self, change: &BracketChange) {
        let Some(sender) = self.channels().get(&change.event_id()).cloned() else {
            return;
        };

        match serde_json::to_string(change) {
            // a send error only means the last spectator left meanwhile
            Ok(json) => {
                let _ = sender.send(json);
            }
            Err(e) => error!("Failed to serialize bracket change: {}", e),
        }
    }
}

/// Receiving end of one spectator; leaving releases the event channel
pub struct Subscription {
    hub: Arc<EventHub>,
    event_id: EventId,
    receiver: Option<broadcast::Receiver<String>>,
}

impl Subscription {
    /// Next update for this event
    ///
    /// Returns `RecvError::Lagged` when updates were overwritten before being read.
    pub async fn recv(&mut self) -> Result<String, RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // the receiver must be gone before the hub counts what is left
        self.receiver.take();
        self.hub.release(self.event_id);
    }
}

/// WebSocket upgrade handler for event spectators
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(event_id): Path<EventId>,
    State(state): State<AppState>,
    request_id: RequestId,
) -> Response {
    let hub = Arc::clone(&state.hub);
    let request_id = request_id.as_str().to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, event_id, hub, request_id))
}

async fn handle_socket(socket: WebSocket, event_id: EventId, hub: Arc<EventHub>, request_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = hub.subscribe(event_id);

    metrics::websocket_connections_total();
    info!(request_id = %request_id, "Spectator connected: event={}", event_id);

    if let Ok(json) = serde_json::to_string(&ServerMessage::Subscribed { event_id })
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        return;
    }

    let send_task = tokio::spawn(async move {
        loop {
            let text = match subscription.recv().await {
                Ok(json) => json,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Spectator of event {} lagged by {} updates", event_id, skipped);
                    metrics::websocket_messages_dropped(skipped);
                    match serde_json::to_string(&ServerMessage::Lagged { skipped }) {
                        Ok(json) => json,
                        Err(_) => continue,
                    }
                }
                Err(RecvError::Closed) => break,
            };

            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent();
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error on event {}: {}", event_id, e);
                break;
            }
        }
    }

    // aborting drops the subscription, which releases the channel
    send_task.abort();
    info!(request_id = %request_id, "Spectator disconnected: event={}", event_id);
}
