//! Change notifications for live bracket views.

use serde::{Deserialize, Serialize};

use super::models::{
    Advancement, BracketId, BracketStatus, EntryId, EventId, GenerationSummary, Match, MatchId,
};

/// A committed change to a bracket, addressed to the bracket's event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BracketChange {
    BracketGenerated {
        event_id: EventId,
        summary: GenerationSummary,
    },
    BracketStatusChanged {
        event_id: EventId,
        bracket_id: BracketId,
        status: BracketStatus,
    },
    EndRecorded {
        event_id: EventId,
        bracket_id: BracketId,
        match_id: MatchId,
        end_no: i32,
    },
    MatchFinished {
        event_id: EventId,
        finished: Match,
        advanced_to: Option<Advancement>,
        champion: Option<EntryId>,
    },
    TargetsAssigned {
        event_id: EventId,
        bracket_id: BracketId,
        matches: Vec<Match>,
    },
    BracketDeleted {
        event_id: EventId,
        bracket_id: BracketId,
    },
}

impl BracketChange {
    pub fn event_id(&self) -> EventId {
        match self {
            BracketChange::BracketGenerated { event_id, .. }
            | BracketChange::BracketStatusChanged { event_id, .. }
            | BracketChange::EndRecorded { event_id, .. }
            | BracketChange::MatchFinished { event_id, .. }
            | BracketChange::TargetsAssigned { event_id, .. }
            | BracketChange::BracketDeleted { event_id, .. } => *event_id,
        }
    }
}

/// Receiver of committed bracket changes.
///
/// Called after the store transaction commits. Delivery is fire-and-forget:
/// implementations must not block and have no way to fail the operation.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, change: &BracketChange);
}

/// Notifier that drops every change
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _change: &BracketChange) {}
}
