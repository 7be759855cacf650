//! Bracket error types.

use thiserror::Error;

use super::models::{BracketId, BracketStatus, CategoryId, EntryId, EventId, MatchId, Side};

/// How a caller should treat a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; fix the request before retrying
    Validation,
    /// Valid input, but the current state forbids it; refresh state first
    Conflict,
    /// The referenced bracket or match does not exist
    NotFound,
    /// Store failure or broken engine invariant
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Bracket size outside the allowed set
    #[error("Invalid bracket size {0}: must be 4, 8, 16, 32, 64 or 128")]
    InvalidSize(u32),

    /// Other invalid bracket configuration
    #[error("Invalid bracket configuration: {0}")]
    InvalidConfig(String),

    /// Malformed end submission
    #[error("Invalid end: {0}")]
    InvalidEnd(String),

    /// Malformed target assignment
    #[error("Invalid target assignment: {0}")]
    InvalidTarget(String),

    /// Winner is not one of the match's two entries
    #[error("Entry {entry_id} is not a participant of match {match_id}")]
    WinnerNotParticipant { match_id: MatchId, entry_id: EntryId },

    /// Not enough ranked candidates to fill the bracket
    #[error("Insufficient participants: need {required}, have {available}")]
    InsufficientParticipants { required: usize, available: usize },

    /// A bracket already exists for the event category
    #[error("A bracket already exists for category {category_id} of event {event_id}")]
    DuplicateBracket {
        event_id: EventId,
        category_id: CategoryId,
    },

    /// Bracket is not in the state the operation requires
    #[error("Bracket not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        expected: BracketStatus,
        actual: BracketStatus,
    },

    /// Bracket configuration changed after the generation plan was built
    #[error("Bracket {0} changed during generation, retry")]
    StaleBracket(BracketId),

    /// Deleting a bracket whose matches are being shot
    #[error("Cannot delete a running bracket")]
    BracketRunning,

    /// Match already has a winner
    #[error("Match {0} is already finished")]
    MatchAlreadyFinished(MatchId),

    /// One side of the match is still waiting for its opponent
    #[error("Match {0} is waiting for an opponent")]
    MatchNotReady(MatchId),

    /// Scores are level and no shoot-off or explicit winner decides the match
    #[error("Match {0} is tied: record a shoot-off or choose the winner")]
    MatchTied(MatchId),

    /// Bracket not found
    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// The next-round match a winner should move into does not exist
    #[error(
        "Propagation target missing in bracket {bracket_id}: round {round_no}, match {match_no}"
    )]
    PropagationTargetMissing {
        bracket_id: BracketId,
        round_no: u32,
        match_no: u32,
    },

    /// The next-round slot already holds a different entry
    #[error(
        "Slot {side} of round {round_no}, match {match_no} in bracket {bracket_id} is already taken"
    )]
    SlotOccupied {
        bracket_id: BracketId,
        round_no: u32,
        match_no: u32,
        side: Side,
    },

    /// Stored row could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BracketError {
    /// Classify the error for the calling layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::InvalidSize(_)
            | BracketError::InvalidConfig(_)
            | BracketError::InvalidEnd(_)
            | BracketError::InvalidTarget(_)
            | BracketError::WinnerNotParticipant { .. }
            | BracketError::InsufficientParticipants { .. } => ErrorKind::Validation,
            BracketError::DuplicateBracket { .. }
            | BracketError::InvalidState { .. }
            | BracketError::StaleBracket(_)
            | BracketError::BracketRunning
            | BracketError::MatchAlreadyFinished(_)
            | BracketError::MatchNotReady(_)
            | BracketError::MatchTied(_) => ErrorKind::Conflict,
            BracketError::BracketNotFound(_) | BracketError::MatchNotFound(_) => {
                ErrorKind::NotFound
            }
            BracketError::PropagationTargetMissing { .. }
            | BracketError::SlotOccupied { .. }
            | BracketError::CorruptRecord(_)
            | BracketError::Database(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Only transient store failures qualify: serialization failures, deadlocks,
    /// pool exhaustion and dropped connections.
    pub fn is_retryable(&self) -> bool {
        match self {
            BracketError::Database(sqlx::Error::Database(db)) => {
                matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
            }
            BracketError::Database(sqlx::Error::PoolTimedOut)
            | BracketError::Database(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }

    /// Get a client-safe error message that doesn't leak store internals
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::CorruptRecord(_) => {
                "Internal server error".to_string()
            }
            BracketError::PropagationTargetMissing { .. } | BracketError::SlotOccupied { .. } => {
                "Internal bracket error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
