//! Single-elimination brackets for head-to-head archery matches.
//!
//! A bracket is created as a draft for one event category, generated from the
//! category's qualification ranking into seeded entries and a full match tree,
//! then shot round by round until the final produces a champion.
//!
//! ## Example
//!
//! ```no_run
//! use archery_bracket::bracket::{
//!     BracketConfig, BracketManager, BracketType, EndInput, ScoringFormat,
//! };
//! use archery_bracket::db::{MemoryBracketRepository, StaticCandidates};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (event_id, category_id) = (Uuid::new_v4(), Uuid::new_v4());
//! let manager = BracketManager::new(
//!     Arc::new(MemoryBracketRepository::new()),
//!     Arc::new(StaticCandidates::new()),
//! );
//!
//! let config = BracketConfig::new(
//!     event_id,
//!     category_id,
//!     BracketType::Individual,
//!     ScoringFormat::RecurveSet,
//!     8,
//! );
//! let bracket = manager.create_bracket(config).await?;
//! manager.generate(bracket.id).await?;
//!
//! let view = manager.get_bracket(bracket.id).await?;
//! let opener = &view.rounds[0].matches[0].details;
//! manager
//!     .record_end(
//!         opener.id,
//!         1,
//!         EndInput::Arrows { arrows: vec!["X".into(), "10".into(), "9".into()] },
//!         EndInput::Totals { total: 27, x_count: 0, ten_count: 1 },
//!     )
//!     .await?;
//! let outcome = manager.end_match(opener.id, None).await?;
//! println!("advanced to {:?}", outcome.advanced_to);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod errors;
pub mod manager;
pub mod models;
pub mod notify;
pub mod progression;
pub mod scoring;
pub mod seeding;

pub use builder::{BracketPlan, plan_bracket, rank_candidates};
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use manager::BracketManager;
pub use models::{
    Advancement, Bracket, BracketConfig, BracketId, BracketStatus, BracketSummary, BracketType,
    BracketView, Candidate, CategoryId, EndInput, EndScore, Entry, EntryId, EventId,
    FinishOutcome, GenerationSummary, Match, MatchDetail, MatchEnd, MatchId, MatchStatus,
    MatchView, Participant, ParticipantKind, QualificationTotals, RoundView, ScoringFormat, Side,
    TargetAssignment,
};
pub use notify::{BracketChange, ChangeNotifier, NoopNotifier};
pub use scoring::{MatchScore, SHOOT_OFF_END};
pub use seeding::seed_order;
