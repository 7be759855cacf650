//! # Archery Bracket
//!
//! Single-elimination brackets for head-to-head archery matches.
//!
//! A ranked qualification list becomes a seeded bracket; the full match tree is
//! generated up front and winners are propagated round by round until the
//! final produces a champion.
//!
//! ## Lifecycle
//!
//! - **Draft**: configured, no entries or matches
//! - **Generated**: entries seeded, match tree built, byes already advanced
//! - **Running**: matches are being shot
//! - **Closed**: archived
//!
//! ## Core Modules
//!
//! - [`bracket`]: Models, seeding, bracket builder, match progression and the [`BracketManager`]
//! - [`db`]: Connection pool and the PostgreSQL and in-memory stores
//!
//! ## Example
//!
//! ```
//! use archery_bracket::seed_order;
//!
//! // Seed 1 meets seed 8, seed 4 meets seed 5, ...
//! assert_eq!(seed_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
//! ```

/// Bracket domain logic and the bracket manager.
pub mod bracket;
pub use bracket::{
    Bracket, BracketChange, BracketConfig, BracketError, BracketManager, BracketResult,
    BracketStatus, BracketType, ChangeNotifier, EndInput, ErrorKind, Match, MatchStatus,
    ScoringFormat, Side, TargetAssignment, seed_order,
};

/// Database pool and bracket stores.
pub mod db;
pub use db::{
    BracketRepository, CandidateSource, Database, DatabaseConfig, MemoryBracketRepository,
    StaticCandidates,
};
