//! Bracket data models: brackets, seeded entries, matches and scored ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use super::errors::{BracketError, BracketResult};
use super::scoring::{MAX_ARROW_VALUE, MatchScore};

/// Bracket ID type
pub type BracketId = Uuid;
/// Entry ID type
pub type EntryId = Uuid;
/// Match ID type
pub type MatchId = Uuid;
/// Event ID type
pub type EventId = Uuid;
/// Event category ID type
pub type CategoryId = Uuid;

/// Bracket sizes accepted at creation time
pub const ALLOWED_SIZES: [u32; 6] = [4, 8, 16, 32, 64, 128];

/// Default number of regular ends in a match
pub const DEFAULT_ENDS_PER_MATCH: u32 = 5;

/// Default number of arrows each side shoots per end
pub const DEFAULT_ARROWS_PER_END: u32 = 3;

/// Most regular ends a match may be configured with
pub const MAX_ENDS_PER_MATCH: u32 = 20;

/// Most arrows per side a single end may be configured with
pub const MAX_ARROWS_PER_END: u32 = 12;

/// Longest accepted target label
pub const MAX_TARGET_ID_LEN: usize = 32;

/// Whether `size` is one of [`ALLOWED_SIZES`]
pub fn is_allowed_size(size: u32) -> bool {
    ALLOWED_SIZES.contains(&size)
}

/// Number of rounds in a bracket of `size` slots (log2 of the size)
pub fn round_count(size: u32) -> u32 {
    size.trailing_zeros()
}

/// Number of matches in round `round_no` (1-based) of a bracket of `size` slots
pub fn matches_in_round(size: u32, round_no: u32) -> u32 {
    size >> round_no
}

/// Kind of competitor a bracket is played between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketType {
    #[serde(rename = "individual")]
    Individual,
    /// Three-archer teams
    #[serde(rename = "team3")]
    Team3,
    /// Mixed pairs
    #[serde(rename = "mixed2")]
    Mixed2,
}

impl BracketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketType::Individual => "individual",
            BracketType::Team3 => "team3",
            BracketType::Mixed2 => "mixed2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(BracketType::Individual),
            "team3" => Some(BracketType::Team3),
            "mixed2" => Some(BracketType::Mixed2),
            _ => None,
        }
    }

    /// Kind of participant that occupies this bracket's entries
    pub fn participant_kind(&self) -> ParticipantKind {
        match self {
            BracketType::Individual => ParticipantKind::Archer,
            BracketType::Team3 | BracketType::Mixed2 => ParticipantKind::Team,
        }
    }
}

/// Scoring ruleset used when deciding a match from its ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringFormat {
    /// Set system: 2 points per won end, 1 each per tied end
    RecurveSet,
    /// Cumulative total of all ends
    CompoundTotal,
}

impl ScoringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringFormat::RecurveSet => "recurve_set",
            ScoringFormat::CompoundTotal => "compound_total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recurve_set" => Some(ScoringFormat::RecurveSet),
            "compound_total" => Some(ScoringFormat::CompoundTotal),
            _ => None,
        }
    }
}

/// Bracket lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketStatus {
    /// Created, no entries or matches yet
    Draft,
    /// Entries seeded and match tree created
    Generated,
    /// Matches are being shot
    Running,
    /// Finished and archived
    Closed,
}

impl BracketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketStatus::Draft => "draft",
            BracketStatus::Generated => "generated",
            BracketStatus::Running => "running",
            BracketStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(BracketStatus::Draft),
            "generated" => Some(BracketStatus::Generated),
            "running" => Some(BracketStatus::Running),
            "closed" => Some(BracketStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BracketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Running,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Running => "running",
            MatchStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(MatchStatus::Scheduled),
            "running" => Some(MatchStatus::Running),
            "finished" => Some(MatchStatus::Finished),
            _ => None,
        }
    }
}

/// One of the two slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Slot a winner of `match_no` occupies in the next round: odd numbers feed A, even feed B
    pub fn for_match_no(match_no: u32) -> Self {
        if match_no % 2 == 1 { Side::A } else { Side::B }
    }

    pub fn other(&self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(Side::A),
            "B" => Some(Side::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator for [`Participant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Archer,
    Team,
}

impl ParticipantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Archer => "archer",
            ParticipantKind::Team => "team",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "archer" => Some(ParticipantKind::Archer),
            "team" => Some(ParticipantKind::Team),
            _ => None,
        }
    }
}

/// The competitor behind an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Participant {
    Archer(Uuid),
    Team(Uuid),
}

impl Participant {
    pub fn new(kind: ParticipantKind, id: Uuid) -> Self {
        match kind {
            ParticipantKind::Archer => Participant::Archer(id),
            ParticipantKind::Team => Participant::Team(id),
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        match self {
            Participant::Archer(_) => ParticipantKind::Archer,
            Participant::Team(_) => ParticipantKind::Team,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Participant::Archer(id) | Participant::Team(id) => *id,
        }
    }
}

/// Qualification totals used for seeding, frozen on the entry at generation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationTotals {
    pub total_score: i32,
    pub x_count: i32,
    pub ten_count: i32,
}

impl QualificationTotals {
    pub fn new(total_score: i32, x_count: i32, ten_count: i32) -> Self {
        Self {
            total_score,
            x_count,
            ten_count,
        }
    }

    /// Ranking order: higher score first, then more Xs, then more 10s.
    ///
    /// `Ordering::Less` means `self` ranks ahead of `other`.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .total_score
            .cmp(&self.total_score)
            .then(other.x_count.cmp(&self.x_count))
            .then(other.ten_count.cmp(&self.ten_count))
    }
}

/// A ranked qualifier offered to the bracket builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub participant: Participant,
    pub totals: QualificationTotals,
}

impl Candidate {
    pub fn new(participant: Participant, totals: QualificationTotals) -> Self {
        Self {
            participant,
            totals,
        }
    }
}

/// Operator-supplied bracket configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketConfig {
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub bracket_type: BracketType,
    pub format: ScoringFormat,
    pub size: u32,
    pub ends_per_match: u32,
    pub arrows_per_end: u32,
}

impl BracketConfig {
    /// Create a configuration with the default ends and arrows per end
    pub fn new(
        event_id: EventId,
        category_id: CategoryId,
        bracket_type: BracketType,
        format: ScoringFormat,
        size: u32,
    ) -> Self {
        Self {
            event_id,
            category_id,
            bracket_type,
            format,
            size,
            ends_per_match: DEFAULT_ENDS_PER_MATCH,
            arrows_per_end: DEFAULT_ARROWS_PER_END,
        }
    }

    /// Reject sizes outside [`ALLOWED_SIZES`] and ends or arrows outside
    /// `1..=MAX_ENDS_PER_MATCH` / `1..=MAX_ARROWS_PER_END`
    pub fn validate(&self) -> BracketResult<()> {
        if !is_allowed_size(self.size) {
            return Err(BracketError::InvalidSize(self.size));
        }
        if !(1..=MAX_ENDS_PER_MATCH).contains(&self.ends_per_match) {
            return Err(BracketError::InvalidConfig(format!(
                "ends_per_match must be between 1 and {MAX_ENDS_PER_MATCH}, got {}",
                self.ends_per_match
            )));
        }
        if !(1..=MAX_ARROWS_PER_END).contains(&self.arrows_per_end) {
            return Err(BracketError::InvalidConfig(format!(
                "arrows_per_end must be between 1 and {MAX_ARROWS_PER_END}, got {}",
                self.arrows_per_end
            )));
        }
        Ok(())
    }
}

/// Elimination bracket for one event category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: BracketId,
    /// Human-readable code, `BR-YYYYMMDD-xxxxxxxx`
    pub code: String,
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub bracket_type: BracketType,
    pub format: ScoringFormat,
    pub size: u32,
    pub ends_per_match: u32,
    pub arrows_per_end: u32,
    pub status: BracketStatus,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bracket {
    /// Build a fresh draft bracket from a validated configuration
    pub fn draft(config: BracketConfig, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let simple = id.simple().to_string();
        let code = format!("BR-{}-{}", now.format("%Y%m%d"), &simple[..8]);

        Self {
            id,
            code,
            event_id: config.event_id,
            category_id: config.category_id,
            bracket_type: config.bracket_type,
            format: config.format,
            size: config.size,
            ends_per_match: config.ends_per_match,
            arrows_per_end: config.arrows_per_end,
            status: BracketStatus::Draft,
            generated_at: None,
            created_at: now,
        }
    }

    /// Apply a new configuration to a draft bracket, keeping identity and lifecycle.
    ///
    /// The event a bracket belongs to never changes; only its category and
    /// match settings do.
    pub fn reconfigure(&mut self, config: BracketConfig) -> BracketResult<()> {
        if self.status != BracketStatus::Draft {
            return Err(BracketError::InvalidState {
                expected: BracketStatus::Draft,
                actual: self.status,
            });
        }
        if config.event_id != self.event_id {
            return Err(BracketError::InvalidConfig(
                "a bracket cannot move to another event".to_string(),
            ));
        }
        config.validate()?;

        self.category_id = config.category_id;
        self.bracket_type = config.bracket_type;
        self.format = config.format;
        self.size = config.size;
        self.ends_per_match = config.ends_per_match;
        self.arrows_per_end = config.arrows_per_end;
        Ok(())
    }

    pub fn round_count(&self) -> u32 {
        round_count(self.size)
    }
}

/// Seeded occupant of one bracket slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub bracket_id: BracketId,
    pub seed: u32,
    pub participant: Participant,
    pub qualification: QualificationTotals,
}

/// Head-to-head match addressed by `(round_no, match_no)` within its bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub bracket_id: BracketId,
    pub round_no: u32,
    pub match_no: u32,
    pub entry_a_id: Option<EntryId>,
    pub entry_b_id: Option<EntryId>,
    pub winner_entry_id: Option<EntryId>,
    pub is_bye: bool,
    pub status: MatchStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Target butt the match is shot on
    #[serde(default)]
    pub target_id: Option<String>,
}

impl Match {
    /// An empty scheduled match
    pub fn empty(bracket_id: BracketId, round_no: u32, match_no: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            bracket_id,
            round_no,
            match_no,
            entry_a_id: None,
            entry_b_id: None,
            winner_entry_id: None,
            is_bye: false,
            status: MatchStatus::Scheduled,
            scheduled_at: None,
            target_id: None,
        }
    }

    pub fn entry(&self, side: Side) -> Option<EntryId> {
        match side {
            Side::A => self.entry_a_id,
            Side::B => self.entry_b_id,
        }
    }

    pub fn set_entry(&mut self, side: Side, entry_id: Option<EntryId>) {
        match side {
            Side::A => self.entry_a_id = entry_id,
            Side::B => self.entry_b_id = entry_id,
        }
    }

    /// Both opponents are known
    pub fn has_both_entries(&self) -> bool {
        self.entry_a_id.is_some() && self.entry_b_id.is_some()
    }

    /// Which side `entry_id` plays on, if it is in this match at all
    pub fn side_of(&self, entry_id: EntryId) -> Option<Side> {
        if self.entry_a_id == Some(entry_id) {
            Some(Side::A)
        } else if self.entry_b_id == Some(entry_id) {
            Some(Side::B)
        } else {
            None
        }
    }
}

/// One side's result for a single end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndScore {
    pub total: i32,
    pub x_count: i32,
    pub ten_count: i32,
    /// Arrow values the totals were derived from, empty when only totals were entered
    #[serde(default)]
    pub arrows: Vec<String>,
}

/// One side's submission for an end: precomputed totals or the arrow values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndInput {
    Arrows {
        arrows: Vec<String>,
    },
    Totals {
        total: i32,
        #[serde(default)]
        x_count: i32,
        #[serde(default)]
        ten_count: i32,
    },
}

impl EndInput {
    /// Resolve the submission into a stored end score for an end of
    /// `arrows_per_end` arrows.
    ///
    /// # Errors
    ///
    /// Returns `BracketError::InvalidEnd` for more arrows than the end allows,
    /// negative totals, more Xs than tens, or counts and totals no end of
    /// `arrows_per_end` arrows can reach.
    pub fn into_score(self, arrows_per_end: u32) -> BracketResult<EndScore> {
        let max_arrows = i64::from(arrows_per_end);

        match self {
            EndInput::Arrows { arrows } => {
                if arrows.len() as u64 > u64::from(arrows_per_end) {
                    return Err(BracketError::InvalidEnd(format!(
                        "{} arrows submitted, an end has at most {arrows_per_end}",
                        arrows.len()
                    )));
                }
                EndScore::from_arrows(&arrows)
            }
            EndInput::Totals {
                total,
                x_count,
                ten_count,
            } => {
                if total < 0 || x_count < 0 || ten_count < 0 {
                    return Err(BracketError::InvalidEnd(
                        "totals cannot be negative".to_string(),
                    ));
                }
                if x_count > ten_count {
                    return Err(BracketError::InvalidEnd(
                        "x_count cannot exceed ten_count".to_string(),
                    ));
                }
                if i64::from(ten_count) > max_arrows {
                    return Err(BracketError::InvalidEnd(format!(
                        "ten_count {ten_count} exceeds {arrows_per_end} arrows"
                    )));
                }
                let max_total = max_arrows * i64::from(MAX_ARROW_VALUE);
                if i64::from(total) > max_total {
                    return Err(BracketError::InvalidEnd(format!(
                        "total {total} exceeds the maximum of {max_total} for {arrows_per_end} arrows"
                    )));
                }
                Ok(EndScore::from_totals(total, x_count, ten_count))
            }
        }
    }
}

/// Target for one match of a bulk assignment; `None` clears it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAssignment {
    pub match_id: MatchId,
    #[serde(default)]
    pub target_id: Option<String>,
}

impl TargetAssignment {
    pub fn new(match_id: MatchId, target_id: Option<String>) -> Self {
        Self {
            match_id,
            target_id,
        }
    }

    /// Trim the label and treat a blank one as clearing the target
    pub fn normalized(self) -> BracketResult<Self> {
        let target_id = match self.target_id {
            Some(label) if label.trim().is_empty() => None,
            Some(label) => {
                let label = label.trim().to_string();
                if label.chars().count() > MAX_TARGET_ID_LEN {
                    return Err(BracketError::InvalidTarget(format!(
                        "target '{label}' is longer than {MAX_TARGET_ID_LEN} characters"
                    )));
                }
                Some(label)
            }
            None => None,
        };

        Ok(Self {
            match_id: self.match_id,
            target_id,
        })
    }
}

/// Scored end for one side of a match, keyed by `(match_id, end_no, side)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEnd {
    pub match_id: MatchId,
    pub end_no: i32,
    pub side: Side,
    #[serde(flatten)]
    pub score: EndScore,
}

/// Slot of a next-round match that a winner is written into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advancement {
    pub round_no: u32,
    pub match_no: u32,
    pub side: Side,
}

/// Result of finishing a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishOutcome {
    pub finished: Match,
    /// Where the winner was written; `None` when this was the final
    pub advanced_to: Option<Advancement>,
}

impl FinishOutcome {
    /// Winner of the final, if this outcome finished the last round
    pub fn champion(&self) -> Option<EntryId> {
        if self.advanced_to.is_none() {
            self.finished.winner_entry_id
        } else {
            None
        }
    }
}

/// Result of a successful generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub bracket_id: BracketId,
    pub entry_count: usize,
    pub round_count: u32,
    pub bye_count: usize,
}

/// Listing row: a bracket with the number of matches it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSummary {
    #[serde(flatten)]
    pub bracket: Bracket,
    pub match_count: usize,
}

/// Match with its computed score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    #[serde(flatten)]
    pub details: Match,
    pub score: MatchScore,
}

/// All matches of one round, ordered by match number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub round_no: u32,
    pub matches: Vec<MatchView>,
}

/// Bracket with entries and matches grouped by round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub bracket: Bracket,
    pub entries: Vec<Entry>,
    pub rounds: Vec<RoundView>,
}

/// Match with its recorded ends and computed score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub details: Match,
    pub ends: Vec<MatchEnd>,
    pub score: MatchScore,
}
