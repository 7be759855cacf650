//! In-process bracket store.
//!
//! Backs tests and server runs without PostgreSQL. All state sits behind one
//! mutex; each operation works on a copy and swaps it in only on success, so a
//! failed operation leaves nothing behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::bracket::builder::BracketPlan;
use crate::bracket::errors::{BracketError, BracketResult};
use crate::bracket::models::{
    Bracket, BracketConfig, BracketId, BracketStatus, BracketSummary, Candidate, CategoryId,
    EndScore, Entry, EntryId, EventId, FinishOutcome, Match, MatchEnd, MatchId, ParticipantKind,
    Side, TargetAssignment,
};
use crate::bracket::progression;

use super::repository::{BracketRepository, CandidateSource};

#[derive(Debug, Clone, Default)]
struct State {
    brackets: HashMap<BracketId, Bracket>,
    entries: HashMap<BracketId, Vec<Entry>>,
    matches: HashMap<MatchId, Match>,
    ends: BTreeMap<(MatchId, i32, Side), EndScore>,
}

impl State {
    fn bracket(&self, bracket_id: BracketId) -> BracketResult<&Bracket> {
        self.brackets
            .get(&bracket_id)
            .ok_or(BracketError::BracketNotFound(bracket_id))
    }

    fn has_category(&self, except: BracketId, event_id: EventId, category_id: CategoryId) -> bool {
        self.brackets
            .values()
            .any(|b| b.id != except && b.event_id == event_id && b.category_id == category_id)
    }

    fn matches_of(&self, bracket_id: BracketId) -> Vec<Match> {
        let mut matches: Vec<Match> = self
            .matches
            .values()
            .filter(|m| m.bracket_id == bracket_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_no, m.match_no));
        matches
    }

    fn ends_of(&self, match_id: MatchId) -> Vec<MatchEnd> {
        self.ends
            .range((match_id, i32::MIN, Side::A)..=(match_id, i32::MAX, Side::B))
            .map(|(&(match_id, end_no, side), score)| MatchEnd {
                match_id,
                end_no,
                side,
                score: score.clone(),
            })
            .collect()
    }

    fn clear_tree(&mut self, bracket_id: BracketId) {
        let match_ids: Vec<MatchId> = self
            .matches
            .values()
            .filter(|m| m.bracket_id == bracket_id)
            .map(|m| m.id)
            .collect();

        self.ends.retain(|(match_id, _, _), _| !match_ids.contains(match_id));
        self.matches.retain(|_, m| m.bracket_id != bracket_id);
        self.entries.remove(&bracket_id);
    }
}

/// In-memory implementation of [`BracketRepository`]
#[derive(Debug, Clone, Default)]
pub struct MemoryBracketRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryBracketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> BracketResult<T>) -> BracketResult<T> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Run `f` against a copy of the state and keep the copy only if `f` succeeds
    fn transact<T>(&self, f: impl FnOnce(&mut State) -> BracketResult<T>) -> BracketResult<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut working = state.clone();
        let value = f(&mut working)?;
        *state = working;
        Ok(value)
    }
}

#[async_trait]
impl BracketRepository for MemoryBracketRepository {
    async fn insert_bracket(&self, bracket: &Bracket) -> BracketResult<()> {
        self.transact(|state| {
            if state.has_category(bracket.id, bracket.event_id, bracket.category_id) {
                return Err(BracketError::DuplicateBracket {
                    event_id: bracket.event_id,
                    category_id: bracket.category_id,
                });
            }
            state.brackets.insert(bracket.id, bracket.clone());
            Ok(())
        })
    }

    async fn update_draft(
        &self,
        bracket_id: BracketId,
        config: BracketConfig,
    ) -> BracketResult<Bracket> {
        self.transact(|state| {
            let mut bracket = state.bracket(bracket_id)?.clone();
            bracket.reconfigure(config)?;
            if state.has_category(bracket.id, bracket.event_id, bracket.category_id) {
                return Err(BracketError::DuplicateBracket {
                    event_id: bracket.event_id,
                    category_id: bracket.category_id,
                });
            }
            state.brackets.insert(bracket_id, bracket.clone());
            Ok(bracket)
        })
    }

    async fn find_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        self.read(|state| Ok(state.brackets.get(&bracket_id).cloned()))
    }

    async fn list_brackets(
        &self,
        event_id: EventId,
        category_id: Option<CategoryId>,
    ) -> BracketResult<Vec<BracketSummary>> {
        self.read(|state| {
            let mut summaries: Vec<BracketSummary> = state
                .brackets
                .values()
                .filter(|b| b.event_id == event_id)
                .filter(|b| category_id.is_none_or(|c| b.category_id == c))
                .map(|b| BracketSummary {
                    bracket: b.clone(),
                    match_count: state
                        .matches
                        .values()
                        .filter(|m| m.bracket_id == b.id)
                        .count(),
                })
                .collect();
            summaries.sort_by(|a, b| b.bracket.created_at.cmp(&a.bracket.created_at));
            Ok(summaries)
        })
    }

    async fn list_entries(&self, bracket_id: BracketId) -> BracketResult<Vec<Entry>> {
        self.read(|state| {
            let mut entries = state.entries.get(&bracket_id).cloned().unwrap_or_default();
            entries.sort_by_key(|e| e.seed);
            Ok(entries)
        })
    }

    async fn list_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>> {
        self.read(|state| Ok(state.matches_of(bracket_id)))
    }

    async fn list_bracket_ends(&self, bracket_id: BracketId) -> BracketResult<Vec<MatchEnd>> {
        self.read(|state| {
            Ok(state
                .matches_of(bracket_id)
                .iter()
                .flat_map(|m| state.ends_of(m.id))
                .collect())
        })
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        self.read(|state| Ok(state.matches.get(&match_id).cloned()))
    }

    async fn list_match_ends(&self, match_id: MatchId) -> BracketResult<Vec<MatchEnd>> {
        self.read(|state| Ok(state.ends_of(match_id)))
    }

    async fn store_generation(&self, bracket: &Bracket, plan: &BracketPlan) -> BracketResult<()> {
        self.transact(|state| {
            let current = state.bracket(bracket.id)?;
            if current.status != BracketStatus::Draft {
                return Err(BracketError::InvalidState {
                    expected: BracketStatus::Draft,
                    actual: current.status,
                });
            }
            if current.size != bracket.size
                || current.category_id != bracket.category_id
                || current.bracket_type != bracket.bracket_type
            {
                return Err(BracketError::StaleBracket(bracket.id));
            }

            state.clear_tree(bracket.id);
            state.entries.insert(bracket.id, plan.entries.clone());
            for m in &plan.matches {
                state.matches.insert(m.id, m.clone());
            }

            if let Some(stored) = state.brackets.get_mut(&bracket.id) {
                stored.status = BracketStatus::Generated;
                stored.generated_at = Some(plan.generated_at);
            }
            Ok(())
        })
    }

    async fn upsert_end(
        &self,
        match_id: MatchId,
        end_no: i32,
        side_a: &EndScore,
        side_b: &EndScore,
    ) -> BracketResult<Match> {
        self.transact(|state| {
            let m = state
                .matches
                .get_mut(&match_id)
                .ok_or(BracketError::MatchNotFound(match_id))?;
            progression::begin_scoring(m);
            let updated = m.clone();

            state.ends.insert((match_id, end_no, Side::A), side_a.clone());
            state.ends.insert((match_id, end_no, Side::B), side_b.clone());
            Ok(updated)
        })
    }

    async fn finish_match(
        &self,
        match_id: MatchId,
        winner: EntryId,
    ) -> BracketResult<FinishOutcome> {
        self.transact(|state| {
            let mut m = state
                .matches
                .get(&match_id)
                .cloned()
                .ok_or(BracketError::MatchNotFound(match_id))?;
            let total_rounds = state.bracket(m.bracket_id)?.round_count();

            let advanced_to = progression::finish(&mut m, winner, total_rounds)?;

            if let Some(next) = advanced_to {
                let target = state
                    .matches
                    .values_mut()
                    .find(|t| {
                        t.bracket_id == m.bracket_id
                            && t.round_no == next.round_no
                            && t.match_no == next.match_no
                    })
                    .ok_or(BracketError::PropagationTargetMissing {
                        bracket_id: m.bracket_id,
                        round_no: next.round_no,
                        match_no: next.match_no,
                    })?;
                progression::place_winner(target, next.side, winner)?;
            }

            state.matches.insert(match_id, m.clone());
            Ok(FinishOutcome {
                finished: m,
                advanced_to,
            })
        })
    }

    async fn set_schedule(
        &self,
        match_id: MatchId,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> BracketResult<Match> {
        self.transact(|state| {
            let m = state
                .matches
                .get_mut(&match_id)
                .ok_or(BracketError::MatchNotFound(match_id))?;
            m.scheduled_at = scheduled_at;
            Ok(m.clone())
        })
    }

    async fn assign_targets(
        &self,
        bracket_id: BracketId,
        assignments: &[TargetAssignment],
    ) -> BracketResult<Vec<Match>> {
        self.transact(|state| {
            state.bracket(bracket_id)?;

            let mut updated = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let m = state
                    .matches
                    .get_mut(&assignment.match_id)
                    .filter(|m| m.bracket_id == bracket_id)
                    .ok_or(BracketError::MatchNotFound(assignment.match_id))?;
                m.target_id = assignment.target_id.clone();
                updated.push(m.clone());
            }
            Ok(updated)
        })
    }

    async fn transition_status(
        &self,
        bracket_id: BracketId,
        from: BracketStatus,
        to: BracketStatus,
    ) -> BracketResult<bool> {
        self.transact(|state| match state.brackets.get_mut(&bracket_id) {
            Some(bracket) if bracket.status == from => {
                bracket.status = to;
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<()> {
        self.transact(|state| {
            if state.bracket(bracket_id)?.status == BracketStatus::Running {
                return Err(BracketError::BracketRunning);
            }
            state.clear_tree(bracket_id);
            state.brackets.remove(&bracket_id);
            Ok(())
        })
    }
}

/// Fixed candidate lists keyed by event category
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    lists: Arc<Mutex<HashMap<(EventId, CategoryId), Vec<Candidate>>>>,
}

impl StaticCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidates offered for an event category
    pub fn set(&self, event_id: EventId, category_id: CategoryId, candidates: Vec<Candidate>) {
        let mut lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        lists.insert((event_id, category_id), candidates);
    }

    pub fn with(self, event_id: EventId, category_id: CategoryId, candidates: Vec<Candidate>) -> Self {
        self.set(event_id, category_id, candidates);
        self
    }
}

#[async_trait]
impl CandidateSource for StaticCandidates {
    async fn candidates(
        &self,
        event_id: EventId,
        category_id: CategoryId,
        kind: ParticipantKind,
    ) -> BracketResult<Vec<Candidate>> {
        let lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        Ok(lists
            .get(&(event_id, category_id))
            .map(|list| {
                list.iter()
                    .filter(|c| c.participant.kind() == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
