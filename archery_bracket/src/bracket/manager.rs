//! Bracket manager: the operations exposed to callers.
//!
//! Each operation validates its input, runs as one store transaction and then
//! publishes a [`BracketChange`]. Publishing happens after commit and can
//! never fail the operation.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::builder::{plan_bracket, rank_candidates};
use super::errors::{BracketError, BracketResult};
use super::models::{
    Bracket, BracketConfig, BracketId, BracketStatus, BracketSummary, BracketView, CategoryId,
    EndInput, EntryId, EventId, FinishOutcome, GenerationSummary, Match, MatchDetail, MatchEnd,
    MatchId, MatchStatus, MatchView, RoundView, TargetAssignment,
};
use super::notify::{BracketChange, ChangeNotifier, NoopNotifier};
use super::scoring::MatchScore;
use crate::db::{BracketRepository, CandidateSource};

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    repo: Arc<dyn BracketRepository>,
    candidates: Arc<dyn CandidateSource>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl BracketManager {
    /// Create a manager that publishes nowhere
    pub fn new(repo: Arc<dyn BracketRepository>, candidates: Arc<dyn CandidateSource>) -> Self {
        Self {
            repo,
            candidates,
            notifier: Arc::new(NoopNotifier),
        }
    }

    /// Publish committed changes to `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Create a draft bracket for an event category
    pub async fn create_bracket(&self, config: BracketConfig) -> BracketResult<Bracket> {
        config.validate()?;

        let bracket = Bracket::draft(config, Utc::now());
        self.repo.insert_bracket(&bracket).await?;

        log::info!(
            "Created bracket {} ({}) for event {} category {}, size {}",
            bracket.code,
            bracket.id,
            bracket.event_id,
            bracket.category_id,
            bracket.size
        );
        Ok(bracket)
    }

    /// Change the configuration of a draft bracket
    pub async fn update_bracket(
        &self,
        bracket_id: BracketId,
        config: BracketConfig,
    ) -> BracketResult<Bracket> {
        config.validate()?;

        let bracket = self.repo.update_draft(bracket_id, config).await?;
        log::info!("Updated draft bracket {}", bracket.id);
        Ok(bracket)
    }

    /// Brackets of an event with their match counts, newest first
    pub async fn list_brackets(
        &self,
        event_id: EventId,
        category_id: Option<CategoryId>,
    ) -> BracketResult<Vec<BracketSummary>> {
        self.repo.list_brackets(event_id, category_id).await
    }

    /// Seed a draft bracket from its category's qualification ranking and build the match tree
    ///
    /// # Errors
    ///
    /// * `BracketError::BracketNotFound` - Unknown bracket
    /// * `BracketError::InvalidState` - Bracket is not a draft
    /// * `BracketError::InsufficientParticipants` - Fewer candidates than bracket slots;
    ///   nothing is written
    pub async fn generate(&self, bracket_id: BracketId) -> BracketResult<GenerationSummary> {
        let bracket = self.load_bracket(bracket_id).await?;
        if bracket.status != BracketStatus::Draft {
            return Err(BracketError::InvalidState {
                expected: BracketStatus::Draft,
                actual: bracket.status,
            });
        }

        let candidates = self
            .candidates
            .candidates(
                bracket.event_id,
                bracket.category_id,
                bracket.bracket_type.participant_kind(),
            )
            .await?;

        let required = bracket.size as usize;
        if candidates.len() < required {
            log::warn!(
                "Cannot generate bracket {}: {} candidates for {} slots",
                bracket.id,
                candidates.len(),
                required
            );
            return Err(BracketError::InsufficientParticipants {
                required,
                available: candidates.len(),
            });
        }

        let ranked = rank_candidates(candidates);
        let plan = plan_bracket(&bracket, &ranked, Utc::now())?;
        self.repo.store_generation(&bracket, &plan).await?;

        let summary = plan.summary(bracket.round_count());
        log::info!(
            "Generated bracket {}: {} entries, {} rounds, {} byes",
            bracket.id,
            summary.entry_count,
            summary.round_count,
            summary.bye_count
        );
        self.publish(BracketChange::BracketGenerated {
            event_id: bracket.event_id,
            summary,
        });
        Ok(summary)
    }

    /// Bracket record alone, without entries or matches
    pub async fn bracket(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        self.load_bracket(bracket_id).await
    }

    /// Bracket with its entries and scored matches grouped by round
    pub async fn get_bracket(&self, bracket_id: BracketId) -> BracketResult<BracketView> {
        let bracket = self.load_bracket(bracket_id).await?;
        let entries = self.repo.list_entries(bracket_id).await?;
        let matches = self.repo.list_matches(bracket_id).await?;

        let mut ends_by_match: HashMap<MatchId, Vec<MatchEnd>> = HashMap::new();
        for end in self.repo.list_bracket_ends(bracket_id).await? {
            ends_by_match.entry(end.match_id).or_default().push(end);
        }

        let mut rounds: BTreeMap<u32, Vec<MatchView>> = BTreeMap::new();
        for m in matches {
            let score = ends_by_match
                .get(&m.id)
                .map(|ends| MatchScore::compute(ends))
                .unwrap_or_default();
            rounds
                .entry(m.round_no)
                .or_default()
                .push(MatchView { details: m, score });
        }

        Ok(BracketView {
            bracket,
            entries,
            rounds: rounds
                .into_iter()
                .map(|(round_no, matches)| RoundView { round_no, matches })
                .collect(),
        })
    }

    /// Match with its recorded ends and score summary
    pub async fn get_match(&self, match_id: MatchId) -> BracketResult<MatchDetail> {
        let details = self.load_match(match_id).await?;
        let ends = self.repo.list_match_ends(match_id).await?;
        let score = MatchScore::compute(&ends);

        Ok(MatchDetail {
            details,
            ends,
            score,
        })
    }

    /// Record both sides of an end, overwriting any earlier submission of that end
    ///
    /// # Arguments
    ///
    /// * `match_id` - Match being shot
    /// * `end_no` - End number, 1-based; [`super::scoring::SHOOT_OFF_END`] for a shoot-off
    /// * `side_a` / `side_b` - Totals or arrow values for each side, at most
    ///   the bracket's `arrows_per_end` arrows
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidEnd` - Bad end number, too many arrows or an unreachable total
    /// * `BracketError::MatchNotReady` - A slot still waits for its opponent
    pub async fn record_end(
        &self,
        match_id: MatchId,
        end_no: i32,
        side_a: EndInput,
        side_b: EndInput,
    ) -> BracketResult<Match> {
        if end_no < 1 {
            return Err(BracketError::InvalidEnd(format!(
                "end number must be at least 1, got {end_no}"
            )));
        }

        let m = self.load_match(match_id).await?;
        if !m.has_both_entries() {
            return Err(BracketError::MatchNotReady(match_id));
        }
        let bracket = self.load_bracket(m.bracket_id).await?;
        let score_a = side_a.into_score(bracket.arrows_per_end)?;
        let score_b = side_b.into_score(bracket.arrows_per_end)?;

        let m = self
            .repo
            .upsert_end(match_id, end_no, &score_a, &score_b)
            .await?;
        log::debug!(
            "Recorded end {} of match {}: {} - {}",
            end_no,
            match_id,
            score_a.total,
            score_b.total
        );

        self.publish(BracketChange::EndRecorded {
            event_id: bracket.event_id,
            bracket_id: m.bracket_id,
            match_id,
            end_no,
        });
        Ok(m)
    }

    /// Set or clear a match's scheduled start
    pub async fn schedule_match(
        &self,
        match_id: MatchId,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> BracketResult<Match> {
        self.repo.set_schedule(match_id, scheduled_at).await
    }

    /// Set or clear the targets of several matches of a bracket at once
    ///
    /// Blank labels clear a match's target. Nothing is written unless every
    /// match belongs to the bracket.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidTarget` - Label too long, or a match listed twice
    /// * `BracketError::BracketNotFound` - Unknown bracket
    /// * `BracketError::MatchNotFound` - A match is not part of the bracket
    pub async fn assign_targets(
        &self,
        bracket_id: BracketId,
        assignments: Vec<TargetAssignment>,
    ) -> BracketResult<Vec<Match>> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if !seen.insert(assignment.match_id) {
                return Err(BracketError::InvalidTarget(format!(
                    "match {} is listed more than once",
                    assignment.match_id
                )));
            }
            normalized.push(assignment.normalized()?);
        }

        let bracket = self.load_bracket(bracket_id).await?;
        let matches = self.repo.assign_targets(bracket_id, &normalized).await?;
        log::info!(
            "Assigned targets to {} matches of bracket {}",
            matches.len(),
            bracket_id
        );

        self.publish(BracketChange::TargetsAssigned {
            event_id: bracket.event_id,
            bracket_id,
            matches: matches.clone(),
        });
        Ok(matches)
    }

    /// Finish a match with an explicit winner and move the winner on
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - Unknown match
    /// * `BracketError::WinnerNotParticipant` - `winner` does not play in the match
    /// * `BracketError::MatchAlreadyFinished` - Winner already recorded
    /// * `BracketError::MatchNotReady` - The opponent is not known yet
    pub async fn finish_match(
        &self,
        match_id: MatchId,
        winner: EntryId,
    ) -> BracketResult<FinishOutcome> {
        let outcome = self.repo.finish_match(match_id, winner).await?;

        match (outcome.advanced_to, outcome.champion()) {
            (Some(next), _) => log::info!(
                "Match {} won by {}, advancing to round {} match {} side {}",
                match_id,
                winner,
                next.round_no,
                next.match_no,
                next.side
            ),
            (None, Some(champion)) => log::info!(
                "Final {} won by {}, bracket {} has its champion",
                match_id,
                champion,
                outcome.finished.bracket_id
            ),
            (None, None) => {}
        }

        if let Some(event_id) = self.event_of(outcome.finished.bracket_id).await {
            self.publish(BracketChange::MatchFinished {
                event_id,
                finished: outcome.finished.clone(),
                advanced_to: outcome.advanced_to,
                champion: outcome.champion(),
            });
        }
        Ok(outcome)
    }

    /// Decide a match from its recorded ends and finish it
    ///
    /// The shoot-off end settles a level score. When it is still level,
    /// `override_winner` chooses the winner; without one the match stays open.
    pub async fn end_match(
        &self,
        match_id: MatchId,
        override_winner: Option<EntryId>,
    ) -> BracketResult<FinishOutcome> {
        let m = self.load_match(match_id).await?;
        if m.status == MatchStatus::Finished {
            return Err(BracketError::MatchAlreadyFinished(match_id));
        }
        if !m.has_both_entries() {
            return Err(BracketError::MatchNotReady(match_id));
        }
        let bracket = self.load_bracket(m.bracket_id).await?;
        let ends = self.repo.list_match_ends(match_id).await?;
        let score = MatchScore::compute(&ends);

        let winner = match score.leader(bracket.format) {
            Some(side) => m.entry(side).ok_or_else(|| {
                BracketError::InvalidEnd(format!("side {side} of match {match_id} has no entry"))
            })?,
            None => {
                let winner = override_winner.ok_or(BracketError::MatchTied(match_id))?;
                log::info!("Match {match_id} is tied, using override winner {winner}");
                winner
            }
        };

        self.finish_match(match_id, winner).await
    }

    /// Open a generated bracket for shooting
    pub async fn start_bracket(&self, bracket_id: BracketId) -> BracketResult<()> {
        self.transition(bracket_id, BracketStatus::Generated, BracketStatus::Running)
            .await
    }

    /// Close a running bracket
    pub async fn close_bracket(&self, bracket_id: BracketId) -> BracketResult<()> {
        self.transition(bracket_id, BracketStatus::Running, BracketStatus::Closed)
            .await
    }

    /// Delete a bracket that is not running, with everything under it
    pub async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<()> {
        let bracket = self.load_bracket(bracket_id).await?;
        self.repo.delete_bracket(bracket_id).await?;

        log::info!("Deleted bracket {} ({})", bracket.code, bracket_id);
        self.publish(BracketChange::BracketDeleted {
            event_id: bracket.event_id,
            bracket_id,
        });
        Ok(())
    }

    async fn transition(
        &self,
        bracket_id: BracketId,
        from: BracketStatus,
        to: BracketStatus,
    ) -> BracketResult<()> {
        if !self.repo.transition_status(bracket_id, from, to).await? {
            // Lost the compare-and-set; report why
            let bracket = self.load_bracket(bracket_id).await?;
            return Err(BracketError::InvalidState {
                expected: from,
                actual: bracket.status,
            });
        }

        log::info!("Bracket {bracket_id} moved from {from} to {to}");
        if let Some(event_id) = self.event_of(bracket_id).await {
            self.publish(BracketChange::BracketStatusChanged {
                event_id,
                bracket_id,
                status: to,
            });
        }
        Ok(())
    }

    async fn load_bracket(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        self.repo
            .find_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))
    }

    async fn load_match(&self, match_id: MatchId) -> BracketResult<Match> {
        self.repo
            .find_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    /// Event a bracket belongs to, for notifications only
    async fn event_of(&self, bracket_id: BracketId) -> Option<EventId> {
        match self.repo.find_bracket(bracket_id).await {
            Ok(bracket) => bracket.map(|b| b.event_id),
            Err(e) => {
                log::warn!("Skipping change notification for bracket {bracket_id}: {e}");
                None
            }
        }
    }

    fn publish(&self, change: BracketChange) {
        self.notifier.notify(&change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{
        BracketType, Candidate, Participant, QualificationTotals, ScoringFormat, Side,
    };
    use crate::bracket::scoring::SHOOT_OFF_END;
    use crate::db::{MemoryBracketRepository, StaticCandidates};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingNotifier {
        changes: Mutex<Vec<BracketChange>>,
    }

    impl ChangeNotifier for RecordingNotifier {
        fn notify(&self, change: &BracketChange) {
            self.changes.lock().unwrap().push(change.clone());
        }
    }

    fn candidates(count: usize) -> Vec<Candidate> {
        (0..count)
            .map(|i| {
                Candidate::new(
                    Participant::Archer(Uuid::new_v4()),
                    QualificationTotals::new(650 - i as i32, 10, 20),
                )
            })
            .collect()
    }

    async fn generated(size: u32, format: ScoringFormat) -> (BracketManager, Bracket) {
        let (event, category) = (Uuid::new_v4(), Uuid::new_v4());
        let source = StaticCandidates::new().with(event, category, candidates(size as usize));
        let manager = BracketManager::new(
            Arc::new(MemoryBracketRepository::new()),
            Arc::new(source),
        );

        let bracket = manager
            .create_bracket(BracketConfig::new(
                event,
                category,
                BracketType::Individual,
                format,
                size,
            ))
            .await
            .unwrap();
        manager.generate(bracket.id).await.unwrap();
        (manager, bracket)
    }

    async fn first_match(manager: &BracketManager, bracket_id: BracketId) -> Match {
        let view = manager.get_bracket(bracket_id).await.unwrap();
        view.rounds[0].matches[0].details.clone()
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_size() {
        let manager = BracketManager::new(
            Arc::new(MemoryBracketRepository::new()),
            Arc::new(StaticCandidates::new()),
        );
        let err = manager
            .create_bracket(BracketConfig::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                BracketType::Individual,
                ScoringFormat::RecurveSet,
                12,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::InvalidSize(12)));
    }

    #[tokio::test]
    async fn test_end_match_decides_by_set_points() {
        let (manager, bracket) = generated(4, ScoringFormat::RecurveSet).await;
        let m = first_match(&manager, bracket.id).await;

        let totals = |total| EndInput::Totals {
            total,
            x_count: 0,
            ten_count: 0,
        };
        manager.record_end(m.id, 1, totals(27), totals(29)).await.unwrap();
        manager.record_end(m.id, 2, totals(28), totals(28)).await.unwrap();
        manager.record_end(m.id, 3, totals(25), totals(30)).await.unwrap();

        let detail = manager.get_match(m.id).await.unwrap();
        assert_eq!(detail.details.status, MatchStatus::Running);
        assert_eq!((detail.score.set_points_a, detail.score.set_points_b), (1, 5));

        let outcome = manager.end_match(m.id, None).await.unwrap();
        assert_eq!(outcome.finished.winner_entry_id, m.entry_b_id);
    }

    #[tokio::test]
    async fn test_end_match_tied_needs_shoot_off_or_override() {
        let (manager, bracket) = generated(4, ScoringFormat::CompoundTotal).await;
        let m = first_match(&manager, bracket.id).await;

        let totals = |total| EndInput::Totals {
            total,
            x_count: 0,
            ten_count: 0,
        };
        manager.record_end(m.id, 1, totals(29), totals(29)).await.unwrap();
        assert!(matches!(
            manager.end_match(m.id, None).await,
            Err(BracketError::MatchTied(_))
        ));

        let arrows = |a: &str| EndInput::Arrows {
            arrows: vec![a.to_string()],
        };
        manager
            .record_end(m.id, SHOOT_OFF_END, arrows("10"), arrows("X"))
            .await
            .unwrap();
        let detail = manager.get_match(m.id).await.unwrap();
        assert_eq!(detail.score.shoot_off_winner, Some(Side::B));

        // the shoot-off outranks the override
        let outcome = manager.end_match(m.id, m.entry_a_id).await.unwrap();
        assert_eq!(outcome.finished.winner_entry_id, m.entry_b_id);
    }

    #[tokio::test]
    async fn test_end_match_override_on_tie() {
        let (manager, bracket) = generated(4, ScoringFormat::RecurveSet).await;
        let m = first_match(&manager, bracket.id).await;

        let outcome = manager.end_match(m.id, m.entry_a_id).await.unwrap();
        assert_eq!(outcome.finished.winner_entry_id, m.entry_a_id);

        assert!(matches!(
            manager.end_match(m.id, m.entry_a_id).await,
            Err(BracketError::MatchAlreadyFinished(_))
        ));
    }

    #[tokio::test]
    async fn test_record_end_rejects_bad_end_number() {
        let (manager, bracket) = generated(4, ScoringFormat::RecurveSet).await;
        let m = first_match(&manager, bracket.id).await;

        let err = manager
            .record_end(
                m.id,
                0,
                EndInput::Totals {
                    total: 10,
                    x_count: 0,
                    ten_count: 0,
                },
                EndInput::Totals {
                    total: 10,
                    x_count: 0,
                    ten_count: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::InvalidEnd(_)));
    }

    #[tokio::test]
    async fn test_schedule_match() {
        let (manager, bracket) = generated(4, ScoringFormat::RecurveSet).await;
        let m = first_match(&manager, bracket.id).await;
        let at = Utc::now();

        let scheduled = manager.schedule_match(m.id, Some(at)).await.unwrap();
        assert_eq!(scheduled.scheduled_at, Some(at));

        let cleared = manager.schedule_match(m.id, None).await.unwrap();
        assert_eq!(cleared.scheduled_at, None);

        assert!(matches!(
            manager.schedule_match(Uuid::new_v4(), None).await,
            Err(BracketError::MatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_changes_are_published_to_the_event() {
        let (event, category) = (Uuid::new_v4(), Uuid::new_v4());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = BracketManager::new(
            Arc::new(MemoryBracketRepository::new()),
            Arc::new(StaticCandidates::new().with(event, category, candidates(4))),
        )
        .with_notifier(notifier.clone());

        let bracket = manager
            .create_bracket(BracketConfig::new(
                event,
                category,
                BracketType::Individual,
                ScoringFormat::RecurveSet,
                4,
            ))
            .await
            .unwrap();
        manager.generate(bracket.id).await.unwrap();
        manager.start_bracket(bracket.id).await.unwrap();
        let m = first_match(&manager, bracket.id).await;
        manager.finish_match(m.id, m.entry_a_id.unwrap()).await.unwrap();

        let changes = notifier.changes.lock().unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.event_id() == event));
        assert!(matches!(changes[0], BracketChange::BracketGenerated { .. }));
        assert!(matches!(
            changes[1],
            BracketChange::BracketStatusChanged {
                status: BracketStatus::Running,
                ..
            }
        ));
        assert!(matches!(changes[2], BracketChange::MatchFinished { .. }));
    }

    #[tokio::test]
    async fn test_record_end_rejects_unreachable_totals() {
        let (manager, bracket) = generated(4, ScoringFormat::CompoundTotal).await;
        let m = first_match(&manager, bracket.id).await;

        let totals = |total| EndInput::Totals {
            total,
            x_count: 0,
            ten_count: 0,
        };
        for _ in 0..2 {
            let err = manager
                .record_end(m.id, 1, totals(i32::MAX), totals(1))
                .await
                .unwrap_err();
            assert!(matches!(err, BracketError::InvalidEnd(_)));
        }
        assert!(matches!(
            manager.record_end(m.id, 2, totals(30), totals(31)).await,
            Err(BracketError::InvalidEnd(_))
        ));

        let detail = manager.get_match(m.id).await.unwrap();
        assert!(detail.ends.is_empty());
        assert_eq!(detail.details.status, MatchStatus::Scheduled);
        manager.get_bracket(bracket.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_end_limits_arrows_to_the_bracket_format() {
        let (manager, bracket) = generated(4, ScoringFormat::RecurveSet).await;
        let m = first_match(&manager, bracket.id).await;
        assert_eq!(bracket.arrows_per_end, 3);

        let arrows = |n: usize| EndInput::Arrows {
            arrows: vec!["9".to_string(); n],
        };
        let err = manager
            .record_end(m.id, 1, arrows(7), arrows(3))
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::InvalidEnd(_)));

        manager.record_end(m.id, 1, arrows(3), arrows(2)).await.unwrap();
        let detail = manager.get_match(m.id).await.unwrap();
        assert_eq!((detail.score.total_a, detail.score.total_b), (27, 18));
    }

    #[tokio::test]
    async fn test_later_round_waits_for_both_feeders() {
        let (manager, bracket) = generated(4, ScoringFormat::RecurveSet).await;
        let view = manager.get_bracket(bracket.id).await.unwrap();
        let r1m1 = view.rounds[0].matches[0].details.clone();
        let r1m2 = view.rounds[0].matches[1].details.clone();
        let final_id = view.rounds[1].matches[0].details.id;

        let first = r1m1.entry_a_id.unwrap();
        manager.finish_match(r1m1.id, first).await.unwrap();

        assert!(matches!(
            manager.finish_match(final_id, first).await,
            Err(BracketError::MatchNotReady(_))
        ));
        assert!(matches!(
            manager.end_match(final_id, Some(first)).await,
            Err(BracketError::MatchNotReady(_))
        ));
        let totals = EndInput::Totals {
            total: 27,
            x_count: 0,
            ten_count: 0,
        };
        assert!(matches!(
            manager.record_end(final_id, 1, totals.clone(), totals).await,
            Err(BracketError::MatchNotReady(_))
        ));

        let second = r1m2.entry_b_id.unwrap();
        manager.finish_match(r1m2.id, second).await.unwrap();

        let final_match = manager.get_match(final_id).await.unwrap().details;
        assert_eq!(final_match.status, MatchStatus::Scheduled);
        assert_eq!(
            (final_match.entry_a_id, final_match.entry_b_id),
            (Some(first), Some(second))
        );

        let outcome = manager.finish_match(final_id, second).await.unwrap();
        assert_eq!(outcome.champion(), Some(second));
    }

    #[tokio::test]
    async fn test_assign_targets() {
        let (event, category) = (Uuid::new_v4(), Uuid::new_v4());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = BracketManager::new(
            Arc::new(MemoryBracketRepository::new()),
            Arc::new(StaticCandidates::new().with(event, category, candidates(4))),
        )
        .with_notifier(notifier.clone());
        let bracket = manager
            .create_bracket(BracketConfig::new(
                event,
                category,
                BracketType::Individual,
                ScoringFormat::RecurveSet,
                4,
            ))
            .await
            .unwrap();
        manager.generate(bracket.id).await.unwrap();

        let view = manager.get_bracket(bracket.id).await.unwrap();
        let first = view.rounds[0].matches[0].details.id;
        let second = view.rounds[0].matches[1].details.id;

        let updated = manager
            .assign_targets(
                bracket.id,
                vec![
                    TargetAssignment::new(first, Some(" 1 ".to_string())),
                    TargetAssignment::new(second, Some("2".to_string())),
                ],
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(
            manager.get_match(first).await.unwrap().details.target_id.as_deref(),
            Some("1")
        );

        let duplicate = manager
            .assign_targets(
                bracket.id,
                vec![
                    TargetAssignment::new(first, None),
                    TargetAssignment::new(first, Some("3".to_string())),
                ],
            )
            .await;
        assert!(matches!(duplicate, Err(BracketError::InvalidTarget(_))));

        let stranger = Uuid::new_v4();
        let err = manager
            .assign_targets(
                bracket.id,
                vec![
                    TargetAssignment::new(first, None),
                    TargetAssignment::new(stranger, Some("4".to_string())),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::MatchNotFound(id) if id == stranger));
        assert_eq!(
            manager.get_match(first).await.unwrap().details.target_id.as_deref(),
            Some("1")
        );

        let changes = notifier.changes.lock().unwrap();
        let assigned: Vec<_> = changes
            .iter()
            .filter(|c| matches!(c, BracketChange::TargetsAssigned { .. }))
            .collect();
        assert_eq!(assigned.len(), 1);
    }
}
