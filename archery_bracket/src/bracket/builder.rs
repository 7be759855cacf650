//! Bracket builder: turns ranked candidates into seeded entries and the full match tree.
//!
//! Planning is pure; a [`BracketPlan`] is handed to the store, which persists
//! it in one transaction together with the bracket's status change.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::BracketResult;
use super::models::{
    Bracket, BracketId, Candidate, Entry, GenerationSummary, Match, MatchStatus, matches_in_round,
};
use super::progression::{advancement, place_winner};
use super::seeding::seed_order;

/// Order candidates for seeding.
///
/// Higher total score ranks first, then more Xs, then more 10s. The sort is
/// stable, so candidates that are level on all three keys keep the order the
/// candidate source returned them in.
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.totals.rank_cmp(&b.totals));
    candidates
}

/// Entries and matches for one generation of a bracket
#[derive(Debug, Clone)]
pub struct BracketPlan {
    pub bracket_id: BracketId,
    /// Entries in seed order
    pub entries: Vec<Entry>,
    /// Every match of every round, ordered by round then match number
    pub matches: Vec<Match>,
    pub generated_at: DateTime<Utc>,
}

impl BracketPlan {
    pub fn bye_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_bye).count()
    }

    pub fn summary(&self, round_count: u32) -> GenerationSummary {
        GenerationSummary {
            bracket_id: self.bracket_id,
            entry_count: self.entries.len(),
            round_count,
            bye_count: self.bye_count(),
        }
    }

    fn find_mut(&mut self, round_no: u32, match_no: u32) -> Option<&mut Match> {
        self.matches
            .iter_mut()
            .find(|m| m.round_no == round_no && m.match_no == match_no)
    }
}

/// Plan the entries and match tree for `bracket` from already ranked candidates.
///
/// Takes at most `bracket.size` candidates and seeds them 1..n in rank order.
/// Round 1 pairs seeds by [`seed_order`]; positions whose seed has no entry
/// stay empty. A round-1 match with exactly one entry is a bye: it is created
/// finished with that entry as winner, and the winner is already written into
/// its round-2 slot. A match with no entries at all is left scheduled and is
/// not a bye. Later rounds start empty.
///
/// The caller rejects short candidate lists before planning; fewer candidates
/// than slots still produce a well-formed plan.
///
/// # Arguments
///
/// * `bracket` - Bracket being generated, sized and validated
/// * `ranked` - Candidates in seeding order, see [`rank_candidates`]
/// * `now` - Generation timestamp
pub fn plan_bracket(
    bracket: &Bracket,
    ranked: &[Candidate],
    now: DateTime<Utc>,
) -> BracketResult<BracketPlan> {
    let size = bracket.size;
    let total_rounds = bracket.round_count();

    let entries: Vec<Entry> = ranked
        .iter()
        .take(size as usize)
        .zip(1u32..)
        .map(|(candidate, seed)| Entry {
            id: Uuid::new_v4(),
            bracket_id: bracket.id,
            seed,
            participant: candidate.participant,
            qualification: candidate.totals,
        })
        .collect();

    // entries[seed - 1] holds the entry seeded `seed`
    let entry_for_seed = |seed: u32| entries.get(seed as usize - 1).map(|e| e.id);

    let mut plan = BracketPlan {
        bracket_id: bracket.id,
        entries: Vec::new(),
        matches: Vec::with_capacity(size as usize - 1),
        generated_at: now,
    };

    let order = seed_order(size);
    for (pair, match_no) in order.chunks_exact(2).zip(1u32..) {
        let mut m = Match::empty(bracket.id, 1, match_no);
        m.entry_a_id = entry_for_seed(pair[0]);
        m.entry_b_id = entry_for_seed(pair[1]);
        plan.matches.push(m);
    }

    for round_no in 2..=total_rounds {
        for match_no in 1..=matches_in_round(size, round_no) {
            plan.matches.push(Match::empty(bracket.id, round_no, match_no));
        }
    }

    let mut advancing = Vec::new();
    for m in plan.matches.iter_mut().filter(|m| m.round_no == 1) {
        let lone = match (m.entry_a_id, m.entry_b_id) {
            (Some(a), None) => a,
            (None, Some(b)) => b,
            _ => continue,
        };
        m.is_bye = true;
        m.winner_entry_id = Some(lone);
        m.status = MatchStatus::Finished;
        if let Some(next) = advancement(m.round_no, m.match_no, total_rounds) {
            advancing.push((next, lone));
        }
    }

    for (next, winner) in advancing {
        if let Some(target) = plan.find_mut(next.round_no, next.match_no) {
            place_winner(target, next.side, winner)?;
        }
    }

    plan.entries = entries;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{
        BracketConfig, BracketType, Participant, QualificationTotals, ScoringFormat, Side,
    };

    fn bracket(size: u32) -> Bracket {
        let config = BracketConfig::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BracketType::Individual,
            ScoringFormat::RecurveSet,
            size,
        );
        Bracket::draft(config, Utc::now())
    }

    /// `count` candidates already in rank order (strictly decreasing scores)
    fn ranked(count: usize) -> Vec<Candidate> {
        (0..count)
            .map(|i| {
                Candidate::new(
                    Participant::Archer(Uuid::new_v4()),
                    QualificationTotals::new(700 - i as i32, 0, 0),
                )
            })
            .collect()
    }

    fn seed_of(plan: &BracketPlan, entry_id: Option<Uuid>) -> Option<u32> {
        entry_id.and_then(|id| plan.entries.iter().find(|e| e.id == id).map(|e| e.seed))
    }

    fn round1(plan: &BracketPlan) -> Vec<&Match> {
        plan.matches.iter().filter(|m| m.round_no == 1).collect()
    }

    #[test]
    fn test_rank_candidates_orders_by_score_x_ten() {
        let c = |score, xs, tens| {
            Candidate::new(
                Participant::Archer(Uuid::new_v4()),
                QualificationTotals::new(score, xs, tens),
            )
        };
        let low = c(600, 5, 5);
        let tens = c(650, 10, 30);
        let xs = c(650, 12, 20);
        let top = c(690, 0, 0);

        let ranked = rank_candidates(vec![low.clone(), tens.clone(), xs.clone(), top.clone()]);
        assert_eq!(ranked, vec![top, xs, tens, low]);
    }

    #[test]
    fn test_rank_candidates_is_stable_on_full_ties() {
        let first = Candidate::new(
            Participant::Archer(Uuid::new_v4()),
            QualificationTotals::new(640, 8, 20),
        );
        let second = Candidate::new(
            Participant::Archer(Uuid::new_v4()),
            QualificationTotals::new(640, 8, 20),
        );

        let ranked = rank_candidates(vec![first.clone(), second.clone()]);
        assert_eq!(ranked, vec![first.clone(), second.clone()]);

        let ranked = rank_candidates(vec![second.clone(), first.clone()]);
        assert_eq!(ranked, vec![second, first]);
    }

    #[test]
    fn test_full_bracket_shape() {
        for size in [4u32, 8, 16, 32, 64, 128] {
            let b = bracket(size);
            let plan = plan_bracket(&b, &ranked(size as usize), Utc::now()).unwrap();

            assert_eq!(plan.entries.len(), size as usize);
            assert_eq!(plan.matches.len(), size as usize - 1);
            assert_eq!(plan.bye_count(), 0);
            for round_no in 1..=b.round_count() {
                let count = plan.matches.iter().filter(|m| m.round_no == round_no).count();
                assert_eq!(count as u32, size >> round_no);
            }
            for m in plan.matches.iter().filter(|m| m.round_no > 1) {
                assert!(m.entry_a_id.is_none() && m.entry_b_id.is_none());
            }
        }
    }

    #[test]
    fn test_round_one_pairs_follow_seed_order() {
        let b = bracket(8);
        let plan = plan_bracket(&b, &ranked(8), Utc::now()).unwrap();
        let pairs: Vec<(u32, u32)> = round1(&plan)
            .iter()
            .map(|m| {
                (
                    seed_of(&plan, m.entry_a_id).unwrap(),
                    seed_of(&plan, m.entry_b_id).unwrap(),
                )
            })
            .collect();

        assert_eq!(pairs, vec![(1, 8), (4, 5), (2, 7), (3, 6)]);
    }

    #[test]
    fn test_takes_top_size_candidates() {
        let b = bracket(8);
        let candidates = ranked(10);
        let plan = plan_bracket(&b, &candidates, Utc::now()).unwrap();

        assert_eq!(plan.entries.len(), 8);
        for (entry, candidate) in plan.entries.iter().zip(&candidates) {
            assert_eq!(entry.participant, candidate.participant);
            assert_eq!(entry.qualification, candidate.totals);
        }
        let seeds: Vec<u32> = plan.entries.iter().map(|e| e.seed).collect();
        assert_eq!(seeds, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_byes_auto_advance_into_round_two() {
        let b = bracket(8);
        let plan = plan_bracket(&b, &ranked(6), Utc::now()).unwrap();

        // seeds 7 and 8 are missing, so seeds 1 and 2 get byes
        let byes: Vec<&Match> = round1(&plan).into_iter().filter(|m| m.is_bye).collect();
        assert_eq!(byes.len(), 2);
        for m in &byes {
            assert_eq!(m.status, MatchStatus::Finished);
            assert_eq!(m.winner_entry_id, m.entry_a_id);
        }
        assert_eq!(seed_of(&plan, byes[0].winner_entry_id), Some(1));
        assert_eq!(seed_of(&plan, byes[1].winner_entry_id), Some(2));

        let r2: Vec<&Match> = plan.matches.iter().filter(|m| m.round_no == 2).collect();
        // match 1 (seed 1) feeds round 2 match 1 side A, match 3 (seed 2) feeds match 2 side A
        assert_eq!(seed_of(&plan, r2[0].entry(Side::A)), Some(1));
        assert_eq!(seed_of(&plan, r2[1].entry(Side::A)), Some(2));
        assert!(r2[0].entry_b_id.is_none() && r2[1].entry_b_id.is_none());

        for m in round1(&plan).into_iter().filter(|m| !m.is_bye) {
            assert_eq!(m.status, MatchStatus::Scheduled);
            assert!(m.entry_a_id.is_some() && m.entry_b_id.is_some());
        }
    }

    #[test]
    fn test_far_too_few_candidates_leaves_inert_matches() {
        let b = bracket(8);
        let plan = plan_bracket(&b, &ranked(2), Utc::now()).unwrap();

        // seeds 1 and 2 are byes; (4,5) and (3,6) are empty
        assert_eq!(plan.bye_count(), 2);
        let inert: Vec<&Match> = round1(&plan)
            .into_iter()
            .filter(|m| m.entry_a_id.is_none() && m.entry_b_id.is_none())
            .collect();
        assert_eq!(inert.len(), 2);
        for m in inert {
            assert!(!m.is_bye);
            assert_eq!(m.status, MatchStatus::Scheduled);
            assert!(m.winner_entry_id.is_none());
        }
    }

    #[test]
    fn test_summary_reports_counts() {
        let b = bracket(16);
        let plan = plan_bracket(&b, &ranked(13), Utc::now()).unwrap();
        let summary = plan.summary(b.round_count());

        assert_eq!(summary.entry_count, 13);
        assert_eq!(summary.round_count, 4);
        assert_eq!(summary.bye_count, 3);
    }
}
