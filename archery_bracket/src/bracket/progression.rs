//! Match progression: the match state machine and winner propagation addressing.
//!
//! These functions are pure. Stores call them inside their transaction so the
//! same rules apply whether a match lives in PostgreSQL or in memory.

use super::errors::{BracketError, BracketResult};
use super::models::{Advancement, EntryId, Match, MatchStatus, Side};

/// Where the winner of `(round_no, match_no)` moves to.
///
/// Returns `None` for the final, whose winner is the champion.
pub fn advancement(round_no: u32, match_no: u32, total_rounds: u32) -> Option<Advancement> {
    if round_no >= total_rounds {
        return None;
    }

    Some(Advancement {
        round_no: round_no + 1,
        match_no: match_no.div_ceil(2),
        side: Side::for_match_no(match_no),
    })
}

/// Move a match to `running` when its first score arrives.
///
/// Running and finished matches are left alone, so score corrections after the
/// fact never reopen a match.
pub fn begin_scoring(m: &mut Match) -> bool {
    if m.status == MatchStatus::Scheduled {
        m.status = MatchStatus::Running;
        true
    } else {
        false
    }
}

/// Check that `winner` may finish `m` and return the side it plays on
///
/// # Errors
///
/// * `BracketError::MatchAlreadyFinished` - A winner is already recorded
/// * `BracketError::MatchNotReady` - A slot still waits for its feeder match
/// * `BracketError::WinnerNotParticipant` - `winner` is neither entry A nor entry B
pub fn check_winner(m: &Match, winner: EntryId) -> BracketResult<Side> {
    if m.status == MatchStatus::Finished {
        return Err(BracketError::MatchAlreadyFinished(m.id));
    }
    if !m.has_both_entries() {
        return Err(BracketError::MatchNotReady(m.id));
    }

    m.side_of(winner)
        .ok_or(BracketError::WinnerNotParticipant {
            match_id: m.id,
            entry_id: winner,
        })
}

/// Record `winner` on `m` and mark it finished.
///
/// Returns the advancement the caller must apply to the next round, if any.
pub fn finish(m: &mut Match, winner: EntryId, total_rounds: u32) -> BracketResult<Option<Advancement>> {
    check_winner(m, winner)?;

    m.winner_entry_id = Some(winner);
    m.status = MatchStatus::Finished;

    Ok(advancement(m.round_no, m.match_no, total_rounds))
}

/// Write a propagated winner into its slot of the next-round match.
///
/// Each next-round match has exactly two feeders writing disjoint slots, so a
/// slot holding a different entry means the builder and engine disagree about
/// addressing. Writing the same entry again is accepted. A finished target is
/// never touched.
pub fn place_winner(target: &mut Match, side: Side, winner: EntryId) -> BracketResult<()> {
    if target.status == MatchStatus::Finished {
        return Err(BracketError::MatchAlreadyFinished(target.id));
    }

    match target.entry(side) {
        Some(existing) if existing != winner => Err(BracketError::SlotOccupied {
            bracket_id: target.bracket_id,
            round_no: target.round_no,
            match_no: target.match_no,
            side,
        }),
        _ => {
            target.set_entry(side, Some(winner));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn populated(round_no: u32, match_no: u32) -> (Match, EntryId, EntryId) {
        let mut m = Match::empty(Uuid::new_v4(), round_no, match_no);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        m.entry_a_id = Some(a);
        m.entry_b_id = Some(b);
        (m, a, b)
    }

    #[test]
    fn test_advancement_parity() {
        assert_eq!(
            advancement(1, 1, 3),
            Some(Advancement {
                round_no: 2,
                match_no: 1,
                side: Side::A
            })
        );
        assert_eq!(
            advancement(1, 2, 3),
            Some(Advancement {
                round_no: 2,
                match_no: 1,
                side: Side::B
            })
        );
        assert_eq!(
            advancement(1, 7, 3),
            Some(Advancement {
                round_no: 2,
                match_no: 4,
                side: Side::A
            })
        );
        assert_eq!(
            advancement(2, 2, 3),
            Some(Advancement {
                round_no: 3,
                match_no: 1,
                side: Side::B
            })
        );
    }

    #[test]
    fn test_final_has_no_advancement() {
        assert_eq!(advancement(3, 1, 3), None);
        assert_eq!(advancement(7, 1, 7), None);
    }

    #[test]
    fn test_begin_scoring_only_from_scheduled() {
        let (mut m, _, _) = populated(1, 1);
        assert!(begin_scoring(&mut m));
        assert_eq!(m.status, MatchStatus::Running);
        assert!(!begin_scoring(&mut m));

        m.status = MatchStatus::Finished;
        assert!(!begin_scoring(&mut m));
        assert_eq!(m.status, MatchStatus::Finished);
    }

    #[test]
    fn test_finish_sets_winner_and_returns_target() {
        let (mut m, _, b) = populated(1, 4);
        let next = finish(&mut m, b, 3).unwrap();

        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!(m.winner_entry_id, Some(b));
        assert_eq!(
            next,
            Some(Advancement {
                round_no: 2,
                match_no: 2,
                side: Side::B
            })
        );
    }

    #[test]
    fn test_finish_rejects_non_participant() {
        let (mut m, _, _) = populated(1, 1);
        let outsider = Uuid::new_v4();
        let err = finish(&mut m, outsider, 3).unwrap_err();

        assert!(matches!(err, BracketError::WinnerNotParticipant { .. }));
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.winner_entry_id, None);
    }

    #[test]
    fn test_finish_waits_for_both_entries() {
        let mut m = Match::empty(Uuid::new_v4(), 2, 1);
        let a = Uuid::new_v4();
        m.entry_a_id = Some(a);

        assert!(matches!(
            finish(&mut m, a, 3),
            Err(BracketError::MatchNotReady(_))
        ));
        assert!(matches!(
            finish(&mut m, Uuid::new_v4(), 3),
            Err(BracketError::MatchNotReady(_))
        ));
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.winner_entry_id, None);

        let b = Uuid::new_v4();
        m.entry_b_id = Some(b);
        assert!(finish(&mut m, a, 3).is_ok());
    }

    #[test]
    fn test_finish_twice_is_conflict() {
        let (mut m, a, _) = populated(1, 1);
        finish(&mut m, a, 3).unwrap();
        assert!(matches!(
            finish(&mut m, a, 3),
            Err(BracketError::MatchAlreadyFinished(_))
        ));
    }

    #[test]
    fn test_place_winner_slots_are_disjoint() {
        let mut target = Match::empty(Uuid::new_v4(), 2, 1);
        let left = Uuid::new_v4();
        let right = Uuid::new_v4();

        place_winner(&mut target, Side::B, right).unwrap();
        place_winner(&mut target, Side::A, left).unwrap();

        assert_eq!(target.entry_a_id, Some(left));
        assert_eq!(target.entry_b_id, Some(right));
    }

    #[test]
    fn test_place_winner_refuses_to_clobber() {
        let mut target = Match::empty(Uuid::new_v4(), 2, 1);
        let first = Uuid::new_v4();
        place_winner(&mut target, Side::A, first).unwrap();

        // same entry again is fine
        place_winner(&mut target, Side::A, first).unwrap();

        let err = place_winner(&mut target, Side::A, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BracketError::SlotOccupied { side: Side::A, .. }));
        assert_eq!(target.entry_a_id, Some(first));
    }

    #[test]
    fn test_place_winner_refuses_finished_target() {
        let (mut target, a, b) = populated(2, 1);
        finish(&mut target, a, 3).unwrap();

        let err = place_winner(&mut target, Side::B, b).unwrap_err();
        assert!(matches!(err, BracketError::MatchAlreadyFinished(id) if id == target.id));
        assert_eq!(target.entry_b_id, Some(b));

        let mut fresh = Match::empty(Uuid::new_v4(), 2, 1);
        fresh.status = MatchStatus::Finished;
        assert!(place_winner(&mut fresh, Side::A, Uuid::new_v4()).is_err());
        assert_eq!(fresh.entry_a_id, None);
    }
}
