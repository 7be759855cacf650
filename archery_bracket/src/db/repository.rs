//! Repository traits for bracket storage and qualification rankings.
//!
//! Every [`BracketRepository`] method is one transactional unit: either all of
//! its writes are visible afterwards or none are. The domain rules run inside
//! that unit through the pure functions in [`crate::bracket::progression`] and
//! [`crate::bracket::builder`], so PostgreSQL and the in-memory store behave
//! the same.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::sync::Arc;

use crate::bracket::builder::BracketPlan;
use crate::bracket::errors::{BracketError, BracketResult};
use crate::bracket::models::{
    Bracket, BracketConfig, BracketId, BracketStatus, BracketSummary, BracketType, Candidate,
    CategoryId, EndScore, Entry, EntryId, EventId, FinishOutcome, Match, MatchEnd, MatchId,
    MatchStatus, Participant, ParticipantKind, QualificationTotals, ScoringFormat, Side,
    TargetAssignment, round_count,
};
use crate::bracket::progression;

/// Transactional store for brackets, entries, matches and ends
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Insert a new draft bracket
    ///
    /// Fails with `DuplicateBracket` when the event category already has one.
    async fn insert_bracket(&self, bracket: &Bracket) -> BracketResult<()>;

    /// Reconfigure a draft bracket under lock, see [`Bracket::reconfigure`]
    async fn update_draft(
        &self,
        bracket_id: BracketId,
        config: BracketConfig,
    ) -> BracketResult<Bracket>;

    async fn find_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>>;

    /// Brackets of an event, newest first, optionally narrowed to one category
    async fn list_brackets(
        &self,
        event_id: EventId,
        category_id: Option<CategoryId>,
    ) -> BracketResult<Vec<BracketSummary>>;

    /// Entries of a bracket in seed order
    async fn list_entries(&self, bracket_id: BracketId) -> BracketResult<Vec<Entry>>;

    /// Matches of a bracket ordered by round, then match number
    async fn list_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>>;

    /// Ends of every match in a bracket
    async fn list_bracket_ends(&self, bracket_id: BracketId) -> BracketResult<Vec<MatchEnd>>;

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// Ends of one match ordered by end number, then side
    async fn list_match_ends(&self, match_id: MatchId) -> BracketResult<Vec<MatchEnd>>;

    /// Persist a generation plan and mark the bracket generated.
    ///
    /// Re-verifies under lock that the bracket is still a draft with the
    /// configuration `bracket` was planned from, and clears leftovers of any
    /// earlier attempt first.
    async fn store_generation(&self, bracket: &Bracket, plan: &BracketPlan) -> BracketResult<()>;

    /// Upsert both sides of an end and start the match if it was scheduled
    async fn upsert_end(
        &self,
        match_id: MatchId,
        end_no: i32,
        side_a: &EndScore,
        side_b: &EndScore,
    ) -> BracketResult<Match>;

    /// Finish a match and write the winner into its next-round slot
    async fn finish_match(&self, match_id: MatchId, winner: EntryId)
    -> BracketResult<FinishOutcome>;

    async fn set_schedule(
        &self,
        match_id: MatchId,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> BracketResult<Match>;

    /// Set or clear the target of several matches of one bracket.
    ///
    /// Fails with `MatchNotFound` and writes nothing when any match is not part
    /// of the bracket.
    async fn assign_targets(
        &self,
        bracket_id: BracketId,
        assignments: &[TargetAssignment],
    ) -> BracketResult<Vec<Match>>;

    /// Compare-and-set the bracket status; returns whether the row moved
    async fn transition_status(
        &self,
        bracket_id: BracketId,
        from: BracketStatus,
        to: BracketStatus,
    ) -> BracketResult<bool>;

    /// Delete a bracket with its ends, matches and entries; refused while running
    async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<()>;
}

/// Ranked qualifiers for a bracket's category
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Candidates of `kind` for an event category, in the source's own order
    async fn candidates(
        &self,
        event_id: EventId,
        category_id: CategoryId,
        kind: ParticipantKind,
    ) -> BracketResult<Vec<Candidate>>;
}

const BRACKETS_EVENT_CATEGORY_KEY: &str = "brackets_event_category_key";

fn is_duplicate_category(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505")
                && db.constraint() == Some(BRACKETS_EVENT_CATEGORY_KEY)
        }
        _ => false,
    }
}

fn to_u32(value: i32, column: &str) -> BracketResult<u32> {
    u32::try_from(value)
        .map_err(|_| BracketError::CorruptRecord(format!("{column} out of range: {value}")))
}

fn to_i32(value: u32, column: &str) -> BracketResult<i32> {
    i32::try_from(value)
        .map_err(|_| BracketError::InvalidConfig(format!("{column} out of range: {value}")))
}

fn corrupt(column: &str, value: &str) -> BracketError {
    BracketError::CorruptRecord(format!("unknown {column} '{value}'"))
}

fn bracket_from_row(row: &PgRow) -> BracketResult<Bracket> {
    let bracket_type: String = row.try_get("bracket_type")?;
    let format: String = row.try_get("format")?;
    let status: String = row.try_get("status")?;

    Ok(Bracket {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        event_id: row.try_get("event_id")?,
        category_id: row.try_get("category_id")?,
        bracket_type: BracketType::parse(&bracket_type)
            .ok_or_else(|| corrupt("bracket_type", &bracket_type))?,
        format: ScoringFormat::parse(&format).ok_or_else(|| corrupt("format", &format))?,
        size: to_u32(row.try_get("size")?, "size")?,
        ends_per_match: to_u32(row.try_get("ends_per_match")?, "ends_per_match")?,
        arrows_per_end: to_u32(row.try_get("arrows_per_end")?, "arrows_per_end")?,
        status: BracketStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        generated_at: row.try_get("generated_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> BracketResult<Entry> {
    let kind: String = row.try_get("participant_type")?;
    let kind = ParticipantKind::parse(&kind).ok_or_else(|| corrupt("participant_type", &kind))?;

    Ok(Entry {
        id: row.try_get("id")?,
        bracket_id: row.try_get("bracket_id")?,
        seed: to_u32(row.try_get("seed")?, "seed")?,
        participant: Participant::new(kind, row.try_get("participant_id")?),
        qualification: QualificationTotals::new(
            row.try_get("qual_total_score")?,
            row.try_get("qual_x_count")?,
            row.try_get("qual_ten_count")?,
        ),
    })
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let status: String = row.try_get("status")?;

    Ok(Match {
        id: row.try_get("id")?,
        bracket_id: row.try_get("bracket_id")?,
        round_no: to_u32(row.try_get("round_no")?, "round_no")?,
        match_no: to_u32(row.try_get("match_no")?, "match_no")?,
        entry_a_id: row.try_get("entry_a_id")?,
        entry_b_id: row.try_get("entry_b_id")?,
        winner_entry_id: row.try_get("winner_entry_id")?,
        is_bye: row.try_get("is_bye")?,
        status: MatchStatus::parse(&status).ok_or_else(|| corrupt("match status", &status))?,
        scheduled_at: row.try_get("scheduled_at")?,
        target_id: row.try_get("target_id")?,
    })
}

fn end_from_row(row: &PgRow) -> BracketResult<MatchEnd> {
    let side: String = row.try_get("side")?;

    Ok(MatchEnd {
        match_id: row.try_get("match_id")?,
        end_no: row.try_get("end_no")?,
        side: Side::parse(&side).ok_or_else(|| corrupt("side", &side))?,
        score: EndScore {
            total: row.try_get("total")?,
            x_count: row.try_get("x_count")?,
            ten_count: row.try_get("ten_count")?,
            arrows: row.try_get("arrows")?,
        },
    })
}

async fn lock_bracket(
    conn: &mut PgConnection,
    bracket_id: BracketId,
) -> BracketResult<Option<Bracket>> {
    let row = sqlx::query(
        "SELECT id, code, event_id, category_id, bracket_type, format, size, ends_per_match,
                arrows_per_end, status, generated_at, created_at
         FROM brackets WHERE id = $1 FOR UPDATE",
    )
    .bind(bracket_id)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(bracket_from_row).transpose()
}

async fn lock_match(conn: &mut PgConnection, match_id: MatchId) -> BracketResult<Option<Match>> {
    let row = sqlx::query(
        "SELECT id, bracket_id, round_no, match_no, entry_a_id, entry_b_id, winner_entry_id,
                is_bye, status, scheduled_at, target_id
         FROM bracket_matches WHERE id = $1 FOR UPDATE",
    )
    .bind(match_id)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(match_from_row).transpose()
}

/// PostgreSQL implementation of [`BracketRepository`]
pub struct PgBracketRepository {
    pool: Arc<PgPool>,
}

impl PgBracketRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn insert_bracket(&self, bracket: &Bracket) -> BracketResult<()> {
        let result = sqlx::query(
            "INSERT INTO brackets (id, code, event_id, category_id, bracket_type, format, size,
                                   ends_per_match, arrows_per_end, status, generated_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(bracket.id)
        .bind(&bracket.code)
        .bind(bracket.event_id)
        .bind(bracket.category_id)
        .bind(bracket.bracket_type.as_str())
        .bind(bracket.format.as_str())
        .bind(to_i32(bracket.size, "size")?)
        .bind(to_i32(bracket.ends_per_match, "ends_per_match")?)
        .bind(to_i32(bracket.arrows_per_end, "arrows_per_end")?)
        .bind(bracket.status.as_str())
        .bind(bracket.generated_at)
        .bind(bracket.created_at)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_category(&e) => Err(BracketError::DuplicateBracket {
                event_id: bracket.event_id,
                category_id: bracket.category_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_draft(
        &self,
        bracket_id: BracketId,
        config: BracketConfig,
    ) -> BracketResult<Bracket> {
        let mut tx = self.pool.begin().await?;

        let mut bracket = lock_bracket(&mut tx, bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))?;
        bracket.reconfigure(config)?;

        let result = sqlx::query(
            "UPDATE brackets
             SET category_id = $2, bracket_type = $3, format = $4, size = $5,
                 ends_per_match = $6, arrows_per_end = $7
             WHERE id = $1",
        )
        .bind(bracket.id)
        .bind(bracket.category_id)
        .bind(bracket.bracket_type.as_str())
        .bind(bracket.format.as_str())
        .bind(to_i32(bracket.size, "size")?)
        .bind(to_i32(bracket.ends_per_match, "ends_per_match")?)
        .bind(to_i32(bracket.arrows_per_end, "arrows_per_end")?)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_duplicate_category(&e) => {
                return Err(BracketError::DuplicateBracket {
                    event_id: bracket.event_id,
                    category_id: bracket.category_id,
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(bracket)
    }

    async fn find_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        let row = sqlx::query(
            "SELECT id, code, event_id, category_id, bracket_type, format, size, ends_per_match,
                    arrows_per_end, status, generated_at, created_at
             FROM brackets WHERE id = $1",
        )
        .bind(bracket_id)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(bracket_from_row).transpose()
    }

    async fn list_brackets(
        &self,
        event_id: EventId,
        category_id: Option<CategoryId>,
    ) -> BracketResult<Vec<BracketSummary>> {
        let rows = sqlx::query(
            "SELECT b.id, b.code, b.event_id, b.category_id, b.bracket_type, b.format, b.size,
                    b.ends_per_match, b.arrows_per_end, b.status, b.generated_at, b.created_at,
                    COUNT(m.id) AS match_count
             FROM brackets b
             LEFT JOIN bracket_matches m ON m.bracket_id = b.id
             WHERE b.event_id = $1 AND ($2::uuid IS NULL OR b.category_id = $2)
             GROUP BY b.id
             ORDER BY b.created_at DESC",
        )
        .bind(event_id)
        .bind(category_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter()
            .map(|row| -> BracketResult<BracketSummary> {
                let match_count: i64 = row.try_get("match_count")?;
                Ok(BracketSummary {
                    bracket: bracket_from_row(row)?,
                    match_count: usize::try_from(match_count).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn list_entries(&self, bracket_id: BracketId) -> BracketResult<Vec<Entry>> {
        let rows = sqlx::query(
            "SELECT id, bracket_id, seed, participant_type, participant_id,
                    qual_total_score, qual_x_count, qual_ten_count
             FROM bracket_entries WHERE bracket_id = $1 ORDER BY seed",
        )
        .bind(bracket_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn list_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>> {
        let rows = sqlx::query(
            "SELECT id, bracket_id, round_no, match_no, entry_a_id, entry_b_id, winner_entry_id,
                    is_bye, status, scheduled_at, target_id
             FROM bracket_matches WHERE bracket_id = $1 ORDER BY round_no, match_no",
        )
        .bind(bracket_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn list_bracket_ends(&self, bracket_id: BracketId) -> BracketResult<Vec<MatchEnd>> {
        let rows = sqlx::query(
            "SELECT e.match_id, e.end_no, e.side, e.total, e.x_count, e.ten_count, e.arrows
             FROM match_ends e
             JOIN bracket_matches m ON m.id = e.match_id
             WHERE m.bracket_id = $1
             ORDER BY e.match_id, e.end_no, e.side",
        )
        .bind(bracket_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(end_from_row).collect()
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(
            "SELECT id, bracket_id, round_no, match_no, entry_a_id, entry_b_id, winner_entry_id,
                    is_bye, status, scheduled_at, target_id
             FROM bracket_matches WHERE id = $1",
        )
        .bind(match_id)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_match_ends(&self, match_id: MatchId) -> BracketResult<Vec<MatchEnd>> {
        let rows = sqlx::query(
            "SELECT match_id, end_no, side, total, x_count, ten_count, arrows
             FROM match_ends WHERE match_id = $1 ORDER BY end_no, side",
        )
        .bind(match_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(end_from_row).collect()
    }

    async fn store_generation(&self, bracket: &Bracket, plan: &BracketPlan) -> BracketResult<()> {
        let mut tx = self.pool.begin().await?;

        let current = lock_bracket(&mut tx, bracket.id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket.id))?;
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

        // Leftovers of an earlier failed attempt
        sqlx::query(
            "DELETE FROM match_ends
             WHERE match_id IN (SELECT id FROM bracket_matches WHERE bracket_id = $1)",
        )
        .bind(bracket.id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM bracket_matches WHERE bracket_id = $1")
            .bind(bracket.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bracket_entries WHERE bracket_id = $1")
            .bind(bracket.id)
            .execute(&mut *tx)
            .await?;

        for entry in &plan.entries {
            sqlx::query(
                "INSERT INTO bracket_entries (id, bracket_id, seed, participant_type, participant_id,
                                              qual_total_score, qual_x_count, qual_ten_count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(entry.id)
            .bind(entry.bracket_id)
            .bind(entry.seed as i32)
            .bind(entry.participant.kind().as_str())
            .bind(entry.participant.id())
            .bind(entry.qualification.total_score)
            .bind(entry.qualification.x_count)
            .bind(entry.qualification.ten_count)
            .execute(&mut *tx)
            .await?;
        }

        for m in &plan.matches {
            sqlx::query(
                "INSERT INTO bracket_matches (id, bracket_id, round_no, match_no, entry_a_id,
                                              entry_b_id, winner_entry_id, is_bye, status)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(m.id)
            .bind(m.bracket_id)
            .bind(m.round_no as i32)
            .bind(m.match_no as i32)
            .bind(m.entry_a_id)
            .bind(m.entry_b_id)
            .bind(m.winner_entry_id)
            .bind(m.is_bye)
            .bind(m.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE brackets SET status = $2, generated_at = $3 WHERE id = $1")
            .bind(bracket.id)
            .bind(BracketStatus::Generated.as_str())
            .bind(plan.generated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_end(
        &self,
        match_id: MatchId,
        end_no: i32,
        side_a: &EndScore,
        side_b: &EndScore,
    ) -> BracketResult<Match> {
        let mut tx = self.pool.begin().await?;

        let mut m = lock_match(&mut tx, match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        for (side, score) in [(Side::A, side_a), (Side::B, side_b)] {
            sqlx::query(
                "INSERT INTO match_ends (match_id, end_no, side, total, x_count, ten_count, arrows)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (match_id, end_no, side) DO UPDATE
                 SET total = EXCLUDED.total, x_count = EXCLUDED.x_count,
                     ten_count = EXCLUDED.ten_count, arrows = EXCLUDED.arrows,
                     updated_at = NOW()",
            )
            .bind(match_id)
            .bind(end_no)
            .bind(side.as_str())
            .bind(score.total)
            .bind(score.x_count)
            .bind(score.ten_count)
            .bind(&score.arrows)
            .execute(&mut *tx)
            .await?;
        }

        if progression::begin_scoring(&mut m) {
            sqlx::query("UPDATE bracket_matches SET status = $2 WHERE id = $1")
                .bind(match_id)
                .bind(m.status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(m)
    }

    async fn finish_match(
        &self,
        match_id: MatchId,
        winner: EntryId,
    ) -> BracketResult<FinishOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut m = lock_match(&mut tx, match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        let size: i32 = sqlx::query_scalar("SELECT size FROM brackets WHERE id = $1")
            .bind(m.bracket_id)
            .fetch_one(&mut *tx)
            .await?;
        let total_rounds = round_count(to_u32(size, "size")?);

        let advanced_to = progression::finish(&mut m, winner, total_rounds)?;

        sqlx::query("UPDATE bracket_matches SET winner_entry_id = $2, status = $3 WHERE id = $1")
            .bind(match_id)
            .bind(winner)
            .bind(m.status.as_str())
            .execute(&mut *tx)
            .await?;

        if let Some(next) = advanced_to {
            let row = sqlx::query(
                "SELECT id, bracket_id, round_no, match_no, entry_a_id, entry_b_id, winner_entry_id,
                        is_bye, status, scheduled_at, target_id
                 FROM bracket_matches
                 WHERE bracket_id = $1 AND round_no = $2 AND match_no = $3
                 FOR UPDATE",
            )
            .bind(m.bracket_id)
            .bind(next.round_no as i32)
            .bind(next.match_no as i32)
            .fetch_optional(&mut *tx)
            .await?;

            let mut target = row.as_ref().map(match_from_row).transpose()?.ok_or(
                BracketError::PropagationTargetMissing {
                    bracket_id: m.bracket_id,
                    round_no: next.round_no,
                    match_no: next.match_no,
                },
            )?;
            progression::place_winner(&mut target, next.side, winner)?;

            let sql = match next.side {
                Side::A => "UPDATE bracket_matches SET entry_a_id = $2 WHERE id = $1",
                Side::B => "UPDATE bracket_matches SET entry_b_id = $2 WHERE id = $1",
            };
            sqlx::query(sql)
                .bind(target.id)
                .bind(winner)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(FinishOutcome {
            finished: m,
            advanced_to,
        })
    }

    async fn set_schedule(
        &self,
        match_id: MatchId,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> BracketResult<Match> {
        let row = sqlx::query(
            "UPDATE bracket_matches SET scheduled_at = $2 WHERE id = $1
             RETURNING id, bracket_id, round_no, match_no, entry_a_id, entry_b_id,
                       winner_entry_id, is_bye, status, scheduled_at, target_id",
        )
        .bind(match_id)
        .bind(scheduled_at)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref()
            .map(match_from_row)
            .transpose()?
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    async fn assign_targets(
        &self,
        bracket_id: BracketId,
        assignments: &[TargetAssignment],
    ) -> BracketResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;

        lock_bracket(&mut tx, bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))?;

        let mut updated = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let row = sqlx::query(
                "UPDATE bracket_matches SET target_id = $3 WHERE id = $1 AND bracket_id = $2
                 RETURNING id, bracket_id, round_no, match_no, entry_a_id, entry_b_id,
                           winner_entry_id, is_bye, status, scheduled_at, target_id",
            )
            .bind(assignment.match_id)
            .bind(bracket_id)
            .bind(assignment.target_id.as_deref())
            .fetch_optional(&mut *tx)
            .await?;

            let m = row
                .as_ref()
                .map(match_from_row)
                .transpose()?
                .ok_or(BracketError::MatchNotFound(assignment.match_id))?;
            updated.push(m);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn transition_status(
        &self,
        bracket_id: BracketId,
        from: BracketStatus,
        to: BracketStatus,
    ) -> BracketResult<bool> {
        let result = sqlx::query("UPDATE brackets SET status = $3 WHERE id = $1 AND status = $2")
            .bind(bracket_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<()> {
        let mut tx = self.pool.begin().await?;

        let bracket = lock_bracket(&mut tx, bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))?;
        if bracket.status == BracketStatus::Running {
            return Err(BracketError::BracketRunning);
        }

        sqlx::query(
            "DELETE FROM match_ends
             WHERE match_id IN (SELECT id FROM bracket_matches WHERE bracket_id = $1)",
        )
        .bind(bracket_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM bracket_matches WHERE bracket_id = $1")
            .bind(bracket_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bracket_entries WHERE bracket_id = $1")
            .bind(bracket_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM brackets WHERE id = $1")
            .bind(bracket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// [`CandidateSource`] backed by the `qualification_rankings` table
pub struct PgCandidateSource {
    pool: Arc<PgPool>,
}

impl PgCandidateSource {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateSource for PgCandidateSource {
    async fn candidates(
        &self,
        event_id: EventId,
        category_id: CategoryId,
        kind: ParticipantKind,
    ) -> BracketResult<Vec<Candidate>> {
        let rows = sqlx::query(
            "SELECT participant_id, total_score, x_count, ten_count
             FROM qualification_rankings
             WHERE event_id = $1 AND category_id = $2 AND participant_type = $3
             ORDER BY total_score DESC, x_count DESC, ten_count DESC, recorded_at ASC",
        )
        .bind(event_id)
        .bind(category_id)
        .bind(kind.as_str())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter()
            .map(|row| -> BracketResult<Candidate> {
                Ok(Candidate::new(
                    Participant::new(kind, row.try_get("participant_id")?),
                    QualificationTotals::new(
                        row.try_get("total_score")?,
                        row.try_get("x_count")?,
                        row.try_get("ten_count")?,
                    ),
                ))
            })
            .collect()
    }
}
