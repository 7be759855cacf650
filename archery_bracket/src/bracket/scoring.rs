//! End scoring and match score summaries.
//!
//! A match is shot as a series of numbered ends. Regular ends decide the match
//! under the bracket's [`ScoringFormat`]; end [`SHOOT_OFF_END`] is kept apart
//! and only breaks a tie.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::errors::{BracketError, BracketResult};
use super::models::{EndScore, MatchEnd, ScoringFormat, Side};

/// End number reserved for the single deciding shoot-off end
pub const SHOOT_OFF_END: i32 = 99;

/// Highest regular arrow value
pub const MAX_ARROW_VALUE: i32 = 10;

/// Value of a single arrow token.
///
/// Accepts `X` (inner ten), `10` down to `1`, and `M` (miss), case-insensitive.
/// Returns the point value and whether the arrow was an X.
fn arrow_value(token: &str) -> Option<(i32, bool)> {
    match token.trim().to_ascii_uppercase().as_str() {
        "X" => Some((MAX_ARROW_VALUE, true)),
        "M" => Some((0, false)),
        digits => match digits.parse::<i32>() {
            Ok(value) if (1..=MAX_ARROW_VALUE).contains(&value) && !digits.starts_with('+') => {
                Some((value, false))
            }
            _ => None,
        },
    }
}

impl EndScore {
    /// End entered as precomputed totals
    pub fn from_totals(total: i32, x_count: i32, ten_count: i32) -> Self {
        Self {
            total,
            x_count,
            ten_count,
            arrows: Vec::new(),
        }
    }

    /// Derive an end's totals from its arrow values.
    ///
    /// An X scores 10 and counts both as an X and as a 10.
    ///
    /// # Errors
    ///
    /// Returns `BracketError::InvalidEnd` for an empty end or an unknown token.
    ///
    /// # Example
    ///
    /// ```
    /// use archery_bracket::bracket::EndScore;
    ///
    /// let arrows = vec!["X".to_string(), "10".to_string(), "9".to_string()];
    /// let end = EndScore::from_arrows(&arrows).unwrap();
    /// assert_eq!((end.total, end.x_count, end.ten_count), (29, 1, 2));
    /// ```
    pub fn from_arrows(arrows: &[String]) -> BracketResult<Self> {
        if arrows.is_empty() {
            return Err(BracketError::InvalidEnd(
                "at least one arrow is required".to_string(),
            ));
        }

        let mut score = EndScore::default();
        for token in arrows {
            let (value, is_x) = arrow_value(token)
                .ok_or_else(|| BracketError::InvalidEnd(format!("unknown arrow value '{token}'")))?;

            score.total += value;
            if is_x {
                score.x_count += 1;
            }
            if value == MAX_ARROW_VALUE {
                score.ten_count += 1;
            }
            score.arrows.push(token.trim().to_ascii_uppercase());
        }

        Ok(score)
    }

    fn shoot_off_cmp(&self, other: &Self) -> Ordering {
        self.total
            .cmp(&other.total)
            .then(self.x_count.cmp(&other.x_count))
    }
}

/// Running score of a match, derived from its recorded ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    /// Regular ends both sides have scored
    pub ends_completed: u32,
    pub total_a: i32,
    pub total_b: i32,
    pub set_points_a: u32,
    pub set_points_b: u32,
    /// Decisive shoot-off winner; `None` when not shot, half-entered or level
    pub shoot_off_winner: Option<Side>,
}

impl MatchScore {
    /// Summarize `ends` of one match.
    ///
    /// Totals include every regular end a side has scored. Set points only
    /// count ends that both sides have scored, since a half-entered end cannot
    /// be won yet.
    pub fn compute(ends: &[MatchEnd]) -> Self {
        let mut score = MatchScore::default();
        let mut by_end: BTreeMap<i32, (Option<&EndScore>, Option<&EndScore>)> = BTreeMap::new();

        for end in ends {
            let slot = by_end.entry(end.end_no).or_default();
            match end.side {
                Side::A => slot.0 = Some(&end.score),
                Side::B => slot.1 = Some(&end.score),
            }
        }

        for (end_no, pair) in by_end {
            if end_no == SHOOT_OFF_END {
                if let (Some(a), Some(b)) = pair {
                    score.shoot_off_winner = match a.shoot_off_cmp(b) {
                        Ordering::Greater => Some(Side::A),
                        Ordering::Less => Some(Side::B),
                        Ordering::Equal => None,
                    };
                }
                continue;
            }

            if let Some(a) = pair.0 {
                score.total_a = score.total_a.saturating_add(a.total);
            }
            if let Some(b) = pair.1 {
                score.total_b = score.total_b.saturating_add(b.total);
            }

            if let (Some(a), Some(b)) = pair {
                score.ends_completed += 1;
                match a.total.cmp(&b.total) {
                    Ordering::Greater => score.set_points_a = score.set_points_a.saturating_add(2),
                    Ordering::Less => score.set_points_b = score.set_points_b.saturating_add(2),
                    Ordering::Equal => {
                        score.set_points_a = score.set_points_a.saturating_add(1);
                        score.set_points_b = score.set_points_b.saturating_add(1);
                    }
                }
            }
        }

        score
    }

    /// Side currently ahead under `format`, falling back to the shoot-off on a tie
    pub fn leader(&self, format: ScoringFormat) -> Option<Side> {
        let primary = match format {
            ScoringFormat::RecurveSet => self.set_points_a.cmp(&self.set_points_b),
            ScoringFormat::CompoundTotal => self.total_a.cmp(&self.total_b),
        };

        match primary {
            Ordering::Greater => Some(Side::A),
            Ordering::Less => Some(Side::B),
            Ordering::Equal => self.shoot_off_winner,
        }
    }
}
