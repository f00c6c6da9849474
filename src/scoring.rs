//! Per-question scoring
//!
//! Scores are computed from the proctor's correctness marks for a single
//! question within a single group. Round 1 uses a table keyed by how many
//! group members answered correctly, with a zero-sum adjustment for groups
//! of three. Later rounds award one point per correct answer.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::display::SCALED_TO_15_COUNTS,
    participant::{Id, Status},
    round::{Round, ScoringVariant},
};

/// Points awarded to one participant for one question
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Points {
    /// Value straight from the scoring table
    pub raw: f64,
    /// Value after renormalization, equal to `raw` when none was applied
    pub adjusted: f64,
}

/// Notice shown to the proctor when three-person group scores were renormalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingNotice {
    /// The round has 9 or 15 participants in total
    ScaledTo15,
    /// Any other round size
    ThreePlayerGroupsScaled,
}

impl ScalingNotice {
    /// Picks the notice wording for a round with `total_participants`
    pub fn for_total(total_participants: usize) -> Self {
        if SCALED_TO_15_COUNTS.contains(&total_participants) {
            Self::ScaledTo15
        } else {
            Self::ThreePlayerGroupsScaled
        }
    }

    /// Text displayed next to the score table
    pub fn text(self) -> &'static str {
        match self {
            Self::ScaledTo15 => "All scaled to /15",
            Self::ThreePlayerGroupsScaled => "3-player groups scaled",
        }
    }
}

/// Result of scoring one question for one group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    /// Points per participant
    pub points: HashMap<Id, Points>,
    /// Whether the zero-sum adjustment changed any score
    pub renormalized: bool,
}

impl ScoreSheet {
    /// Adjusted points for `id`, zero if the participant was not scored
    pub fn adjusted(&self, id: Id) -> f64 {
        self.points.get(&id).map_or(0., |p| p.adjusted)
    }

    /// Sum of adjusted points across the group
    pub fn total(&self) -> f64 {
        self.points.values().map(|p| p.adjusted).sum()
    }

    /// Scaling notice to show, if any
    ///
    /// # Arguments
    ///
    /// * `total_participants` - number of participants in the whole round
    pub fn scaling_notice(&self, total_participants: usize) -> Option<ScalingNotice> {
        self.renormalized
            .then(|| ScalingNotice::for_total(total_participants))
    }
}

/// Round 1 table value for a participant with `status` when `correct_count`
/// of `group_size` members answered correctly
fn round1_table(status: Status, correct_count: usize, group_size: usize) -> f64 {
    match status {
        Status::Correct => match correct_count {
            k if k == group_size => 0.,
            1 => 3.,
            2 => 2.,
            3 => 1.,
            _ => 0.,
        },
        Status::Incorrect => match correct_count {
            1 => -1.,
            2 => -2.,
            3 if group_size == 4 => -3.,
            _ => 0.,
        },
        Status::Unmarked => 0.,
    }
}

/// Computes the points for a single question in a single group
///
/// This function is pure: identical inputs always give identical sheets.
///
/// # Arguments
///
/// * `marks` - the proctor's mark for every member of the group
/// * `group_size` - number of members in the group
/// * `round` - the round being played, which selects the table
///
/// # Returns
///
/// A [`ScoreSheet`] holding raw and adjusted points per participant. For
/// round 1 groups of three the adjusted points always sum to zero.
pub fn score(marks: &HashMap<Id, Status>, group_size: usize, round: Round) -> ScoreSheet {
    match round.scoring_variant() {
        ScoringVariant::Round1Table => {
            let correct_count = marks.values().filter(|s| **s == Status::Correct).count();

            let mut points: HashMap<Id, Points> = marks
                .iter()
                .map(|(id, status)| {
                    let raw = round1_table(*status, correct_count, group_size);
                    (*id, Points { raw, adjusted: raw })
                })
                .collect();

            let raw_total: f64 = points.values().map(|p| p.raw).sum();
            let renormalized = group_size == 3 && raw_total != 0.;

            if renormalized {
                let adjustment = raw_total / group_size as f64;
                for p in points.values_mut() {
                    p.adjusted = p.raw - adjustment;
                }
            }

            ScoreSheet {
                points,
                renormalized,
            }
        }
        ScoringVariant::Binary => ScoreSheet {
            points: marks
                .iter()
                .map(|(id, status)| {
                    let raw = if *status == Status::Correct { 1. } else { 0. };
                    (*id, Points { raw, adjusted: raw })
                })
                .collect(),
            renormalized: false,
        },
    }
}

/// Short description of the scoring range for a round of `total` participants
pub fn scoring_system(round: Round, total: usize) -> &'static str {
    match (round.scoring_variant(), total) {
        (ScoringVariant::Binary, _) => "Head-to-head comparison",
        (ScoringVariant::Round1Table, 16) => "+3 to -3",
        (ScoringVariant::Round1Table, 9 | 12) => "+2 to -2",
        (ScoringVariant::Round1Table, _) => "Mixed",
    }
}

/// Short description of the renormalization a round of `total` participants will see
pub fn scaling_info(round: Round, total: usize) -> &'static str {
    match (round.scoring_variant(), total) {
        (ScoringVariant::Binary, _) | (ScoringVariant::Round1Table, 12 | 16) => {
            "No scaling needed"
        }
        (ScoringVariant::Round1Table, 9) => ScalingNotice::ScaledTo15.text(),
        (ScoringVariant::Round1Table, 15) => "3-player group scaled to /15",
        (ScoringVariant::Round1Table, _) => ScalingNotice::ThreePlayerGroupsScaled.text(),
    }
}

/// Counts marks per status, in `(correct, incorrect, unmarked)` order
pub fn tally(marks: &HashMap<Id, Status>) -> (usize, usize, usize) {
    let counts = marks.values().copied().counts();
    (
        counts.get(&Status::Correct).copied().unwrap_or_default(),
        counts.get(&Status::Incorrect).copied().unwrap_or_default(),
        counts.get(&Status::Unmarked).copied().unwrap_or_default(),
    )
}
