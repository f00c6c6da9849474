//! Leaderboard and score history
//!
//! This module accumulates the points awarded on every scored question of
//! a round, keeps the standings sorted, and answers per-participant and
//! per-group queries for the results screens.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{TruncatedVec, participant::Id, scoring::ScoreSheet};

/// Points awarded to one participant on one question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    /// Who was scored
    pub participant: Id,
    /// Group the participant was examined in
    pub group_number: usize,
    /// Zero-based question index within the group's exam
    pub question_index: usize,
    /// Table value before renormalization
    pub raw: f64,
    /// Value counted towards the total
    pub adjusted: f64,
}

/// Serialization helper for Leaderboard struct
#[derive(Deserialize)]
struct LeaderboardSerde {
    entries: Vec<Vec<ScoreEntry>>,
}

/// Accumulated scores for a round
///
/// Only the raw entries are serialized; totals and standings are rebuilt
/// on deserialization.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "LeaderboardSerde")]
pub struct Leaderboard {
    /// Entries for each scored question, in scoring order
    entries: Vec<Vec<ScoreEntry>>,

    /// Standings before the latest question was scored
    #[serde(skip)]
    previous_standings: Vec<(Id, f64)>,
    /// Current standings, highest total first
    #[serde(skip)]
    standings: Vec<(Id, f64)>,
    /// Total and zero-based position per participant
    #[serde(skip)]
    score_and_position: HashMap<Id, (f64, usize)>,
}

fn totals<'a, I: Iterator<Item = &'a ScoreEntry>>(entries: I) -> HashMap<Id, f64> {
    entries.fold(HashMap::new(), |mut totals, entry| {
        *totals.entry(entry.participant).or_default() += entry.adjusted;
        totals
    })
}

fn descending(totals: &HashMap<Id, f64>) -> Vec<(Id, f64)> {
    totals
        .iter()
        .map(|(id, points)| (*id, *points))
        .sorted_by(|(id_a, a), (id_b, b)| b.total_cmp(a).then(id_a.cmp(id_b)))
        .collect_vec()
}

fn positions(standings: &[(Id, f64)]) -> HashMap<Id, (f64, usize)> {
    standings
        .iter()
        .enumerate()
        .map(|(position, (id, points))| (*id, (*points, position)))
        .collect()
}

impl From<LeaderboardSerde> for Leaderboard {
    fn from(serde: LeaderboardSerde) -> Self {
        let standings = descending(&totals(serde.entries.iter().flatten()));
        let previous_standings = descending(&totals(
            serde
                .entries
                .iter()
                .take(serde.entries.len().saturating_sub(1))
                .flatten(),
        ));
        let score_and_position = positions(&standings);

        Leaderboard {
            entries: serde.entries,
            previous_standings,
            standings,
            score_and_position,
        }
    }
}

/// A participant's total and rank
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct Standing {
    /// Sum of adjusted points
    pub points: f64,
    /// Zero-based position in the standings
    pub position: usize,
}

impl Leaderboard {
    /// Records the scores of one question
    ///
    /// # Arguments
    ///
    /// * `group_number` - group that answered the question
    /// * `question_index` - zero-based question index
    /// * `sheet` - output of the scoring engine
    ///
    /// # Returns
    ///
    /// The entries that were recorded, sorted by participant id
    pub fn add_sheet(
        &mut self,
        group_number: usize,
        question_index: usize,
        sheet: &ScoreSheet,
    ) -> Vec<ScoreEntry> {
        let entries = sheet
            .points
            .iter()
            .map(|(id, points)| ScoreEntry {
                participant: *id,
                group_number,
                question_index,
                raw: points.raw,
                adjusted: points.adjusted,
            })
            .sorted_by_key(|entry| entry.participant)
            .collect_vec();

        self.add_entries(&entries);
        entries
    }

    /// Records a batch of entries as one scored question
    pub fn add_entries(&mut self, entries: &[ScoreEntry]) {
        let mut summary: HashMap<Id, f64> = self
            .score_and_position
            .iter()
            .map(|(id, (points, _))| (*id, *points))
            .collect();

        for entry in entries {
            *summary.entry(entry.participant).or_default() += entry.adjusted;
        }

        let standings = descending(&summary);
        self.score_and_position = positions(&standings);
        self.previous_standings = std::mem::replace(&mut self.standings, standings);
        self.entries.push(entries.to_vec());
    }

    /// Number of scored questions
    pub fn question_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the current and previous standings, truncated to `limit`
    pub fn last_two_standings(&self, limit: usize) -> [TruncatedVec<(Id, f64)>; 2] {
        [
            TruncatedVec::new(self.standings.iter().copied(), limit, self.standings.len()),
            TruncatedVec::new(
                self.previous_standings.iter().copied(),
                limit,
                self.previous_standings.len(),
            ),
        ]
    }

    /// Total and rank of a participant, `None` if never scored
    pub fn standing(&self, id: Id) -> Option<Standing> {
        let (points, position) = self.score_and_position.get(&id)?;
        Some(Standing {
            points: *points,
            position: *position,
        })
    }

    /// Every entry recorded for a participant, in scoring order
    pub fn history(&self, id: Id) -> Vec<ScoreEntry> {
        self.entries
            .iter()
            .flatten()
            .filter(|entry| entry.participant == id)
            .copied()
            .collect_vec()
    }

    /// Totals of the members of one group, highest first
    pub fn group_standings(&self, group_number: usize) -> Vec<(Id, f64)> {
        descending(&totals(
            self.entries
                .iter()
                .flatten()
                .filter(|entry| entry.group_number == group_number),
        ))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::scoring::Points;

    fn sheet(points: &[(Id, f64)]) -> ScoreSheet {
        ScoreSheet {
            points: points
                .iter()
                .map(|(id, p)| {
                    (
                        *id,
                        Points {
                            raw: *p,
                            adjusted: *p,
                        },
                    )
                })
                .collect(),
            renormalized: false,
        }
    }

    #[test]
    fn test_standings_accumulate() {
        let (a, b, c) = (Id::new(), Id::new(), Id::new());
        let mut leaderboard = Leaderboard::default();

        leaderboard.add_sheet(1, 0, &sheet(&[(a, 3.), (b, -1.), (c, -1.)]));
        leaderboard.add_sheet(1, 1, &sheet(&[(a, -1.), (b, 2.), (c, 0.)]));

        assert_eq!(leaderboard.question_count(), 2);
        assert_eq!(
            leaderboard.standing(a),
            Some(Standing {
                points: 2.,
                position: 0
            })
        );
        assert_eq!(leaderboard.standing(b).map(|s| s.points), Some(1.));
        assert_eq!(
            leaderboard.standing(c),
            Some(Standing {
                points: -1.,
                position: 2
            })
        );
        assert_eq!(leaderboard.standing(Id::new()), None);
    }

    #[test]
    fn test_last_two_standings() {
        let (a, b) = (Id::new(), Id::new());
        let mut leaderboard = Leaderboard::default();
        leaderboard.add_sheet(1, 0, &sheet(&[(a, 1.), (b, 0.)]));
        leaderboard.add_sheet(1, 1, &sheet(&[(a, 0.), (b, 3.)]));

        let [current, previous] = leaderboard.last_two_standings(1);
        assert_eq!(current.exact_count(), 2);
        assert_eq!(current.items(), &[(b, 3.)]);
        assert_eq!(previous.items(), &[(a, 1.)]);
    }

    #[test]
    fn test_history_and_group_standings() {
        let (a, b, c) = (Id::new(), Id::new(), Id::new());
        let mut leaderboard = Leaderboard::default();
        leaderboard.add_sheet(1, 0, &sheet(&[(a, 1.), (b, 0.)]));
        leaderboard.add_sheet(2, 0, &sheet(&[(c, 1.)]));
        leaderboard.add_sheet(1, 1, &sheet(&[(a, 1.), (b, 1.)]));

        let history = leaderboard.history(a);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].question_index, 1);
        assert_eq!(leaderboard.group_standings(1), vec![(a, 2.), (b, 1.)]);
        assert_eq!(leaderboard.group_standings(2), vec![(c, 1.)]);
    }

    #[test]
    fn test_deserialization_rebuilds_standings() {
        let (a, b) = (Id::new(), Id::new());
        let mut leaderboard = Leaderboard::default();
        leaderboard.add_sheet(1, 0, &sheet(&[(a, 2.), (b, -2.)]));
        leaderboard.add_sheet(1, 1, &sheet(&[(a, -3.), (b, 1.)]));

        let json = serde_json::to_string(&leaderboard).unwrap();
        let restored: Leaderboard = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.standing(a), leaderboard.standing(a));
        assert_eq!(restored.standing(b), leaderboard.standing(b));
        assert_eq!(
            restored.last_two_standings(10)[1].items(),
            leaderboard.last_two_standings(10)[1].items()
        );
    }
}
