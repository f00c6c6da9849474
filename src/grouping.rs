//! Group formation
//!
//! Round 1 groups are produced automatically from the attendance list:
//! participants are shuffled and sliced into groups of four and three
//! following a fixed pattern. Later rounds are paired up by the proctor,
//! one pending group at a time, through [`GroupFormation`].

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::grouping::{AUTO_QUALIFY_MAX, MAX_GROUP_SIZE, TABLE, TABLE_MAX, TABLE_MIN},
    participant::{Id, Participant},
    round::Round,
};

/// Errors raised while forming groups
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Only round 1 is partitioned automatically
    #[error("groups for round {0} are formed manually")]
    ManualRound(u8),
    /// The participant already belongs to a committed group
    #[error("{name} is already in group {group_number}, remove them from that group first")]
    DuplicateAssignment {
        /// Name of the participant
        name: String,
        /// Group the participant is committed to
        group_number: usize,
    },
    /// Tried to commit a group with nobody in it
    #[error("select at least one student for this group")]
    EmptyGroup,
    /// The pending group is already at capacity
    #[error("a group holds at most {0} students")]
    GroupFull(usize),
    /// The participant is in neither the pending group nor a committed one
    #[error("participant is not assigned to any group")]
    UnknownParticipant,
    /// No manual formation session is open
    #[error("group formation has not been started")]
    NotForming,
    /// Formation finished without a single group
    #[error("form at least one group before proceeding")]
    NoGroupsFormed,
}

/// A set of participants examined together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Number unique within the round, starting at 1
    pub group_number: usize,
    /// Members in formation order
    pub members: Vec<Participant>,
}

impl Group {
    /// Number of members
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members left
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is a member of this group
    pub fn contains(&self, id: Id) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Ids of all members in formation order
    pub fn member_ids(&self) -> Vec<Id> {
        self.members.iter().map(|m| m.id).collect_vec()
    }
}

/// How many groups of each size a round 1 roster is split into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingPattern {
    /// Number of three-person groups
    pub groups_of_3: usize,
    /// Number of four-person groups
    pub groups_of_4: usize,
}

impl GroupingPattern {
    /// Number of groups
    pub fn group_count(self) -> usize {
        self.groups_of_3 + self.groups_of_4
    }

    /// Number of participants the pattern places
    pub fn participant_count(self) -> usize {
        self.groups_of_3 * 3 + self.groups_of_4 * 4
    }
}

/// Looks up the grouping pattern for `total` participants
///
/// Counts from 9 to 16 come from a fixed table. Larger rosters use as many
/// groups of four as possible and absorb the remainder with up to three
/// groups of three.
///
/// # Returns
///
/// `None` when `total` is small enough that everyone qualifies as a
/// single group
pub fn grouping_pattern(total: usize) -> Option<GroupingPattern> {
    if total <= AUTO_QUALIFY_MAX {
        return None;
    }

    let (groups_of_3, groups_of_4) = if total <= TABLE_MAX {
        TABLE[total - TABLE_MIN]
    } else {
        let fours = total / 4;
        match total % 4 {
            0 => (0, fours),
            3 => (1, fours),
            2 => (2, fours - 1),
            _ => (3, fours - 2),
        }
    };

    Some(GroupingPattern {
        groups_of_3,
        groups_of_4,
    })
}

/// Partitions the round 1 attendance list into groups
///
/// Participants are shuffled with `rng` and sliced into the groups of four
/// first, then the groups of three. Groups are numbered from 1 in formation
/// order. Group membership is not reproducible unless `rng` is seeded.
///
/// # Arguments
///
/// * `participants` - everyone marked present
/// * `round` - the round being formed, must be round 1
/// * `rng` - random source for the shuffle
///
/// # Errors
///
/// Returns [`Error::ManualRound`] for rounds 2 to 4, which are formed
/// through [`GroupFormation`].
pub fn partition(
    participants: &[Participant],
    round: Round,
    rng: &mut fastrand::Rng,
) -> Result<Vec<Group>, Error> {
    if !round.auto_grouped() {
        return Err(Error::ManualRound(round.number()));
    }

    if participants.is_empty() {
        return Ok(Vec::new());
    }

    let Some(pattern) = grouping_pattern(participants.len()) else {
        log::info!(
            "{} participants all qualify as a single group",
            participants.len()
        );
        return Ok(vec![Group {
            group_number: 1,
            members: participants.to_vec(),
        }]);
    };

    let mut shuffled = participants.to_vec();
    rng.shuffle(&mut shuffled);

    let sizes = std::iter::repeat_n(4, pattern.groups_of_4)
        .chain(std::iter::repeat_n(3, pattern.groups_of_3));

    let mut remaining = shuffled.into_iter();
    let groups = sizes
        .enumerate()
        .map(|(index, size)| Group {
            group_number: index + 1,
            members: remaining.by_ref().take(size).collect_vec(),
        })
        .collect_vec();

    log::info!(
        "partitioned {} participants into {} groups of 4 and {} groups of 3",
        participants.len(),
        pattern.groups_of_4,
        pattern.groups_of_3
    );

    Ok(groups)
}

/// One-line description of how a round is organised, shown at attendance
pub fn format_description(round: Round, total: usize) -> String {
    if !round.auto_grouped() {
        return "Participants compete in pairs or small groups".to_owned();
    }

    match grouping_pattern(total) {
        None => "All participants qualify to next round".to_owned(),
        Some(pattern) => format!(
            "{} participants in {} {}",
            pattern.participant_count(),
            pattern.group_count(),
            pluralizer::pluralize("group", pattern.group_count() as isize, false)
        ),
    }
}

/// Manual group formation for rounds 2 to 4
///
/// The proctor opens a formation session, toggles participants into a
/// pending group, and commits it. A participant can belong to one committed
/// group at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupFormation {
    committed: Vec<Group>,
    pending: Vec<Participant>,
    forming: bool,
}

impl GroupFormation {
    /// Opens a formation session, discarding any previous groups
    pub fn begin(&mut self) {
        self.committed.clear();
        self.pending.clear();
        self.forming = true;
    }

    /// Whether a formation session is open
    pub fn is_forming(&self) -> bool {
        self.forming
    }

    /// Groups committed so far
    pub fn groups(&self) -> &[Group] {
        &self.committed
    }

    /// Members of the group being assembled
    pub fn pending(&self) -> &[Participant] {
        &self.pending
    }

    /// Number the pending group will get when committed
    pub fn pending_group_number(&self) -> usize {
        self.committed.len() + 1
    }

    /// Finds the committed group `id` belongs to
    pub fn group_of(&self, id: Id) -> Option<usize> {
        self.committed
            .iter()
            .find(|g| g.contains(id))
            .map(|g| g.group_number)
    }

    /// Adds a participant to the pending group
    ///
    /// Adding someone who is already pending does nothing.
    ///
    /// # Errors
    ///
    /// * [`Error::NotForming`] if no session is open
    /// * [`Error::DuplicateAssignment`] if the participant is in a committed group
    /// * [`Error::GroupFull`] if the pending group is at capacity
    pub fn add_member(&mut self, participant: &Participant) -> Result<(), Error> {
        if !self.forming {
            return Err(Error::NotForming);
        }

        if let Some(group_number) = self.group_of(participant.id) {
            return Err(Error::DuplicateAssignment {
                name: participant.name.clone(),
                group_number,
            });
        }

        if self.pending.iter().any(|p| p.id == participant.id) {
            return Ok(());
        }

        if self.pending.len() >= MAX_GROUP_SIZE {
            return Err(Error::GroupFull(MAX_GROUP_SIZE));
        }

        self.pending.push(participant.clone());
        Ok(())
    }

    /// Removes a participant from the pending group or from the committed
    /// group they belong to
    ///
    /// A committed group left empty keeps its number; it is dropped when
    /// the formation is finished.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParticipant`] if the participant is not
    /// assigned anywhere.
    pub fn remove_member(&mut self, id: Id) -> Result<(), Error> {
        if let Some(position) = self.pending.iter().position(|p| p.id == id) {
            self.pending.remove(position);
            return Ok(());
        }

        for group in &mut self.committed {
            if let Some(position) = group.members.iter().position(|p| p.id == id) {
                group.members.remove(position);
                return Ok(());
            }
        }

        Err(Error::UnknownParticipant)
    }

    /// Toggles a participant in or out of the pending group
    ///
    /// # Errors
    ///
    /// Same as [`GroupFormation::add_member`].
    pub fn toggle_member(&mut self, participant: &Participant) -> Result<(), Error> {
        if self.pending.iter().any(|p| p.id == participant.id) {
            self.remove_member(participant.id)
        } else {
            self.add_member(participant)
        }
    }

    /// Commits the pending group and starts a new one
    ///
    /// # Returns
    ///
    /// The number assigned to the committed group
    ///
    /// # Errors
    ///
    /// * [`Error::NotForming`] if no session is open
    /// * [`Error::EmptyGroup`] if nobody is pending
    pub fn commit_pending_group(&mut self) -> Result<usize, Error> {
        if !self.forming {
            return Err(Error::NotForming);
        }
        if self.pending.is_empty() {
            return Err(Error::EmptyGroup);
        }

        let group_number = self.pending_group_number();
        self.committed.push(Group {
            group_number,
            members: std::mem::take(&mut self.pending),
        });

        log::debug!("committed manual group {group_number}");

        Ok(group_number)
    }

    /// Closes the session, dropping the pending group but keeping
    /// committed ones
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.forming = false;
    }

    /// Commits any pending members and closes the session
    ///
    /// # Returns
    ///
    /// All non-empty committed groups
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoGroupsFormed`] if there is nothing to return.
    /// The session is closed either way.
    pub fn finish(&mut self) -> Result<Vec<Group>, Error> {
        if self.forming && !self.pending.is_empty() {
            self.commit_pending_group()?;
        }
        self.forming = false;

        let groups = self
            .committed
            .iter()
            .filter(|g| !g.is_empty())
            .cloned()
            .collect_vec();

        if groups.is_empty() {
            Err(Error::NoGroupsFormed)
        } else {
            Ok(groups)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::participant::Student;

    fn roster(count: usize) -> Vec<Participant> {
        (0..count)
            .map(|i| {
                Participant::from_student(&Student {
                    name: format!("Student {i}"),
                    roll_no: i.to_string(),
                })
            })
            .collect()
    }

    #[test]
    fn test_table_patterns() {
        let expected = [
            (9, 3, 0),
            (10, 2, 1),
            (11, 1, 2),
            (12, 0, 3),
            (13, 3, 1),
            (14, 2, 2),
            (15, 1, 3),
            (16, 0, 4),
        ];
        for (total, threes, fours) in expected {
            let pattern = grouping_pattern(total).unwrap();
            assert_eq!((pattern.groups_of_3, pattern.groups_of_4), (threes, fours));
            assert_eq!(pattern.participant_count(), total);
        }
    }

    #[test]
    fn test_formula_patterns_cover_everyone() {
        for total in 17..200 {
            let pattern = grouping_pattern(total).unwrap();
            assert_eq!(pattern.participant_count(), total, "total {total}");
            assert!(pattern.groups_of_3 <= 3);
        }
        assert_eq!(
            grouping_pattern(17),
            Some(GroupingPattern {
                groups_of_3: 3,
                groups_of_4: 2
            })
        );
        assert_eq!(
            grouping_pattern(18),
            Some(GroupingPattern {
                groups_of_3: 2,
                groups_of_4: 3
            })
        );
    }

    #[test]
    fn test_small_rosters_have_no_pattern() {
        for total in 0..=8 {
            assert_eq!(grouping_pattern(total), None);
        }
    }

    #[test]
    fn test_partition_sizes_match_table() {
        let mut rng = fastrand::Rng::with_seed(7);
        for total in 9..=16 {
            let participants = roster(total);
            let groups = partition(&participants, Round::Top16, &mut rng).unwrap();
            let pattern = grouping_pattern(total).unwrap();

            assert_eq!(groups.len(), pattern.group_count());
            assert_eq!(groups.iter().map(Group::size).sum::<usize>(), total);
            assert!(groups.iter().all(|g| g.size() == 3 || g.size() == 4));
            assert_eq!(
                groups.iter().filter(|g| g.size() == 4).count(),
                pattern.groups_of_4
            );

            let ids: HashSet<Id> = groups.iter().flat_map(Group::member_ids).collect();
            assert_eq!(ids.len(), total);
        }
    }

    #[test]
    fn test_partition_fifteen() {
        let mut rng = fastrand::Rng::with_seed(1);
        let groups = partition(&roster(15), Round::Top16, &mut rng).unwrap();
        let sizes = groups.iter().map(Group::size).collect_vec();
        assert_eq!(sizes, vec![4, 4, 4, 3]);
        assert_eq!(
            groups.iter().map(|g| g.group_number).collect_vec(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_partition_small_roster_is_one_group() {
        let mut rng = fastrand::Rng::with_seed(3);
        for total in 1..=8 {
            let participants = roster(total);
            let groups = partition(&participants, Round::Top16, &mut rng).unwrap();
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].group_number, 1);
            assert_eq!(groups[0].members, participants);
        }
    }

    #[test]
    fn test_partition_empty_roster() {
        let mut rng = fastrand::Rng::with_seed(3);
        assert_eq!(partition(&[], Round::Top16, &mut rng), Ok(Vec::new()));
    }

    #[test]
    fn test_partition_is_reproducible_with_seed() {
        let participants = roster(13);
        let a = partition(&participants, Round::Top16, &mut fastrand::Rng::with_seed(42)).unwrap();
        let b = partition(&participants, Round::Top16, &mut fastrand::Rng::with_seed(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_partition_rejects_manual_rounds() {
        let mut rng = fastrand::Rng::with_seed(3);
        assert_eq!(
            partition(&roster(10), Round::Semifinal, &mut rng),
            Err(Error::ManualRound(3))
        );
    }

    #[test]
    fn test_format_description() {
        assert_eq!(
            format_description(Round::Top16, 15),
            "15 participants in 4 groups"
        );
        assert_eq!(
            format_description(Round::Top16, 6),
            "All participants qualify to next round"
        );
        assert_eq!(
            format_description(Round::Final, 6),
            "Participants compete in pairs or small groups"
        );
    }

    #[test]
    fn test_manual_formation_flow() {
        let students = roster(5);
        let mut formation = GroupFormation::default();
        formation.begin();

        formation.add_member(&students[0]).unwrap();
        formation.add_member(&students[1]).unwrap();
        assert_eq!(formation.commit_pending_group(), Ok(1));

        formation.add_member(&students[2]).unwrap();
        formation.add_member(&students[3]).unwrap();
        let groups = formation.finish().unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].group_number, 2);
        assert_eq!(groups[1].member_ids(), vec![students[2].id, students[3].id]);
        assert!(!formation.is_forming());
    }

    #[test]
    fn test_duplicate_assignment() {
        let students = roster(3);
        let mut formation = GroupFormation::default();
        formation.begin();
        formation.add_member(&students[0]).unwrap();
        formation.commit_pending_group().unwrap();

        assert_eq!(
            formation.add_member(&students[0]),
            Err(Error::DuplicateAssignment {
                name: "Student 0".to_owned(),
                group_number: 1
            })
        );

        formation.remove_member(students[0].id).unwrap();
        formation.add_member(&students[0]).unwrap();
        assert_eq!(formation.pending().len(), 1);
    }

    #[test]
    fn test_empty_and_full_groups() {
        let students = roster(5);
        let mut formation = GroupFormation::default();
        assert_eq!(formation.add_member(&students[0]), Err(Error::NotForming));

        formation.begin();
        assert_eq!(formation.commit_pending_group(), Err(Error::EmptyGroup));

        for s in &students[..4] {
            formation.add_member(s).unwrap();
        }
        assert_eq!(
            formation.add_member(&students[4]),
            Err(Error::GroupFull(MAX_GROUP_SIZE))
        );
    }

    #[test]
    fn test_toggle_member() {
        let students = roster(2);
        let mut formation = GroupFormation::default();
        formation.begin();
        formation.toggle_member(&students[0]).unwrap();
        assert_eq!(formation.pending().len(), 1);
        formation.toggle_member(&students[0]).unwrap();
        assert!(formation.pending().is_empty());
        assert_eq!(
            formation.remove_member(students[1].id),
            Err(Error::UnknownParticipant)
        );
    }

    #[test]
    fn test_cancel_keeps_committed_groups() {
        let students = roster(3);
        let mut formation = GroupFormation::default();
        formation.begin();
        formation.add_member(&students[0]).unwrap();
        formation.commit_pending_group().unwrap();
        formation.add_member(&students[1]).unwrap();
        formation.cancel();

        assert_eq!(formation.groups().len(), 1);
        assert!(formation.pending().is_empty());
        assert!(!formation.is_forming());
    }

    #[test]
    fn test_finish_drops_emptied_groups() {
        let students = roster(3);
        let mut formation = GroupFormation::default();
        formation.begin();
        formation.add_member(&students[0]).unwrap();
        formation.commit_pending_group().unwrap();
        formation.add_member(&students[1]).unwrap();
        formation.commit_pending_group().unwrap();
        formation.remove_member(students[0].id).unwrap();

        let groups = formation.finish().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_number, 2);

        let mut empty = GroupFormation::default();
        empty.begin();
        assert_eq!(empty.finish(), Err(Error::NoGroupsFormed));
    }
}
