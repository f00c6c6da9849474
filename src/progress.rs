//! Round progress that survives restarts
//!
//! The progress cache records every group formed for the round and which
//! of them are still waiting to be examined. It is written to durable
//! storage after every change so that a reloaded proctor session resumes
//! with the same remaining groups.
//!
//! The stored value is a versioned envelope around [`SessionProgress`].
//! Unversioned blobs written before the envelope existed are still read.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    constants::persistence::{PROGRESS_KEY, PROGRESS_VERSION},
    grouping::Group,
    participant::Participant,
    round::Round,
    scoring,
    storage::{self, DurableStore},
};

/// Errors raised by the progress cache
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The group is not among the remaining groups
    #[error("group {0} is not waiting to be examined")]
    GroupNotFound(usize),
    /// The stored envelope was written by a newer schema
    #[error("stored progress has unsupported version {0}")]
    UnsupportedVersion(u32),
    /// The durable store failed
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// A participant tagged with the group they were placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedParticipant {
    /// The participant
    #[serde(flatten)]
    pub participant: Participant,
    /// Group number within the round
    pub group_number: usize,
}

/// Durable snapshot of a round's grouping
///
/// Every field is optional: a field missing from storage is unknown, not
/// empty.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    /// All groups formed for the round
    pub groups: Option<Vec<Group>>,
    /// Groups not yet examined, in selection order
    pub remaining_groups: Option<Vec<Group>>,
    /// Every grouped participant with their group number
    pub students_with_group_numbers: Option<Vec<GroupedParticipant>>,
    /// College the round belongs to
    pub college_name: Option<String>,
    /// Round being played
    pub round_number: Option<Round>,
    /// Number of participants across all groups
    pub total_participants: Option<usize>,
    /// Scoring description shown to the proctor
    pub scoring_system: Option<String>,
    /// Scaling description shown to the proctor
    pub scaling_info: Option<String>,
}

impl SessionProgress {
    /// Builds the snapshot for freshly formed groups
    pub fn for_round(college_name: &str, round: Round, groups: Vec<Group>) -> Self {
        let students_with_group_numbers = groups
            .iter()
            .flat_map(|group| {
                group.members.iter().map(|participant| GroupedParticipant {
                    participant: participant.clone(),
                    group_number: group.group_number,
                })
            })
            .collect_vec();
        let total = students_with_group_numbers.len();

        Self {
            remaining_groups: Some(groups.clone()),
            groups: Some(groups),
            students_with_group_numbers: Some(students_with_group_numbers),
            college_name: Some(college_name.to_owned()),
            round_number: Some(round),
            total_participants: Some(total),
            scoring_system: Some(scoring::scoring_system(round, total).to_owned()),
            scaling_info: Some(scoring::scaling_info(round, total).to_owned()),
        }
    }

    /// Whether this snapshot belongs to `college_name`, and to `round` when given
    pub fn matches(&self, college_name: &str, round: Option<Round>) -> bool {
        self.college_name.as_deref() == Some(college_name)
            && round.is_none_or(|round| self.round_number == Some(round))
    }

    /// Every participant of the round, in group order
    pub fn participants(&self) -> Vec<Participant> {
        self.groups
            .iter()
            .flatten()
            .flat_map(|group| group.members.iter().cloned())
            .collect_vec()
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    payload: &'a SessionProgress,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    payload: serde_json::Value,
}

/// What the proctor should be offered once groups run out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advancement {
    /// Groups remain, or the remaining groups are unknown
    Pending,
    /// Every group was examined and another round follows
    NextRound(Round),
    /// The final was completed
    Feedback,
}

/// Tracks and persists the groups of the active round
#[derive(Debug)]
pub struct ProgressCache<S> {
    store: S,
    progress: SessionProgress,
}

impl<S: DurableStore> ProgressCache<S> {
    /// Creates an empty cache over `store`; nothing is read until [`ProgressCache::restore`]
    pub fn new(store: S) -> Self {
        Self {
            store,
            progress: SessionProgress::default(),
        }
    }

    /// The current snapshot
    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    /// Groups still waiting, empty if unknown
    pub fn remaining_groups(&self) -> &[Group] {
        self.progress.remaining_groups.as_deref().unwrap_or_default()
    }

    /// All groups of the round, empty if unknown
    pub fn all_groups(&self) -> &[Group] {
        self.progress.groups.as_deref().unwrap_or_default()
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces the snapshot with freshly formed groups and persists it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the snapshot cannot be written.
    pub fn begin_round(
        &mut self,
        college_name: &str,
        round: Round,
        groups: Vec<Group>,
    ) -> Result<(), Error> {
        log::info!(
            "tracking {} groups for {college_name}, {round}",
            groups.len()
        );
        self.progress = SessionProgress::for_round(college_name, round, groups);
        self.persist()
    }

    /// Removes a group from the remaining groups and persists the result
    ///
    /// # Errors
    ///
    /// * [`Error::GroupNotFound`] if the group is not remaining, for
    ///   example because it was already consumed
    /// * [`Error::Storage`] if the snapshot cannot be written; the group
    ///   is consumed in memory regardless
    pub fn consume_next_group(&mut self, group_number: usize) -> Result<Group, Error> {
        let remaining = self
            .progress
            .remaining_groups
            .as_mut()
            .ok_or(Error::GroupNotFound(group_number))?;

        let position = remaining
            .iter()
            .position(|g| g.group_number == group_number)
            .ok_or(Error::GroupNotFound(group_number))?;

        let group = remaining.remove(position);
        log::info!(
            "consumed group {group_number}, {} remaining",
            remaining.len()
        );

        self.persist()?;
        Ok(group)
    }

    /// Writes the snapshot, overwriting whatever was stored
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store rejects the write.
    pub fn persist(&mut self) -> Result<(), Error> {
        let encoded = serde_json::to_string(&EnvelopeRef {
            version: PROGRESS_VERSION,
            payload: &self.progress,
        })
        .map_err(storage::Error::from)?;

        self.store.save(PROGRESS_KEY, &encoded)?;
        log::debug!("persisted progress ({} bytes)", encoded.len());
        Ok(())
    }

    /// Reloads the last persisted snapshot for `college_name`
    ///
    /// Nothing stored, or a snapshot for another college or round, is not
    /// an error: the caller has to form groups again.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedVersion`] for an envelope from a newer schema
    /// * [`Error::Storage`] if the store fails or the value is unreadable
    pub fn restore(
        &mut self,
        college_name: &str,
        round: Option<Round>,
    ) -> Result<Option<&SessionProgress>, Error> {
        let Some(encoded) = self.store.load(PROGRESS_KEY)? else {
            return Ok(None);
        };

        let progress = decode(&encoded)?;

        if !progress.matches(college_name, round) {
            log::info!("stored progress belongs to another round context, ignoring");
            return Ok(None);
        }

        self.progress = progress;
        Ok(Some(&self.progress))
    }

    /// Forgets the snapshot in memory and in storage
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store fails.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.progress = SessionProgress::default();
        self.store.remove(PROGRESS_KEY)?;
        Ok(())
    }

    /// Whether every group of a known round has been consumed
    pub fn round_complete(&self) -> bool {
        self.progress
            .remaining_groups
            .as_ref()
            .is_some_and(Vec::is_empty)
            && self.progress.round_number.is_some()
    }

    /// What to offer the proctor next
    pub fn advancement(&self) -> Advancement {
        match self.progress.round_number {
            Some(round) if self.round_complete() => {
                round.next().map_or(Advancement::Feedback, Advancement::NextRound)
            }
            _ => Advancement::Pending,
        }
    }
}

/// Reads either the versioned envelope or the older bare snapshot
///
/// A blob with a `version` key is always treated as an envelope, so a
/// payload that fails to decode is an error rather than an empty snapshot.
fn decode(encoded: &str) -> Result<SessionProgress, Error> {
    let value: serde_json::Value =
        serde_json::from_str(encoded).map_err(|e| Error::Storage(e.into()))?;

    if value.get("version").is_none() {
        log::debug!("reading unversioned progress");
        return serde_json::from_value(value).map_err(|e| Error::Storage(e.into()));
    }

    let Envelope { version, payload } =
        serde_json::from_value(value).map_err(|e| Error::Storage(e.into()))?;
    if version > PROGRESS_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    serde_json::from_value(payload).map_err(|e| Error::Storage(e.into()))
}
