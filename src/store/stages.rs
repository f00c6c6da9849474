//! Question stages
//!
//! A stage is a question set keyed by `(stage_name, stage_id)`. The stage
//! name identifies the round and the stage id the group the questions are
//! written for; stage id 1 doubles as the default set for groups without
//! one of their own.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Error;
use crate::{
    constants::stages::{FALLBACK_STAGE_ID, MAX_QUESTION_COUNT},
    exam::question::Question,
    round::Round,
};

/// A question set as submitted by an admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// Round stage name, e.g. `"semifinal"`
    #[garde(length(min = 1))]
    pub stage_name: String,
    /// Group number the questions are for
    #[garde(range(min = 1))]
    pub stage_id: u32,
    /// The questions, in the order they are asked
    #[garde(length(max = MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<Question>,
}

/// Whether an upsert created or replaced a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upsert {
    /// No stage had this key
    Created,
    /// An existing stage's questions were replaced
    Updated,
}

/// Listing entry for a stored stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    /// Record id, used for deletion
    pub id: Uuid,
    /// Round stage name
    pub stage_name: String,
    /// Group number
    pub stage_id: u32,
    /// Number of questions stored
    pub question_count: usize,
}

/// Questions served to a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    /// Round stage name
    pub stage_name: String,
    /// Stage id the questions came from, 1 when the default set was used
    pub stage_id: u32,
    /// Group the questions were requested for
    pub group_number: usize,
    /// The questions
    pub questions: Vec<Question>,
}

/// Where the competition gets its questions from
pub trait QuestionSource {
    /// Questions for a group in a round
    ///
    /// # Returns
    ///
    /// `None` when neither the group nor the default set has questions
    fn question_set(&self, round: Round, group_number: usize) -> Option<QuestionSet>;
}

/// Stored question stages
#[derive(Debug, Default, Clone)]
pub struct Stages {
    records: Vec<(Uuid, Stage)>,
}

impl Stages {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the stage with the same name and id
    ///
    /// Concurrent admins are not coordinated; the last write wins.
    ///
    /// # Returns
    ///
    /// Whether the stage was created or updated, and its record id
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the stage fails validation.
    pub fn upsert(&mut self, stage: Stage) -> Result<(Upsert, Uuid), Error> {
        stage.validate()?;

        if let Some((id, existing)) = self
            .records
            .iter_mut()
            .find(|(_, s)| s.stage_name == stage.stage_name && s.stage_id == stage.stage_id)
        {
            existing.questions = stage.questions;
            log::info!(
                "updated stage {} {}",
                existing.stage_name,
                existing.stage_id
            );
            return Ok((Upsert::Updated, *id));
        }

        let id = Uuid::new_v4();
        log::info!("created stage {} {}", stage.stage_name, stage.stage_id);
        self.records.push((id, stage));
        Ok((Upsert::Created, id))
    }

    fn find(&self, stage_name: &str, stage_id: u32) -> Option<&Stage> {
        self.records
            .iter()
            .map(|(_, s)| s)
            .find(|s| s.stage_name == stage_name && s.stage_id == stage_id)
    }

    /// Questions for a group, falling back to the default set
    pub fn fetch(&self, stage_name: &str, group_number: usize) -> Option<QuestionSet> {
        let stage = u32::try_from(group_number)
            .ok()
            .and_then(|stage_id| self.find(stage_name, stage_id))
            .or_else(|| {
                log::debug!("no {stage_name} questions for group {group_number}, using default");
                self.find(stage_name, FALLBACK_STAGE_ID)
            })?;

        Some(QuestionSet {
            stage_name: stage.stage_name.clone(),
            stage_id: stage.stage_id,
            group_number,
            questions: stage.questions.clone(),
        })
    }

    /// Summaries of every stored stage
    pub fn list(&self) -> Vec<StageSummary> {
        self.records
            .iter()
            .map(|(id, stage)| StageSummary {
                id: *id,
                stage_name: stage.stage_name.clone(),
                stage_id: stage.stage_id,
                question_count: stage.questions.len(),
            })
            .collect_vec()
    }

    /// Deletes a stage by record id
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no stage has this id.
    pub fn delete(&mut self, id: Uuid) -> Result<(), Error> {
        let position = self
            .records
            .iter()
            .position(|(record_id, _)| *record_id == id)
            .ok_or_else(|| Error::NotFound(format!("stage {id}")))?;
        self.records.remove(position);
        Ok(())
    }
}

impl QuestionSource for Stages {
    fn question_set(&self, round: Round, group_number: usize) -> Option<QuestionSet> {
        self.fetch(round.stage_name(), group_number)
    }
}
