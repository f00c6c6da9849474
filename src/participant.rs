//! Participants and their per-question marks
//!
//! A participant is a student taken from a college roster. Participants
//! are identified by a random [`Id`] for the duration of a round, and each
//! carries a correctness [`Status`] for the question currently on screen.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

/// A unique identifier for a participant
///
/// Ids are assigned when a roster is loaded for attendance and stay stable
/// across persistence so restored groups still refer to the same students.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A student as stored in a college roster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Full name
    pub name: String,
    /// College roll number
    pub roll_no: String,
}

/// A student taking part in the current round
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Identifier for this round
    pub id: Id,
    /// Full name
    pub name: String,
    /// College roll number
    pub roll_no: String,
}

impl Participant {
    /// Creates a participant with a fresh id from a roster entry
    pub fn from_student(student: &Student) -> Self {
        Self {
            id: Id::new(),
            name: student.name.clone(),
            roll_no: student.roll_no.clone(),
        }
    }
}

impl Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.roll_no)
    }
}

/// Correctness mark given by the proctor for the current question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Answered correctly
    Correct,
    /// Answered incorrectly
    Incorrect,
    /// Not marked yet, always scores zero
    #[default]
    Unmarked,
}

impl Status {
    /// Returns the status after the proctor clicks `clicked`
    ///
    /// Clicking the status a participant already has clears the mark.
    pub fn toggled(self, clicked: Status) -> Status {
        if self == clicked {
            Status::Unmarked
        } else {
            clicked
        }
    }
}
