//! # Integral Cup
//!
//! Competition engine for the Integral Cup, a four-round mathematics
//! contest run by a proctor for one college at a time. The crate forms
//! groups from attendance, runs each group through a timed question set,
//! scores the proctor's correctness marks, and keeps the round's progress
//! in durable storage so a reloaded session resumes where it stopped.
//!
//! [`competition::Competition`] ties everything together; the other
//! modules can be used on their own.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod competition;
pub mod config;
pub mod constants;
pub mod exam;
pub mod grouping;
pub mod leaderboard;
pub mod participant;
pub mod progress;
pub mod round;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod store;

/// Full-screen state sent to the proctor view
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Screen of the competition driver
    Competition(competition::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Incremental updates sent to the proctor view
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Driver updates and notices
    Competition(competition::UpdateMessage),
    /// Exam events
    Exam(exam::state::Event),
}

/// Alarms the embedder schedules and feeds back after a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Countdown alarms
    Exam(exam::state::AlarmMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Any error the crate can raise
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum Error {
    /// Driver errors
    #[error(transparent)]
    Competition(#[from] competition::Error),
    /// Invalid options
    #[error(transparent)]
    Config(#[from] config::Error),
    /// Exam errors
    #[error(transparent)]
    Exam(#[from] exam::state::Error),
    /// Group formation errors
    #[error(transparent)]
    Grouping(#[from] grouping::Error),
    /// Progress cache errors
    #[error(transparent)]
    Progress(#[from] progress::Error),
    /// Durable storage errors
    #[error(transparent)]
    Storage(#[from] storage::Error),
    /// Collaborator store errors
    #[error(transparent)]
    Store(#[from] store::Error),
}

/// A list cut down to a display limit that remembers its full length
///
/// Used for standings, where the view shows the top rows and the number
/// of participants.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    exact_count: usize,
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Takes at most `limit` items from `list`
    ///
    /// # Arguments
    ///
    /// * `list` - items in display order
    /// * `limit` - maximum number of items kept
    /// * `exact_count` - length of the full list
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Applies `f` to every kept item
    pub fn map<F, U>(self, f: F) -> TruncatedVec<U>
    where
        F: Fn(T) -> U,
    {
        TruncatedVec {
            exact_count: self.exact_count,
            items: self.items.into_iter().map(f).collect_vec(),
        }
    }

    /// Length of the full list
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// The kept items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_vec_keeps_count() {
        let truncated = TruncatedVec::new([3., 2., 1., 0.].into_iter(), 2, 4);
        assert_eq!(truncated.exact_count(), 4);
        assert_eq!(truncated.items(), &[3., 2.]);

        let empty = TruncatedVec::<f64>::default();
        assert_eq!(empty.exact_count(), 0);
        assert!(empty.items().is_empty());
    }

    #[test]
    fn test_truncated_vec_map() {
        let truncated = TruncatedVec::new([1, 2, 3].into_iter(), 2, 3);
        let mapped = truncated.map(|x| format!("student {x}"));
        assert_eq!(mapped.exact_count(), 3);
        assert_eq!(mapped.items(), &["student 1", "student 2"]);
    }

    #[test]
    fn test_update_message_to_message() {
        let message = UpdateMessage::from(competition::UpdateMessage::Notice(
            "no questions available for group 2".to_owned(),
        ));
        let json = message.to_message();
        assert!(json.contains("Competition"));
        assert!(json.contains("Notice"));
        assert!(json.contains("group 2"));
    }

    #[test]
    fn test_exam_events_serialize_durations_as_millis() {
        let message = UpdateMessage::from(exam::state::Event::TimerReset {
            index: 0,
            count: 3,
            budget: std::time::Duration::from_secs(180),
        });
        assert_eq!(
            message.to_message(),
            r#"{"Exam":{"TimerReset":{"index":0,"count":3,"budget":180000}}}"#
        );
    }

    #[test]
    fn test_errors_display_their_source() {
        let error = Error::from(progress::Error::GroupNotFound(2));
        assert_eq!(error.to_string(), "group 2 is not waiting to be examined");
    }
}
