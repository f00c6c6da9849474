//! Exam flow for a single group
//!
//! This module contains everything that happens between selecting a group
//! and showing its results: the questions, the per-question countdown and
//! the state machine that ties them to the proctor's marks.

pub mod question;
pub mod state;
pub mod timer;
