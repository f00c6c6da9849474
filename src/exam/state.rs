//! Exam of a single group
//!
//! An exam walks one group through the round's questions:
//! `NotStarted → InProgress → AnswerRevealed → InProgress → … → Ended`.
//! Each question has its own countdown, which the proctor starts, pauses
//! and resumes. When the countdown runs out, or the proctor reveals the
//! answer, the question moves to `AnswerRevealed`. Leaving a revealed
//! question scores the proctor's marks into the leaderboard.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use super::{
    question::Question,
    timer::{Countdown, QuestionTimer},
};
use crate::{
    grouping::Group,
    leaderboard::{Leaderboard, ScoreEntry},
    participant::{Id, Status},
    round::Round,
    scoring::{self, ScalingNotice},
    store::auth::AuthSession,
};

/// Phase of the exam
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the proctor to start
    #[default]
    NotStarted,
    /// A question is on screen and can still be answered
    InProgress,
    /// The answer to the current question is shown
    AnswerRevealed,
    /// No more questions will be asked
    Ended,
}

impl Phase {
    /// Whether the exam is running
    pub fn is_active(self) -> bool {
        matches!(self, Phase::InProgress | Phase::AnswerRevealed)
    }
}

/// Proctor operations, used to report rejected requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Start the exam
    Start,
    /// Answer or reveal the current question
    Answer,
    /// Move past a revealed question
    Next,
    /// End the exam early
    FinishEarly,
    /// Mark a participant
    Mark,
    /// Start the countdown
    StartTimer,
    /// Pause the countdown
    PauseTimer,
    /// Resume the countdown
    ResumeTimer,
}

/// Errors raised by exam operations
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The question list is empty
    #[error("no questions loaded")]
    NoQuestionsLoaded,
    /// No proctor is signed in
    #[error("sign in before starting the exam")]
    Unauthenticated,
    /// The operation is not valid in the current phase
    #[error("cannot {action:?} while the exam is {phase:?}")]
    NotAllowed {
        /// What was attempted
        action: Action,
        /// Phase at the time
        phase: Phase,
    },
    /// The participant is not part of the examined group
    #[error("participant is not in the group being examined")]
    NotInGroup,
}

/// Countdown alarms scheduled by the exam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One second elapsed on the countdown of question `index`
    Tick {
        /// Question the tick was scheduled for
        index: usize,
        /// Timer generation the tick was scheduled for
        generation: u64,
    },
}

/// Observable outcome of an exam operation
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    /// A question was entered and its countdown set to the full budget
    TimerReset {
        /// Zero-based question index
        index: usize,
        /// Number of questions in the exam
        count: usize,
        /// Full countdown
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        budget: Duration,
    },
    /// The countdown started
    TimerStarted {
        /// Time left
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// The countdown was paused
    TimerPaused {
        /// Time left
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// The countdown continued after a pause
    TimerResumed {
        /// Time left
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// One second passed
    Countdown {
        /// Time left
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
        /// Threshold reached on this tick, if any
        signal: Countdown,
    },
    /// The answer is shown and further answers are refused
    AnswerRevealed {
        /// Zero-based question index
        index: usize,
        /// Answer text, if the question has one
        answer_latex: Option<String>,
        /// Option chosen by the group, if the reveal came from an answer
        selected: Option<usize>,
    },
    /// A participant's mark changed
    Marked {
        /// Who was marked
        participant: Id,
        /// New mark
        status: Status,
    },
    /// The marks of a question were scored
    Scored {
        /// Zero-based question index
        index: usize,
        /// Recorded leaderboard entries
        entries: Vec<ScoreEntry>,
        /// Renormalization notice for the proctor
        scaling: Option<ScalingNotice>,
    },
    /// The exam is over
    Ended {
        /// Number of questions that were scored
        questions_completed: usize,
    },
}

/// One group's pass through the round's questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    round: Round,
    group: Group,
    questions: Vec<Question>,
    total_participants: usize,
    index: usize,
    phase: Phase,
    timer: QuestionTimer,
    marks: HashMap<Id, Status>,
    selected: Option<usize>,
    scored: usize,
}

impl Exam {
    /// Prepares an exam for `group`
    ///
    /// # Arguments
    ///
    /// * `round` - round being played, selects the scoring table
    /// * `group` - the group being examined
    /// * `questions` - questions to ask, in order
    /// * `timer` - countdown configured with the round's budget
    /// * `total_participants` - participants across the whole round, used
    ///   for the scaling notice
    pub fn new(
        round: Round,
        group: Group,
        questions: Vec<Question>,
        timer: QuestionTimer,
        total_participants: usize,
    ) -> Self {
        let marks = Self::unmarked(&group);
        Self {
            round,
            group,
            questions,
            total_participants,
            index: 0,
            phase: Phase::NotStarted,
            timer,
            marks,
            selected: None,
            scored: 0,
        }
    }

    fn unmarked(group: &Group) -> HashMap<Id, Status> {
        group
            .member_ids()
            .into_iter()
            .map(|id| (id, Status::Unmarked))
            .collect()
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Round being played
    pub fn round(&self) -> Round {
        self.round
    }

    /// Group being examined
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Zero-based index of the current question
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of questions
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// The question on screen, if the exam has started and not ended
    pub fn question(&self) -> Option<&Question> {
        self.phase
            .is_active()
            .then(|| self.questions.get(self.index))
            .flatten()
    }

    /// The countdown of the current question
    pub fn timer(&self) -> &QuestionTimer {
        &self.timer
    }

    /// Current marks of every group member
    pub fn marks(&self) -> &HashMap<Id, Status> {
        &self.marks
    }

    /// Option chosen for the current question
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    fn change_phase(&mut self, before: Phase, after: Phase) -> bool {
        if self.phase == before {
            self.phase = after;
            true
        } else {
            false
        }
    }

    fn not_allowed(&self, action: Action) -> Error {
        Error::NotAllowed {
            action,
            phase: self.phase,
        }
    }

    fn schedule_tick<S: FnMut(crate::AlarmMessage, Duration)>(&self, schedule_message: &mut S) {
        schedule_message(
            AlarmMessage::Tick {
                index: self.index,
                generation: self.timer.generation(),
            }
            .into(),
            QuestionTimer::tick_interval(),
        );
    }

    fn enter_question(&mut self, index: usize) -> Event {
        self.index = index;
        self.timer.reset();
        self.marks = Self::unmarked(&self.group);
        self.selected = None;

        log::debug!(
            "group {} question {} of {}",
            self.group.group_number,
            index + 1,
            self.questions.len()
        );

        Event::TimerReset {
            index,
            count: self.questions.len(),
            budget: self.timer.budget(),
        }
    }

    /// Starts the exam on the first question
    ///
    /// The first question's countdown is reset but not started.
    ///
    /// # Errors
    ///
    /// * [`Error::NotAllowed`] unless the exam has not started yet
    /// * [`Error::Unauthenticated`] without a signed-in proctor
    /// * [`Error::NoQuestionsLoaded`] if there are no questions
    pub fn start(&mut self, session: Option<&AuthSession>) -> Result<Vec<Event>, Error> {
        if self.phase != Phase::NotStarted {
            return Err(self.not_allowed(Action::Start));
        }
        if session.is_none() {
            return Err(Error::Unauthenticated);
        }
        if self.questions.is_empty() {
            return Err(Error::NoQuestionsLoaded);
        }

        self.phase = Phase::InProgress;
        log::info!(
            "exam started for group {} in {}",
            self.group.group_number,
            self.round
        );

        Ok(vec![self.enter_question(0)])
    }

    /// Starts the current question's countdown
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless a question is in progress with a
    /// freshly reset countdown.
    pub fn start_timer<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        mut schedule_message: S,
    ) -> Result<Vec<Event>, Error> {
        if self.phase != Phase::InProgress || !self.timer.start() {
            return Err(self.not_allowed(Action::StartTimer));
        }

        self.schedule_tick(&mut schedule_message);
        Ok(vec![Event::TimerStarted {
            remaining: self.timer.remaining(),
        }])
    }

    /// Pauses the running countdown
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless the countdown is running.
    pub fn pause_timer(&mut self) -> Result<Vec<Event>, Error> {
        if self.phase != Phase::InProgress || !self.timer.pause() {
            return Err(self.not_allowed(Action::PauseTimer));
        }

        Ok(vec![Event::TimerPaused {
            remaining: self.timer.remaining(),
        }])
    }

    /// Resumes a paused countdown
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless the countdown is paused.
    pub fn resume_timer<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        mut schedule_message: S,
    ) -> Result<Vec<Event>, Error> {
        if self.phase != Phase::InProgress || !self.timer.resume() {
            return Err(self.not_allowed(Action::ResumeTimer));
        }

        self.schedule_tick(&mut schedule_message);
        Ok(vec![Event::TimerResumed {
            remaining: self.timer.remaining(),
        }])
    }

    fn reveal_current(&mut self) -> Event {
        self.timer.stop();
        log::debug!(
            "revealed answer {} for group {}",
            self.index + 1,
            self.group.group_number
        );
        Event::AnswerRevealed {
            index: self.index,
            answer_latex: self
                .questions
                .get(self.index)
                .and_then(|q| q.answer_latex.clone()),
            selected: self.selected,
        }
    }

    /// Records the group's answer and reveals the correct one
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless the question is still open.
    pub fn answer(&mut self, option_index: usize) -> Result<Vec<Event>, Error> {
        if !self.change_phase(Phase::InProgress, Phase::AnswerRevealed) {
            return Err(self.not_allowed(Action::Answer));
        }

        self.selected = Some(option_index);
        Ok(vec![self.reveal_current()])
    }

    /// Reveals the answer without recording a choice
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless the question is still open.
    pub fn reveal(&mut self) -> Result<Vec<Event>, Error> {
        if !self.change_phase(Phase::InProgress, Phase::AnswerRevealed) {
            return Err(self.not_allowed(Action::Answer));
        }

        Ok(vec![self.reveal_current()])
    }

    /// Sets a participant's mark for the current question
    ///
    /// # Errors
    ///
    /// * [`Error::NotAllowed`] unless the exam is running
    /// * [`Error::NotInGroup`] for someone outside the group
    pub fn mark(&mut self, participant: Id, status: Status) -> Result<Vec<Event>, Error> {
        if !self.phase.is_active() {
            return Err(self.not_allowed(Action::Mark));
        }
        let mark = self.marks.get_mut(&participant).ok_or(Error::NotInGroup)?;
        *mark = status;

        Ok(vec![Event::Marked {
            participant,
            status,
        }])
    }

    /// Applies a click on a mark button: the same status twice clears it
    ///
    /// # Errors
    ///
    /// Same as [`Exam::mark`].
    pub fn toggle_mark(&mut self, participant: Id, clicked: Status) -> Result<Vec<Event>, Error> {
        let current = self
            .marks
            .get(&participant)
            .copied()
            .ok_or(Error::NotInGroup)?;
        self.mark(participant, current.toggled(clicked))
    }

    fn score_current(&mut self, leaderboard: &mut Leaderboard) -> Event {
        let sheet = scoring::score(&self.marks, self.group.size(), self.round);
        let entries = leaderboard.add_sheet(self.group.group_number, self.index, &sheet);
        self.scored += 1;

        Event::Scored {
            index: self.index,
            entries,
            scaling: sheet.scaling_notice(self.total_participants),
        }
    }

    fn end(&mut self) -> Event {
        self.timer.stop();
        self.phase = Phase::Ended;
        log::info!(
            "exam ended for group {} after {} questions",
            self.group.group_number,
            self.scored
        );
        Event::Ended {
            questions_completed: self.scored,
        }
    }

    /// Scores the revealed question and moves on
    ///
    /// After the last question the exam ends.
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless the answer is revealed.
    pub fn next(&mut self, leaderboard: &mut Leaderboard) -> Result<Vec<Event>, Error> {
        if self.phase != Phase::AnswerRevealed {
            return Err(self.not_allowed(Action::Next));
        }

        let mut events = vec![self.score_current(leaderboard)];

        let next_index = self.index + 1;
        if next_index < self.questions.len() {
            self.phase = Phase::InProgress;
            events.push(self.enter_question(next_index));
        } else {
            events.push(self.end());
        }

        Ok(events)
    }

    /// Ends the exam regardless of the remaining questions
    ///
    /// A revealed question is scored first; an open one is discarded.
    ///
    /// # Errors
    ///
    /// [`Error::NotAllowed`] unless the exam is running.
    pub fn finish_early(&mut self, leaderboard: &mut Leaderboard) -> Result<Vec<Event>, Error> {
        if !self.phase.is_active() {
            return Err(self.not_allowed(Action::FinishEarly));
        }

        let mut events = Vec::new();
        if self.phase == Phase::AnswerRevealed {
            events.push(self.score_current(leaderboard));
        }
        events.push(self.end());

        Ok(events)
    }

    /// Handles a countdown alarm
    ///
    /// Alarms for another question or an older timer generation are
    /// ignored. Reaching zero reveals the answer.
    pub fn receive_alarm<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        mut schedule_message: S,
    ) -> Vec<Event> {
        let AlarmMessage::Tick { index, generation } = message;

        if self.phase != Phase::InProgress
            || index != self.index
            || !self.timer.accepts(generation)
        {
            return Vec::new();
        }

        match self.timer.tick() {
            Some(Countdown::TimeUp) => {
                self.phase = Phase::AnswerRevealed;
                vec![
                    Event::Countdown {
                        remaining: Duration::ZERO,
                        signal: Countdown::TimeUp,
                    },
                    self.reveal_current(),
                ]
            }
            Some(signal) => {
                self.schedule_tick(&mut schedule_message);
                vec![Event::Countdown {
                    remaining: self.timer.remaining(),
                    signal,
                }]
            }
            None => Vec::new(),
        }
    }
}
