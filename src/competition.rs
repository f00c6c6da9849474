//! Competition driver
//!
//! [`Competition`] owns every component for one college's competition and
//! routes the proctor's input to them. The proctor moves through the
//! screens of each round:
//!
//! ```text
//! Attendance → (Formation) → GroupSelection → Exam → GroupResults
//!                                  ↑                      │
//!                                  └──────────────────────┤
//!                                                         ↓
//!                       Attendance of next round ← RoundComplete → Feedback
//! ```
//!
//! Every failure is reported to the proctor as a notice and leaves the
//! competition on the screen it was on.

use std::{collections::HashMap, mem::discriminant, time::Duration};

use enum_map::EnumMap;
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    AlarmMessage, TruncatedVec,
    config::Options,
    exam::{
        question::Question,
        state::{Exam, Phase as ExamPhase},
        timer::TimerState,
    },
    grouping::{self, Group, GroupFormation},
    leaderboard::Leaderboard,
    participant::{Id, Participant, Status, Student},
    progress::{self, Advancement, ProgressCache},
    round::Round,
    scoring,
    session::ProctorView,
    storage::{self, DurableStore},
    store::{
        auth::AuthSession,
        cache::{RosterCache, RosterSource},
        stages::QuestionSource,
    },
};

/// Errors raised by the driver itself
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// The request does not apply to the current screen
    #[error("{0} is not available on this screen")]
    NotAvailable(&'static str),
    /// No proctor is signed in
    #[error("sign in to run the competition")]
    Unauthenticated,
    /// The signed-in proctor belongs to another college
    #[error("signed in for {0}, not for this college")]
    WrongCollege(String),
    /// Nobody is marked present
    #[error("mark at least one student present")]
    NoParticipants,
    /// Neither the group nor the default set has questions
    #[error("no questions available for group {0}")]
    NoQuestions(usize),
    /// Feedback text was empty or the rating out of range
    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),
}

/// Current screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Phase {
    /// Marking who is present for the round
    Attendance,
    /// Assembling groups by hand, rounds 2 to 4
    Formation,
    /// Choosing the next group to examine
    GroupSelection,
    /// A group is being examined
    Exam(Box<Exam>),
    /// Results of the group that was just examined
    GroupResults(usize),
    /// Every group of the round was examined
    RoundComplete,
    /// The final is over
    Feedback,
}

/// Input from the proctor
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingMessage {
    /// Load the college roster for attendance, from cache if fresh
    LoadRoster,
    /// Load the college roster bypassing the cache
    RefreshRoster,
    /// Mark a student present or absent
    SetPresent {
        /// Student to mark
        participant: Id,
        /// Whether they are present
        present: bool,
    },
    /// Form groups from the present students
    FormGroups,
    /// Add a student to the pending group
    AddMember(Id),
    /// Remove a student from whichever group holds them
    RemoveMember(Id),
    /// Toggle a student in or out of the pending group
    ToggleMember(Id),
    /// Commit the pending group
    CommitGroup,
    /// Abandon manual formation and return to attendance
    CancelFormation,
    /// Accept the manually formed groups
    FinishFormation,
    /// Go back to attendance, discarding the round's groups
    RedoAttendance,
    /// Examine the group with this number
    SelectGroup(usize),
    /// Start the exam of the selected group
    StartExam,
    /// Start the countdown
    StartTimer,
    /// Pause the countdown
    PauseTimer,
    /// Resume the countdown
    ResumeTimer,
    /// Record the group's answer and reveal the correct one
    Answer(usize),
    /// Reveal the answer
    Reveal,
    /// Set a mark
    Mark {
        /// Who to mark
        participant: Id,
        /// The mark
        status: Status,
    },
    /// Click a mark button
    ToggleMark {
        /// Who to mark
        participant: Id,
        /// The button clicked
        status: Status,
    },
    /// Score the revealed question and move on
    Next,
    /// End the exam now
    FinishEarly,
    /// Leave the group results
    Continue,
    /// Move on once the round is complete
    AdvanceRound,
    /// Leave feedback after the final
    SubmitFeedback {
        /// Free text
        feedback: String,
        /// Rating from 1 to 5
        rating: u8,
    },
}

/// Feedback left after the final
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FeedbackEntry {
    /// Free text, trimmed
    #[garde(length(min = 1))]
    pub feedback: String,
    /// Rating from 1 to 5
    #[garde(range(min = 1, max = 5))]
    pub rating: u8,
}

/// A student on the attendance sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    /// The student
    pub participant: Participant,
    /// Whether they are present
    pub present: bool,
}

/// Standings for display, by name
#[derive(Debug, Serialize, Clone)]
pub struct LeaderboardMessage {
    /// Standings now
    pub current: TruncatedVec<(String, f64)>,
    /// Standings before the latest question
    pub prior: TruncatedVec<(String, f64)>,
}

/// Incremental updates for the proctor view
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// Non-fatal problem to show as a toast
    Notice(String),
    /// Attendance sheet changed
    Attendance(Vec<AttendanceEntry>),
    /// Manual formation changed
    Formation {
        /// Groups committed so far
        groups: Vec<Group>,
        /// Members of the pending group
        pending: Vec<Participant>,
        /// Number of the pending group
        pending_group_number: usize,
    },
    /// A group was taken off the remaining list for its exam
    GroupSelected {
        /// The group
        group: Group,
        /// Number of questions it will be asked
        question_count: usize,
        /// Stage the questions came from
        stage_id: u32,
    },
    /// Feedback was recorded
    FeedbackReceived(FeedbackEntry),
    /// A round begins
    RoundStarted {
        /// The round
        round: Round,
        /// Display label
        label: String,
    },
}

/// Full state of the current screen
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// Attendance screen
    Attendance {
        /// Round the attendance is for
        round: Round,
        /// College name
        college_name: String,
        /// How the round is organised
        description: String,
        /// Attendance sheet
        entries: Vec<AttendanceEntry>,
    },
    /// Manual formation screen
    Formation {
        /// Round being formed
        round: Round,
        /// Present students
        available: Vec<Participant>,
        /// Groups committed so far
        groups: Vec<Group>,
        /// Members of the pending group
        pending: Vec<Participant>,
    },
    /// Group selection screen
    GroupSelection {
        /// Round being played
        round: Round,
        /// Every group of the round
        groups: Vec<Group>,
        /// Numbers of the groups not yet examined
        remaining: Vec<usize>,
        /// Scoring table in words
        scoring_system: String,
        /// Scaling in words
        scaling_info: String,
    },
    /// Exam screen
    Exam {
        /// Round being played
        round: Round,
        /// Group being examined
        group: Group,
        /// Zero-based question index
        index: usize,
        /// Number of questions
        count: usize,
        /// Question on screen
        question: Option<Question>,
        /// Exam phase
        phase: ExamPhase,
        /// Countdown state
        timer: TimerState,
        /// Time left
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
        /// Marks in member order
        marks: Vec<(Id, Status)>,
        /// Option chosen by the group
        selected: Option<usize>,
    },
    /// Results of one group
    GroupResults {
        /// The group
        group_number: usize,
        /// Members and their round totals, best first
        standings: Vec<(String, f64)>,
    },
    /// End of round screen
    RoundComplete {
        /// The round
        round: Round,
        /// What comes next
        advancement: Advancement,
        /// Round standings
        leaderboard: LeaderboardMessage,
    },
    /// After the final
    Feedback {
        /// Final standings
        leaderboard: LeaderboardMessage,
        /// Feedback recorded so far
        submitted: Vec<FeedbackEntry>,
    },
}

/// Collaborators injected into a [`Competition`]
#[derive(Debug)]
pub struct Services<S, R, Q> {
    /// Where progress survives restarts
    pub store: S,
    /// Where rosters come from
    pub rosters: R,
    /// Where questions come from
    pub questions: Q,
}

/// One college's competition
#[derive(Debug)]
pub struct Competition<S, R, Q> {
    options: Options,
    college_name: String,
    auth: Option<AuthSession>,
    progress: ProgressCache<S>,
    rosters: RosterCache<R>,
    questions: Q,
    rng: fastrand::Rng,
    round: Round,
    phase: Phase,
    attendance: Vec<AttendanceEntry>,
    formation: GroupFormation,
    participants: HashMap<Id, Participant>,
    leaderboards: EnumMap<Round, Leaderboard>,
    feedback: Vec<FeedbackEntry>,
}

impl<S: DurableStore, R: RosterSource, Q: QuestionSource> Competition<S, R, Q> {
    /// Creates the competition and restores any persisted progress
    ///
    /// A stored snapshot for this college puts the competition back on the
    /// group selection screen of the stored round. An unreadable snapshot
    /// is logged and ignored.
    ///
    /// # Arguments
    ///
    /// * `options` - validated settings
    /// * `college_name` - the college competing
    /// * `services` - storage, roster and question collaborators
    /// * `rng` - random source for round 1 shuffles
    ///
    /// # Errors
    ///
    /// * [`crate::Error::Config`] if `options` are invalid
    /// * [`crate::Error::Progress`] if the store cannot be reached
    pub fn init(
        options: Options,
        college_name: &str,
        services: Services<S, R, Q>,
        rng: fastrand::Rng,
    ) -> Result<Self, crate::Error> {
        options.check()?;

        let Services {
            store,
            rosters,
            questions,
        } = services;

        let mut competition = Self {
            options,
            college_name: college_name.to_owned(),
            auth: None,
            progress: ProgressCache::new(store),
            rosters: RosterCache::new(rosters, options.roster_cache_ttl()),
            questions,
            rng,
            round: Round::default(),
            phase: Phase::Attendance,
            attendance: Vec::new(),
            formation: GroupFormation::default(),
            participants: HashMap::new(),
            leaderboards: EnumMap::default(),
            feedback: Vec::new(),
        };

        match competition.progress.restore(college_name, None) {
            Ok(Some(restored)) => {
                let round = restored.round_number;
                let participants = restored.participants();
                if let Some(round) = round {
                    log::info!("restored progress for {college_name}, {round}");
                    competition.round = round;
                    competition.participants =
                        participants.into_iter().map(|p| (p.id, p)).collect();
                    competition.phase = if competition.progress.round_complete() {
                        Phase::RoundComplete
                    } else {
                        Phase::GroupSelection
                    };
                }
            }
            Ok(None) => {}
            Err(progress::Error::Storage(e @ storage::Error::Unavailable { .. })) => {
                return Err(progress::Error::Storage(e).into());
            }
            Err(e) => log::warn!("ignoring stored progress: {e}"),
        }

        Ok(competition)
    }

    /// Forgets all progress, in memory and in storage
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Progress`] if the store fails.
    pub fn teardown(&mut self) -> Result<(), crate::Error> {
        self.progress.clear()?;
        self.rosters.clear();
        self.round = Round::default();
        self.phase = Phase::Attendance;
        self.attendance.clear();
        self.formation = GroupFormation::default();
        self.participants.clear();
        self.leaderboards = EnumMap::default();
        self.feedback.clear();
        log::info!("tore down competition for {}", self.college_name);
        Ok(())
    }

    /// Attaches a signed-in proctor
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongCollege`] if the session belongs to another
    /// college.
    pub fn sign_in(&mut self, session: AuthSession) -> Result<(), Error> {
        if session.college_name != self.college_name {
            return Err(Error::WrongCollege(session.college_name));
        }
        log::info!("{} signed in", session.username);
        self.auth = Some(session);
        Ok(())
    }

    /// Detaches the proctor
    pub fn sign_out(&mut self) {
        self.auth = None;
    }

    /// Current screen
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Round being played
    pub fn round(&self) -> Round {
        self.round
    }

    /// College name
    pub fn college_name(&self) -> &str {
        &self.college_name
    }

    /// The progress cache
    pub fn progress(&self) -> &ProgressCache<S> {
        &self.progress
    }

    /// Attendance sheet of the current round
    pub fn attendance(&self) -> &[AttendanceEntry] {
        &self.attendance
    }

    /// Scores of a round
    pub fn leaderboard(&self, round: Round) -> &Leaderboard {
        &self.leaderboards[round]
    }

    /// Feedback recorded after the final
    pub fn feedback(&self) -> &[FeedbackEntry] {
        &self.feedback
    }

    /// The roster cache
    pub fn rosters(&self) -> &RosterCache<R> {
        &self.rosters
    }

    fn require_auth(&self) -> Result<(), Error> {
        if self.auth.is_some() {
            Ok(())
        } else {
            Err(Error::Unauthenticated)
        }
    }

    fn name_of(&self, id: Id) -> String {
        self.participants
            .get(&id)
            .map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    fn total_participants(&self) -> usize {
        self.progress
            .progress()
            .total_participants
            .unwrap_or_else(|| self.progress.all_groups().iter().map(Group::size).sum())
    }

    fn present(&self) -> Vec<Participant> {
        self.attendance
            .iter()
            .filter(|entry| entry.present)
            .map(|entry| entry.participant.clone())
            .collect_vec()
    }

    fn leaderboard_message(&self) -> LeaderboardMessage {
        let [current, prior] =
            self.leaderboards[self.round].last_two_standings(self.options.leaderboard_limit());
        LeaderboardMessage {
            current: current.map(|(id, points)| (self.name_of(id), points)),
            prior: prior.map(|(id, points)| (self.name_of(id), points)),
        }
    }

    fn formation_message(&self) -> UpdateMessage {
        UpdateMessage::Formation {
            groups: self.formation.groups().to_vec(),
            pending: self.formation.pending().to_vec(),
            pending_group_number: self.formation.pending_group_number(),
        }
    }

    /// Handles input from the proctor
    ///
    /// Errors never escape: they are sent to `view` as a notice and the
    /// competition stays where it was. After a screen change the full
    /// state is sent as well.
    ///
    /// # Arguments
    ///
    /// * `message` - the proctor's input
    /// * `schedule_message` - schedules an alarm to be fed back through
    ///   [`Competition::receive_alarm`] after the given delay
    /// * `view` - receives updates
    pub fn receive_message<V: ProctorView, F: FnMut(AlarmMessage, web_time::Duration)>(
        &mut self,
        message: IncomingMessage,
        mut schedule_message: F,
        view: &V,
    ) {
        let before = discriminant(&self.phase);

        if let Err(e) = self.handle(message, &mut schedule_message, view) {
            log::warn!("rejected proctor input: {e}");
            view.send_message(&UpdateMessage::Notice(e.to_string()).into());
            return;
        }

        if discriminant(&self.phase) != before {
            view.send_state(&self.state_message());
        }
    }

    fn handle<V: ProctorView, F: FnMut(AlarmMessage, web_time::Duration)>(
        &mut self,
        message: IncomingMessage,
        schedule_message: &mut F,
        view: &V,
    ) -> Result<(), crate::Error> {
        match (&self.phase, message) {
            (Phase::Attendance, IncomingMessage::LoadRoster) => {
                let students = self.rosters.get(&self.college_name)?;
                self.load_attendance(&students, view);
            }
            (Phase::Attendance, IncomingMessage::RefreshRoster) => {
                let students = self.rosters.refresh(&self.college_name)?;
                self.load_attendance(&students, view);
            }
            (Phase::Attendance, IncomingMessage::SetPresent { participant, present }) => {
                let entry = self
                    .attendance
                    .iter_mut()
                    .find(|entry| entry.participant.id == participant)
                    .ok_or(grouping::Error::UnknownParticipant)?;
                entry.present = present;
                view.send_message(&UpdateMessage::Attendance(self.attendance.clone()).into());
            }
            (Phase::Attendance, IncomingMessage::FormGroups) => self.form_groups()?,
            (Phase::Formation, IncomingMessage::AddMember(id)) => {
                let participant = self.find_present(id)?;
                self.formation.add_member(&participant)?;
                view.send_message(&self.formation_message().into());
            }
            (Phase::Formation, IncomingMessage::ToggleMember(id)) => {
                let participant = self.find_present(id)?;
                self.formation.toggle_member(&participant)?;
                view.send_message(&self.formation_message().into());
            }
            (Phase::Formation, IncomingMessage::RemoveMember(id)) => {
                self.formation.remove_member(id)?;
                view.send_message(&self.formation_message().into());
            }
            (Phase::Formation, IncomingMessage::CommitGroup) => {
                self.formation.commit_pending_group()?;
                view.send_message(&self.formation_message().into());
            }
            (Phase::Formation, IncomingMessage::CancelFormation) => {
                self.formation.cancel();
                self.phase = Phase::Attendance;
            }
            (Phase::Formation, IncomingMessage::FinishFormation) => {
                let mut formation = self.formation.clone();
                let groups = formation.finish()?;
                self.formation = formation;
                self.begin_round(groups)?;
            }
            (
                Phase::Formation | Phase::GroupSelection | Phase::RoundComplete,
                IncomingMessage::RedoAttendance,
            ) => {
                self.progress.clear()?;
                self.formation = GroupFormation::default();
                self.leaderboards[self.round] = Leaderboard::default();
                self.phase = Phase::Attendance;
                log::info!("attendance redone for {}", self.round);
            }
            (Phase::GroupSelection, IncomingMessage::SelectGroup(group_number)) => {
                self.select_group(group_number, view)?;
            }
            (Phase::Exam(_), message) => self.exam_message(message, schedule_message, view)?,
            (Phase::GroupResults(_), IncomingMessage::Continue) => {
                self.phase = if self.progress.round_complete() {
                    log::info!("{} complete", self.round);
                    Phase::RoundComplete
                } else {
                    Phase::GroupSelection
                };
            }
            (Phase::RoundComplete, IncomingMessage::AdvanceRound) => {
                self.advance_round(view)?;
            }
            (Phase::Feedback, IncomingMessage::SubmitFeedback { feedback, rating }) => {
                let entry = FeedbackEntry {
                    feedback: feedback.trim().to_owned(),
                    rating,
                };
                entry
                    .validate()
                    .map_err(|report| Error::InvalidFeedback(report.to_string()))?;
                log::info!("feedback received, rated {rating}");
                view.send_message(&UpdateMessage::FeedbackReceived(entry.clone()).into());
                self.feedback.push(entry);
            }
            (_, message) => {
                return Err(Error::NotAvailable(message_name(&message)).into());
            }
        }

        Ok(())
    }

    fn load_attendance<V: ProctorView>(&mut self, students: &[Student], view: &V) {
        self.attendance = students
            .iter()
            .map(|student| AttendanceEntry {
                participant: Participant::from_student(student),
                present: true,
            })
            .collect_vec();
        self.participants = self
            .attendance
            .iter()
            .map(|entry| (entry.participant.id, entry.participant.clone()))
            .collect();

        log::info!(
            "loaded {} students of {} for {}",
            self.attendance.len(),
            self.college_name,
            self.round
        );
        view.send_message(&UpdateMessage::Attendance(self.attendance.clone()).into());
    }

    fn find_present(&self, id: Id) -> Result<Participant, grouping::Error> {
        self.attendance
            .iter()
            .find(|entry| entry.present && entry.participant.id == id)
            .map(|entry| entry.participant.clone())
            .ok_or(grouping::Error::UnknownParticipant)
    }

    fn form_groups(&mut self) -> Result<(), crate::Error> {
        self.require_auth()?;

        let present = self.present();
        if present.is_empty() {
            return Err(Error::NoParticipants.into());
        }

        if self.round.auto_grouped() {
            let groups = grouping::partition(&present, self.round, &mut self.rng)?;
            self.begin_round(groups)
        } else {
            self.formation.begin();
            self.phase = Phase::Formation;
            Ok(())
        }
    }

    fn begin_round(&mut self, groups: Vec<Group>) -> Result<(), crate::Error> {
        self.progress
            .begin_round(&self.college_name, self.round, groups)?;
        self.phase = Phase::GroupSelection;
        Ok(())
    }

    fn select_group<V: ProctorView>(
        &mut self,
        group_number: usize,
        view: &V,
    ) -> Result<(), crate::Error> {
        self.require_auth()?;

        if !self
            .progress
            .remaining_groups()
            .iter()
            .any(|g| g.group_number == group_number)
        {
            return Err(progress::Error::GroupNotFound(group_number).into());
        }

        let set = self
            .questions
            .question_set(self.round, group_number)
            .filter(|set| !set.questions.is_empty())
            .ok_or(Error::NoQuestions(group_number))?;

        let group = self.progress.consume_next_group(group_number)?;

        view.send_message(
            &UpdateMessage::GroupSelected {
                group: group.clone(),
                question_count: set.questions.len(),
                stage_id: set.stage_id,
            }
            .into(),
        );

        let total_participants = self.total_participants();
        self.phase = Phase::Exam(Box::new(Exam::new(
            self.round,
            group,
            set.questions,
            self.options.question_timer(self.round),
            total_participants,
        )));

        Ok(())
    }

    fn exam_message<V: ProctorView, F: FnMut(AlarmMessage, web_time::Duration)>(
        &mut self,
        message: IncomingMessage,
        schedule_message: &mut F,
        view: &V,
    ) -> Result<(), crate::Error> {
        let Phase::Exam(exam) = &mut self.phase else {
            return Err(Error::NotAvailable("exam").into());
        };
        let leaderboard = &mut self.leaderboards[self.round];

        let events = match message {
            IncomingMessage::StartExam => exam.start(self.auth.as_ref()),
            IncomingMessage::StartTimer => exam.start_timer(schedule_message),
            IncomingMessage::PauseTimer => exam.pause_timer(),
            IncomingMessage::ResumeTimer => exam.resume_timer(schedule_message),
            IncomingMessage::Answer(option_index) => exam.answer(option_index),
            IncomingMessage::Reveal => exam.reveal(),
            IncomingMessage::Mark {
                participant,
                status,
            } => exam.mark(participant, status),
            IncomingMessage::ToggleMark {
                participant,
                status,
            } => exam.toggle_mark(participant, status),
            IncomingMessage::Next => exam.next(leaderboard),
            IncomingMessage::FinishEarly => exam.finish_early(leaderboard),
            message => return Err(Error::NotAvailable(message_name(&message)).into()),
        }?;

        let ended = exam.phase() == ExamPhase::Ended;
        let group_number = exam.group().group_number;

        for event in events {
            view.send_message(&event.into());
        }

        if ended {
            self.phase = Phase::GroupResults(group_number);
        }

        Ok(())
    }

    fn advance_round<V: ProctorView>(&mut self, view: &V) -> Result<(), crate::Error> {
        match self.progress.advancement() {
            Advancement::NextRound(round) => {
                self.progress.clear()?;
                self.round = round;
                self.attendance.clear();
                self.formation = GroupFormation::default();
                self.phase = Phase::Attendance;
                log::info!("advancing to {round}");
                view.send_message(
                    &UpdateMessage::RoundStarted {
                        round,
                        label: round.label(),
                    }
                    .into(),
                );
                Ok(())
            }
            Advancement::Feedback => {
                self.phase = Phase::Feedback;
                log::info!("competition finished for {}", self.college_name);
                Ok(())
            }
            Advancement::Pending => Err(Error::NotAvailable("AdvanceRound").into()),
        }
    }

    /// Handles a scheduled alarm
    ///
    /// Alarms for an exam that is no longer on screen are dropped.
    pub fn receive_alarm<V: ProctorView, F: FnMut(AlarmMessage, web_time::Duration)>(
        &mut self,
        message: AlarmMessage,
        mut schedule_message: F,
        view: &V,
    ) {
        match message {
            AlarmMessage::Exam(alarm) => {
                if let Phase::Exam(exam) = &mut self.phase {
                    for event in exam.receive_alarm(alarm, &mut schedule_message) {
                        view.send_message(&event.into());
                    }
                }
            }
        }
    }

    /// The full state of the current screen, for a view that just connected
    pub fn state_message(&self) -> crate::SyncMessage {
        let message = match &self.phase {
            Phase::Attendance => SyncMessage::Attendance {
                round: self.round,
                college_name: self.college_name.clone(),
                description: grouping::format_description(self.round, self.present().len()),
                entries: self.attendance.clone(),
            },
            Phase::Formation => SyncMessage::Formation {
                round: self.round,
                available: self
                    .present()
                    .into_iter()
                    .filter(|p| self.formation.group_of(p.id).is_none())
                    .collect_vec(),
                groups: self.formation.groups().to_vec(),
                pending: self.formation.pending().to_vec(),
            },
            Phase::GroupSelection => {
                let progress = self.progress.progress();
                let total = self.total_participants();
                SyncMessage::GroupSelection {
                    round: self.round,
                    groups: self.progress.all_groups().to_vec(),
                    remaining: self
                        .progress
                        .remaining_groups()
                        .iter()
                        .map(|g| g.group_number)
                        .collect_vec(),
                    scoring_system: progress.scoring_system.clone().unwrap_or_else(|| {
                        scoring::scoring_system(self.round, total).to_owned()
                    }),
                    scaling_info: progress
                        .scaling_info
                        .clone()
                        .unwrap_or_else(|| scoring::scaling_info(self.round, total).to_owned()),
                }
            }
            Phase::Exam(exam) => SyncMessage::Exam {
                round: self.round,
                group: exam.group().clone(),
                index: exam.index(),
                count: exam.question_count(),
                question: exam.question().cloned(),
                phase: exam.phase(),
                timer: exam.timer().state(),
                remaining: exam.timer().remaining(),
                marks: exam
                    .group()
                    .members
                    .iter()
                    .map(|p| (p.id, exam.marks().get(&p.id).copied().unwrap_or_default()))
                    .collect_vec(),
                selected: exam.selected(),
            },
            Phase::GroupResults(group_number) => SyncMessage::GroupResults {
                group_number: *group_number,
                standings: self.leaderboards[self.round]
                    .group_standings(*group_number)
                    .into_iter()
                    .map(|(id, points)| (self.name_of(id), points))
                    .collect_vec(),
            },
            Phase::RoundComplete => SyncMessage::RoundComplete {
                round: self.round,
                advancement: self.progress.advancement(),
                leaderboard: self.leaderboard_message(),
            },
            Phase::Feedback => SyncMessage::Feedback {
                leaderboard: self.leaderboard_message(),
                submitted: self.feedback.clone(),
            },
        };
        message.into()
    }
}

fn message_name(message: &IncomingMessage) -> &'static str {
    match message {
        IncomingMessage::LoadRoster => "LoadRoster",
        IncomingMessage::RefreshRoster => "RefreshRoster",
        IncomingMessage::SetPresent { .. } => "SetPresent",
        IncomingMessage::FormGroups => "FormGroups",
        IncomingMessage::AddMember(_) => "AddMember",
        IncomingMessage::RemoveMember(_) => "RemoveMember",
        IncomingMessage::ToggleMember(_) => "ToggleMember",
        IncomingMessage::CommitGroup => "CommitGroup",
        IncomingMessage::CancelFormation => "CancelFormation",
        IncomingMessage::FinishFormation => "FinishFormation",
        IncomingMessage::RedoAttendance => "RedoAttendance",
        IncomingMessage::SelectGroup(_) => "SelectGroup",
        IncomingMessage::StartExam => "StartExam",
        IncomingMessage::StartTimer => "StartTimer",
        IncomingMessage::PauseTimer => "PauseTimer",
        IncomingMessage::ResumeTimer => "ResumeTimer",
        IncomingMessage::Answer(_) => "Answer",
        IncomingMessage::Reveal => "Reveal",
        IncomingMessage::Mark { .. } => "Mark",
        IncomingMessage::ToggleMark { .. } => "ToggleMark",
        IncomingMessage::Next => "Next",
        IncomingMessage::FinishEarly => "FinishEarly",
        IncomingMessage::Continue => "Continue",
        IncomingMessage::AdvanceRound => "AdvanceRound",
        IncomingMessage::SubmitFeedback { .. } => "SubmitFeedback",
    }
}
