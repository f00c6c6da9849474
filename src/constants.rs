//! Configuration constants for the competition engine
//!
//! This module contains the fixed limits and tables used throughout the
//! crate. Anything a deployment may want to tune lives in
//! [`crate::config::Options`] instead.

/// Group formation limits
pub mod grouping {
    /// At or below this many participants, round 1 is a single group and
    /// everyone qualifies
    pub const AUTO_QUALIFY_MAX: usize = 8;
    /// Smallest participant count covered by the fixed grouping table
    pub const TABLE_MIN: usize = 9;
    /// Largest participant count covered by the fixed grouping table
    pub const TABLE_MAX: usize = 16;
    /// `(groups_of_3, groups_of_4)` for 9..=16 participants
    pub const TABLE: [(usize, usize); TABLE_MAX - TABLE_MIN + 1] = [
        (3, 0),
        (2, 1),
        (1, 2),
        (0, 3),
        (3, 1),
        (2, 2),
        (1, 3),
        (0, 4),
    ];
    /// Maximum number of participants in a manually formed group
    pub const MAX_GROUP_SIZE: usize = 4;
}

/// Per-question timer constants
pub mod timer {
    /// Seconds per question in rounds 1 and 2
    pub const EARLY_ROUND_SECONDS: u64 = 180;
    /// Seconds per question in round 3
    pub const SEMIFINAL_SECONDS: u64 = 240;
    /// Seconds per question in round 4
    pub const FINAL_SECONDS: u64 = 300;
    /// Shortest configurable per-question budget
    pub const MIN_BUDGET_SECONDS: u64 = 5;
    /// Longest configurable per-question budget
    pub const MAX_BUDGET_SECONDS: u64 = 600;
    /// Default remaining-time threshold for the first warning notice
    pub const WARNING_SECONDS: u64 = 5;
    /// Default remaining-time threshold for the critical warning notice
    pub const CRITICAL_SECONDS: u64 = 3;
    /// Interval between countdown alarms
    pub const TICK_MILLIS: u64 = 1000;
}

/// Question set constants
pub mod stages {
    /// Stage id used when a group has no dedicated question set
    pub const FALLBACK_STAGE_ID: u32 = 1;
    /// Maximum number of questions in a single stage
    pub const MAX_QUESTION_COUNT: usize = 50;
    /// Maximum length of a LaTeX prompt or answer
    pub const MAX_LATEX_LENGTH: usize = 4000;
}

/// Durable state constants
pub mod persistence {
    /// Key the group-selection progress is stored under
    pub const PROGRESS_KEY: &str = "groupSelectionState";
    /// Current schema version of the progress envelope
    pub const PROGRESS_VERSION: u32 = 1;
}

/// Roster cache constants
pub mod cache {
    /// Default lifetime of a cached roster, in seconds
    pub const ROSTER_TTL_SECONDS: u64 = 30 * 60;
}

/// Display constants
pub mod display {
    /// Default number of leaderboard rows sent to the proctor view
    pub const LEADERBOARD_LIMIT: usize = 50;
    /// Total participant counts whose round-1 scores are reported as scaled to /15
    pub const SCALED_TO_15_COUNTS: [usize; 2] = [9, 15];
}
