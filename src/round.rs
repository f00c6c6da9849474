//! Competition rounds
//!
//! The competition runs through four fixed rounds. Each round carries a
//! display label, the stage name its questions are stored under, a
//! per-question time budget, and the scoring table applied to it.

use std::{fmt::Display, str::FromStr, time::Duration};

use enum_map::Enum;
use heck::ToTitleCase;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::timer;

/// One of the four competition rounds
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    /// Round 1, groups formed automatically from attendance
    #[default]
    Top16,
    /// Round 2
    Quarterfinal,
    /// Round 3
    Semifinal,
    /// Round 4
    Final,
}

/// Which scoring table a round uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringVariant {
    /// Count-dependent table with zero-sum renormalization for groups of 3
    Round1Table,
    /// `correct → 1`, anything else → 0
    Binary,
}

/// Error returned when a round number is outside 1..=4
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[error("round number {0} is not between 1 and 4")]
pub struct InvalidRound(pub u8);

impl Round {
    /// All rounds in competition order
    pub const ALL: [Round; 4] = [
        Round::Top16,
        Round::Quarterfinal,
        Round::Semifinal,
        Round::Final,
    ];

    /// The 1-based round number
    pub fn number(self) -> u8 {
        match self {
            Self::Top16 => 1,
            Self::Quarterfinal => 2,
            Self::Semifinal => 3,
            Self::Final => 4,
        }
    }

    /// Name of the stage holding this round's questions
    pub fn stage_name(self) -> &'static str {
        match self {
            Self::Top16 => "top 16",
            Self::Quarterfinal => "quarterfinal",
            Self::Semifinal => "semifinal",
            Self::Final => "final",
        }
    }

    /// Human-readable label shown to the proctor
    pub fn label(self) -> String {
        self.stage_name().to_title_case()
    }

    /// Production time budget for a single question
    pub fn time_budget(self) -> Duration {
        Duration::from_secs(match self {
            Self::Top16 | Self::Quarterfinal => timer::EARLY_ROUND_SECONDS,
            Self::Semifinal => timer::SEMIFINAL_SECONDS,
            Self::Final => timer::FINAL_SECONDS,
        })
    }

    /// Scoring table applied to this round
    pub fn scoring_variant(self) -> ScoringVariant {
        match self {
            Self::Top16 => ScoringVariant::Round1Table,
            _ => ScoringVariant::Binary,
        }
    }

    /// Whether groups in this round are formed by the partitioner
    pub fn auto_grouped(self) -> bool {
        matches!(self, Self::Top16)
    }

    /// The following round, or `None` after the final
    pub fn next(self) -> Option<Round> {
        match self {
            Self::Top16 => Some(Self::Quarterfinal),
            Self::Quarterfinal => Some(Self::Semifinal),
            Self::Semifinal => Some(Self::Final),
            Self::Final => None,
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> Self {
        round.number()
    }
}

impl TryFrom<u8> for Round {
    type Error = InvalidRound;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Top16),
            2 => Ok(Self::Quarterfinal),
            3 => Ok(Self::Semifinal),
            4 => Ok(Self::Final),
            other => Err(InvalidRound(other)),
        }
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Round {} ({})", self.number(), self.label())
    }
}

impl FromStr for Round {
    type Err = InvalidRound;

    /// Parses a round from its number, e.g. `"3"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| InvalidRound(0))
            .and_then(Round::try_from)
    }
}
