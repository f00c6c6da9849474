//! Deployment options
//!
//! Options tune the competition without changing its rules: countdown
//! lengths and notices, how long rosters stay cached, and how many
//! leaderboard rows the proctor view receives. Every field has a default,
//! so an empty JSON object is a valid configuration.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    constants::{
        cache::ROSTER_TTL_SECONDS,
        display::LEADERBOARD_LIMIT,
        timer::{CRITICAL_SECONDS, MAX_BUDGET_SECONDS, MIN_BUDGET_SECONDS, WARNING_SECONDS},
    },
    exam::timer::QuestionTimer,
    round::Round,
};

/// Errors raised while loading options
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// The JSON could not be parsed
    #[error("options are not valid JSON: {0}")]
    Parse(String),
    /// A field is out of bounds
    #[error("invalid options: {0}")]
    Invalid(String),
    /// The critical notice would come before the warning
    #[error("critical notice must come after the warning notice")]
    Thresholds,
}

impl From<garde::Report> for Error {
    fn from(report: garde::Report) -> Self {
        Self::Invalid(report.to_string())
    }
}

type ValidationResult = garde::Result;

fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    field: &'static str,
    val: &Duration,
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "{field} is outside of the bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Validates an optional per-question budget override
fn validate_budget(val: &Option<Duration>) -> ValidationResult {
    val.as_ref().map_or(Ok(()), |budget| {
        validate_duration::<MIN_BUDGET_SECONDS, MAX_BUDGET_SECONDS>("time budget", budget)
    })
}

/// Validates a remaining-time notice threshold
fn validate_threshold(val: &Duration) -> ValidationResult {
    validate_duration::<1, MAX_BUDGET_SECONDS>("notice threshold", val)
}

/// Per-round budget overrides; rounds left empty use their standard budget
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeBudgets {
    /// Round 1
    #[garde(custom(|v, _| validate_budget(v)))]
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    pub top16: Option<Duration>,
    /// Round 2
    #[garde(custom(|v, _| validate_budget(v)))]
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    pub quarterfinal: Option<Duration>,
    /// Round 3
    #[garde(custom(|v, _| validate_budget(v)))]
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    pub semifinal: Option<Duration>,
    /// Round 4
    #[garde(custom(|v, _| validate_budget(v)))]
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    #[serde(rename = "final")]
    pub final_round: Option<Duration>,
}

impl TimeBudgets {
    fn get(&self, round: Round) -> Option<Duration> {
        match round {
            Round::Top16 => self.top16,
            Round::Quarterfinal => self.quarterfinal,
            Round::Semifinal => self.semifinal,
            Round::Final => self.final_round,
        }
    }

    fn slot(&mut self, round: Round) -> &mut Option<Duration> {
        match round {
            Round::Top16 => &mut self.top16,
            Round::Quarterfinal => &mut self.quarterfinal,
            Round::Semifinal => &mut self.semifinal,
            Round::Final => &mut self.final_round,
        }
    }
}

/// Tunable settings for a competition
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Per-round countdown overrides
    #[garde(dive)]
    time_budgets: TimeBudgets,
    /// Remaining time at which the first warning is raised
    #[garde(custom(|v, _| validate_threshold(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    warning_at: Duration,
    /// Remaining time at which the critical warning is raised
    #[garde(custom(|v, _| validate_threshold(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    critical_at: Duration,
    /// How long a fetched roster is reused
    #[garde(skip)]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    roster_cache_ttl: Duration,
    /// Number of leaderboard rows sent to the proctor view
    #[garde(range(min = 1))]
    leaderboard_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            time_budgets: TimeBudgets::default(),
            warning_at: Duration::from_secs(WARNING_SECONDS),
            critical_at: Duration::from_secs(CRITICAL_SECONDS),
            roster_cache_ttl: Duration::from_secs(ROSTER_TTL_SECONDS),
            leaderboard_limit: LEADERBOARD_LIMIT,
        }
    }
}

impl Options {
    /// Parses and validates options from JSON
    ///
    /// # Errors
    ///
    /// * [`Error::Parse`] for malformed JSON
    /// * [`Error::Invalid`] for out-of-bounds values
    /// * [`Error::Thresholds`] if the critical notice is not below the warning
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let options: Self = serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))?;
        options.check()?;
        Ok(options)
    }

    /// Validates every field and the relation between the notices
    ///
    /// # Errors
    ///
    /// Same as [`Options::from_json`], minus parsing.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        if self.critical_at >= self.warning_at {
            return Err(Error::Thresholds);
        }
        Ok(())
    }

    /// Returns a copy with `round`'s budget replaced
    #[must_use]
    pub fn with_time_budget(mut self, round: Round, budget: Duration) -> Self {
        *self.time_budgets.slot(round) = Some(budget);
        self
    }

    /// Per-question budget for a round
    pub fn time_budget(&self, round: Round) -> Duration {
        self.time_budgets
            .get(round)
            .unwrap_or_else(|| round.time_budget())
    }

    /// A fresh countdown for `round`
    pub fn question_timer(&self, round: Round) -> QuestionTimer {
        QuestionTimer::new(self.time_budget(round), self.warning_at, self.critical_at)
    }

    /// Lifetime of a cached roster
    pub fn roster_cache_ttl(&self) -> Duration {
        self.roster_cache_ttl
    }

    /// Leaderboard rows sent to the proctor view
    pub fn leaderboard_limit(&self) -> usize {
        self.leaderboard_limit
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::from_json("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.time_budget(Round::Top16), Duration::from_secs(180));
        assert_eq!(options.time_budget(Round::Final), Duration::from_secs(300));
        assert_eq!(options.roster_cache_ttl(), Duration::from_secs(1800));
        assert_eq!(options.leaderboard_limit(), 50);
    }

    #[test]
    fn test_override_budget() {
        let options =
            Options::from_json(r#"{"timeBudgets":{"semifinal":5000,"final":60000}}"#).unwrap();
        assert_eq!(options.time_budget(Round::Semifinal), Duration::from_secs(5));
        assert_eq!(options.time_budget(Round::Final), Duration::from_secs(60));
        assert_eq!(
            options.time_budget(Round::Quarterfinal),
            Duration::from_secs(180)
        );

        let timer = options.question_timer(Round::Semifinal);
        assert_eq!(timer.budget(), Duration::from_secs(5));

        let builder = Options::default().with_time_budget(Round::Top16, Duration::from_secs(5));
        assert_eq!(builder.time_budget(Round::Top16), Duration::from_secs(5));
        assert!(builder.check().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Options::from_json(r#"{"timeBudgets":{"top16":1000}}"#),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Options::from_json(r#"{"leaderboardLimit":0}"#),
            Err(Error::Invalid(_))
        ));
        assert_eq!(
            Options::from_json(r#"{"warningAt":3000,"criticalAt":3000}"#),
            Err(Error::Thresholds)
        );
        assert!(matches!(
            Options::from_json("not json"),
            Err(Error::Parse(_))
        ));
    }
}
