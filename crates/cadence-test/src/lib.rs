//! Integration test support for the cadence workspace.
//!
//! Re-exports the workspace crates under one path and provides the
//! fixtures the integration tests share.

pub use cadence_core as core;
pub use cadence_recur as recur;

use cadence_core::config::LoggingConfig;
use cadence_recur::{EndCondition, FrequencyUnit, RecurrenceRule};
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

/// Shorthand for building a calendar date in tests.
///
/// ## Panics
/// Panics if the date does not exist.
#[must_use]
#[expect(clippy::unwrap_used, reason = "test fixture with literal dates")]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// ## Summary
/// Builds a rule from the shapes a todo form submits: a unit name, an
/// interval, an anchor, and at most one of a count or an end date.
///
/// ## Errors
/// Returns an error if the unit is unknown or the rule is invalid.
pub fn rule_from_form(
    unit: &str,
    interval: u32,
    anchor: NaiveDate,
    count: Option<u64>,
    until: Option<NaiveDate>,
) -> anyhow::Result<RecurrenceRule> {
    let unit: FrequencyUnit = unit.parse()?;
    let end = match (count, until) {
        (Some(count), None) => EndCondition::AfterCount { count },
        (None, Some(until)) => EndCondition::UntilDate { until },
        (None, None) => EndCondition::Forever,
        (Some(_), Some(_)) => anyhow::bail!("a rule ends after a count or on a date, not both"),
    };
    Ok(RecurrenceRule::new(unit, interval, anchor, end)?)
}

/// ## Summary
/// Builds the log filter for the configured level.
///
/// ## Errors
/// Returns an error if `logging.level` is not a valid filter directive.
pub fn log_filter(logging: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(logging.level.as_str())
        .map_err(|e| anyhow::anyhow!("invalid log level {:?}: {e}", logging.level))
}
