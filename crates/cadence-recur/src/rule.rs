//! The immutable description of how often a series repeats and when it ends.

use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::{RecurError, RecurResult};
use crate::sequence::{self, Occurrences};

/// Calendar unit a rule advances by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyUnit {
    Day,
    Week,
    Month,
    Year,
}

impl FrequencyUnit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl std::fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrequencyUnit {
    type Err = RecurError;

    fn from_str(s: &str) -> RecurResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            other => Err(RecurError::ParseError(format!(
                "unknown frequency unit: {other:?}"
            ))),
        }
    }
}

/// When a series stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndCondition {
    Forever,
    /// The series has exactly `count` occurrences.
    AfterCount { count: u64 },
    /// The series ends on `until`, inclusive.
    UntilDate { until: NaiveDate },
}

/// ## Summary
/// Immutable recurrence rule.
///
/// Created once when a series is created and replaced, never mutated, when
/// the user edits it. Construction validates every invariant, so any value
/// of this type is well formed (including deserialized ones).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct RecurrenceRule {
    frequency_unit: FrequencyUnit,
    interval: u32,
    anchor_date: NaiveDate,
    end_condition: EndCondition,
}

#[derive(Deserialize)]
struct RawRule {
    frequency_unit: FrequencyUnit,
    interval: u32,
    anchor_date: NaiveDate,
    end_condition: EndCondition,
}

impl TryFrom<RawRule> for RecurrenceRule {
    type Error = RecurError;

    fn try_from(raw: RawRule) -> RecurResult<Self> {
        Self::new(
            raw.frequency_unit,
            raw.interval,
            raw.anchor_date,
            raw.end_condition,
        )
    }
}

impl RecurrenceRule {
    /// ## Summary
    /// Builds a rule after checking its invariants.
    ///
    /// ## Errors
    /// Returns `RecurError::InvalidRuleError` naming the offending field when
    /// `interval` is zero, an `AfterCount` is zero, or an `UntilDate` is
    /// before the anchor date.
    pub fn new(
        frequency_unit: FrequencyUnit,
        interval: u32,
        anchor_date: NaiveDate,
        end_condition: EndCondition,
    ) -> RecurResult<Self> {
        if interval < 1 {
            return Err(RecurError::InvalidRuleError {
                field: "interval",
                reason: "must be at least 1".to_string(),
            });
        }

        match end_condition {
            EndCondition::Forever => {}
            EndCondition::AfterCount { count } => {
                if count < 1 {
                    return Err(RecurError::InvalidRuleError {
                        field: "end_condition.count",
                        reason: "must be at least 1".to_string(),
                    });
                }
            }
            EndCondition::UntilDate { until } => {
                if until < anchor_date {
                    return Err(RecurError::InvalidRuleError {
                        field: "end_condition.until",
                        reason: format!("{until} is before anchor date {anchor_date}"),
                    });
                }
            }
        }

        Ok(Self {
            frequency_unit,
            interval,
            anchor_date,
            end_condition,
        })
    }

    /// Daily rule repeating every `interval` days.
    ///
    /// ## Errors
    /// See [`RecurrenceRule::new`].
    pub fn daily(interval: u32, anchor_date: NaiveDate, end: EndCondition) -> RecurResult<Self> {
        Self::new(FrequencyUnit::Day, interval, anchor_date, end)
    }

    /// Weekly rule repeating every `interval` weeks.
    ///
    /// ## Errors
    /// See [`RecurrenceRule::new`].
    pub fn weekly(interval: u32, anchor_date: NaiveDate, end: EndCondition) -> RecurResult<Self> {
        Self::new(FrequencyUnit::Week, interval, anchor_date, end)
    }

    /// Monthly rule repeating every `interval` months.
    ///
    /// ## Errors
    /// See [`RecurrenceRule::new`].
    pub fn monthly(interval: u32, anchor_date: NaiveDate, end: EndCondition) -> RecurResult<Self> {
        Self::new(FrequencyUnit::Month, interval, anchor_date, end)
    }

    /// Yearly rule repeating every `interval` years.
    ///
    /// ## Errors
    /// See [`RecurrenceRule::new`].
    pub fn yearly(interval: u32, anchor_date: NaiveDate, end: EndCondition) -> RecurResult<Self> {
        Self::new(FrequencyUnit::Year, interval, anchor_date, end)
    }

    #[must_use]
    pub const fn frequency_unit(&self) -> FrequencyUnit {
        self.frequency_unit
    }

    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    #[must_use]
    pub const fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    #[must_use]
    pub const fn end_condition(&self) -> EndCondition {
        self.end_condition
    }

    /// True unless the end condition forbids occurrence `index` on `date`.
    #[must_use]
    pub fn is_within_bound(&self, index: u64, date: NaiveDate) -> bool {
        match self.end_condition {
            EndCondition::Forever => true,
            EndCondition::AfterCount { count } => index < count,
            EndCondition::UntilDate { until } => date <= until,
        }
    }

    /// ## Summary
    /// Date of occurrence `index`, ignoring the end condition.
    ///
    /// Month and year steps carry a clamped day forward: occurrence `k` is
    /// `k` successive `+interval` steps from the anchor, so an anchor of
    /// Jan 31 gives Feb 29 then Mar 29, not Mar 31. Day and week steps have
    /// no clamping and are computed in one jump.
    ///
    /// Returns `None` if the date is not representable.
    #[must_use]
    pub fn occurrence_at(&self, index: u64) -> Option<NaiveDate> {
        let interval = u64::from(self.interval);
        match self.frequency_unit {
            FrequencyUnit::Day => self
                .anchor_date
                .checked_add_days(Days::new(index.checked_mul(interval)?)),
            FrequencyUnit::Week => self
                .anchor_date
                .checked_add_days(Days::new(index.checked_mul(interval)?.checked_mul(7)?)),
            FrequencyUnit::Month | FrequencyUnit::Year => self.carried_occurrence_at(index),
        }
    }

    fn carried_occurrence_at(&self, index: u64) -> Option<NaiveDate> {
        let mut date = self.anchor_date;
        let mut remaining = index;
        // Every month has at least 28 days, so once the carried day is 28 or
        // less no later step can clamp it and the rest is a single jump.
        while remaining > 0 && date.day() > 28 {
            date = clock::add_units(date, self.frequency_unit, self.interval)?;
            remaining -= 1;
        }
        if remaining == 0 {
            return Some(date);
        }
        let steps = u32::try_from(remaining.checked_mul(u64::from(self.interval))?).ok()?;
        clock::add_units(date, self.frequency_unit, steps)
    }

    /// Lazy sequence of in-bound occurrences starting at `start_index`.
    #[must_use]
    pub fn occurrences_from(&self, start_index: u64) -> Occurrences<'_> {
        sequence::occurrences_from(self, start_index)
    }

    /// Total number of occurrences, if the series is finite by count.
    #[must_use]
    pub const fn total_count(&self) -> Option<u64> {
        match self.end_condition {
            EndCondition::AfterCount { count } => Some(count),
            EndCondition::Forever | EndCondition::UntilDate { .. } => None,
        }
    }

    /// Returns a copy of this rule with a different end condition.
    ///
    /// ## Errors
    /// See [`RecurrenceRule::new`].
    pub fn with_end_condition(&self, end_condition: EndCondition) -> RecurResult<Self> {
        Self::new(
            self.frequency_unit,
            self.interval,
            self.anchor_date,
            end_condition,
        )
    }
}
