//! Calendar arithmetic and timezone normalization.
//!
//! Occurrence dates are plain calendar dates (`NaiveDate`); a series'
//! timezone only matters when converting between dates and instants.

use std::cmp::Ordering;
use std::str::FromStr;

use cadence_core::config::EngineConfig;
use chrono::{DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{RecurError, RecurResult};
use crate::rule::FrequencyUnit;

/// Local midnight may be skipped by a DST transition; this is how far
/// forward (in hours) we look for the first instant that does exist.
const MAX_GAP_HOURS: i64 = 24;

/// ## Summary
/// Adds `interval` calendar units of kind `unit` to `date`.
///
/// Day-of-month overflow clamps to the last valid day of the target month,
/// so Jan 31 + 1 month is Feb 29 in a leap year and Feb 28 otherwise.
///
/// Returns `None` only if the result falls outside the representable range.
#[must_use]
pub fn add_units(date: NaiveDate, unit: FrequencyUnit, interval: u32) -> Option<NaiveDate> {
    match unit {
        FrequencyUnit::Day => date.checked_add_days(Days::new(u64::from(interval))),
        FrequencyUnit::Week => date.checked_add_days(Days::new(u64::from(interval) * 7)),
        FrequencyUnit::Month => add_months(date, interval),
        FrequencyUnit::Year => add_months(date, interval.checked_mul(12)?),
    }
}

/// Total order over normalized dates.
#[must_use]
pub fn compare(a: NaiveDate, b: NaiveDate) -> Ordering {
    a.cmp(&b)
}

/// Adds months to a date, clamping the day to the target month's length.
fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total_months = i64::from(date.month0()) + i64::from(months);
    let new_year = i64::from(date.year()) + total_months / 12;
    let new_year = i32::try_from(new_year).ok()?;
    let new_month = u32::try_from(total_months % 12).ok()? + 1;

    let max_day = days_in_month(new_year, new_month)?;
    NaiveDate::from_ymd_opt(new_year, new_month, date.day().min(max_day))
}

/// Returns the number of days in a month.
pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt().map(|last| last.day())
}

/// Fixed, already-resolved timezone of one series.
///
/// The engine never consults the process timezone; every conversion
/// between instants and calendar dates goes through one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeriesTimezone(Tz);

impl SeriesTimezone {
    pub const UTC: Self = Self(Tz::UTC);

    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// ## Summary
    /// Resolves an IANA timezone name (including `Etc/GMT±N` fixed offsets).
    ///
    /// ## Errors
    /// Returns `RecurError::UnknownTimezone` if the name is not a known zone.
    pub fn resolve(name: &str) -> RecurResult<Self> {
        Tz::from_str(name.trim())
            .map(Self)
            .map_err(|_err| RecurError::UnknownTimezone(name.to_string()))
    }

    /// ## Summary
    /// Resolves the configured default zone.
    ///
    /// ## Errors
    /// Returns `RecurError::UnknownTimezone` if the configured name is unknown.
    pub fn from_config(config: &EngineConfig) -> RecurResult<Self> {
        Self::resolve(&config.default_timezone)
    }

    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.0
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// ## Summary
    /// Returns the canonical instant of `date`'s local midnight.
    ///
    /// Ambiguous midnights (DST fold) resolve to the earlier instant. A
    /// midnight that does not exist (DST gap) resolves to the first whole
    /// local hour after it that does.
    #[must_use]
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        midnight_in(&self.0, self.name(), date)
    }

    /// Returns the calendar date `instant` falls on in this timezone.
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }
}

fn midnight_in<Z: TimeZone>(zone: &Z, zone_name: &str, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);

    let mut candidate = midnight;
    for _ in 0..=MAX_GAP_HOURS {
        match zone.from_local_datetime(&candidate) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                return dt.with_timezone(&Utc);
            }
            LocalResult::None => {
                candidate += TimeDelta::hours(1);
            }
        }
    }

    tracing::warn!(
        timezone = zone_name,
        %date,
        "No valid local time near midnight, falling back to UTC midnight"
    );
    naive_as_utc(midnight)
}

fn naive_as_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}

impl Default for SeriesTimezone {
    fn default() -> Self {
        Self::UTC
    }
}

impl TryFrom<String> for SeriesTimezone {
    type Error = RecurError;

    fn try_from(value: String) -> RecurResult<Self> {
        Self::resolve(&value)
    }
}

impl From<SeriesTimezone> for String {
    fn from(value: SeriesTimezone) -> Self {
        value.name().to_string()
    }
}

impl std::fmt::Display for SeriesTimezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
