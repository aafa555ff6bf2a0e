//! Per-series materialization cursor.

use cadence_core::types::SeriesId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RecurError, RecurResult};

/// ## Summary
/// Where materialization of one series resumes.
///
/// Holds cursor fields only. Updates go through [`SeriesState::record_materialized`]
/// and [`SeriesState::mark_abandoned`], which keep the cursor consistent:
/// indices are recorded in order with no gaps, dates strictly increase, and
/// an abandonment timestamp is never cleared once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSeriesState")]
pub struct SeriesState {
    series_id: SeriesId,
    last_materialized_date: Option<NaiveDate>,
    materialized_count: u64,
    abandoned_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawSeriesState {
    series_id: SeriesId,
    last_materialized_date: Option<NaiveDate>,
    materialized_count: u64,
    abandoned_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawSeriesState> for SeriesState {
    type Error = RecurError;

    fn try_from(raw: RawSeriesState) -> RecurResult<Self> {
        Self::restore(
            raw.series_id,
            raw.last_materialized_date,
            raw.materialized_count,
            raw.abandoned_at,
        )
    }
}

impl SeriesState {
    /// Cursor for a series that has not materialized anything yet.
    #[must_use]
    pub const fn new(series_id: SeriesId) -> Self {
        Self {
            series_id,
            last_materialized_date: None,
            materialized_count: 0,
            abandoned_at: None,
        }
    }

    /// ## Summary
    /// Rebuilds a cursor from stored fields.
    ///
    /// ## Errors
    /// Returns `RecurError::CoreError` wrapping a validation error if a
    /// last date is present without any materialized occurrence, or the
    /// other way round.
    pub fn restore(
        series_id: SeriesId,
        last_materialized_date: Option<NaiveDate>,
        materialized_count: u64,
        abandoned_at: Option<DateTime<Utc>>,
    ) -> RecurResult<Self> {
        if last_materialized_date.is_some() != (materialized_count > 0) {
            return Err(cadence_core::error::CoreError::ValidationError(format!(
                "series {series_id}: materialized_count {materialized_count} does not match last_materialized_date {last_materialized_date:?}"
            ))
            .into());
        }
        Ok(Self {
            series_id,
            last_materialized_date,
            materialized_count,
            abandoned_at,
        })
    }

    #[must_use]
    pub const fn series_id(&self) -> SeriesId {
        self.series_id
    }

    #[must_use]
    pub const fn last_materialized_date(&self) -> Option<NaiveDate> {
        self.last_materialized_date
    }

    #[must_use]
    pub const fn materialized_count(&self) -> u64 {
        self.materialized_count
    }

    #[must_use]
    pub const fn abandoned_at(&self) -> Option<DateTime<Utc>> {
        self.abandoned_at
    }

    #[must_use]
    pub const fn is_abandoned(&self) -> bool {
        self.abandoned_at.is_some()
    }

    /// ## Summary
    /// Advances the cursor past occurrence `index` on `date`.
    ///
    /// ## Errors
    /// - `OutOfOrderMaterializationError` if `index` is not the current count.
    /// - `NonMonotonicDateError` if `date` is not after the last recorded date.
    ///
    /// The cursor is unchanged when an error is returned.
    pub fn record_materialized(&mut self, index: u64, date: NaiveDate) -> RecurResult<()> {
        if index != self.materialized_count {
            return Err(RecurError::OutOfOrderMaterializationError {
                expected: self.materialized_count,
                got: index,
            });
        }
        if let Some(last) = self.last_materialized_date
            && date <= last
        {
            return Err(RecurError::NonMonotonicDateError { last, got: date });
        }

        self.materialized_count += 1;
        self.last_materialized_date = Some(date);
        Ok(())
    }

    /// Sets the abandonment timestamp unless one is already set.
    ///
    /// Returns `true` if this call abandoned the series.
    pub fn mark_abandoned(&mut self, at: DateTime<Utc>) -> bool {
        if self.abandoned_at.is_some() {
            return false;
        }
        self.abandoned_at = Some(at);
        true
    }
}
