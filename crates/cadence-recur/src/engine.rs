//! Materialization orchestration.
//!
//! The engine is synchronous and holds no per-series data. Callers pass the
//! rule and the cursor for one series and must serialize calls for the same
//! series (see [`crate::registry::SeriesRegistry`] for a ready-made store
//! that does).

use cadence_core::config::EngineConfig;
use cadence_core::constants::DEFAULT_MAX_BATCH;
use cadence_core::types::SeriesId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::SeriesTimezone;
use crate::error::{RecurError, RecurResult};
use crate::rule::RecurrenceRule;
use crate::sequence::{self, Occurrence};
use crate::state::SeriesState;

/// Lifecycle of a series as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    /// Not abandoned, and at least one more in-bound occurrence exists.
    Active,
    /// Not abandoned, but the end condition has been reached.
    Exhausted,
    /// Explicitly abandoned. Terminal, and takes priority over `Exhausted`.
    Abandoned,
}

/// A concrete instance for the persistence layer to store.
///
/// `(series_id, occurrence_date)` is unique: no two instances of a series
/// share a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccurrenceInstance {
    pub series_id: SeriesId,
    pub occurrence_date: NaiveDate,
    pub sequence_index: u64,
}

#[derive(Debug, Clone)]
pub struct RecurrenceEngine {
    max_batch: usize,
}

impl Default for RecurrenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn batch_limit(max_batch: u32) -> usize {
    usize::try_from(max_batch).unwrap_or(usize::MAX)
}

fn ensure_same_series(state: &SeriesState, requested: SeriesId) -> RecurResult<()> {
    if state.series_id() == requested {
        Ok(())
    } else {
        tracing::warn!(
            state_series = %state.series_id(),
            requested_series = %requested,
            "Series state does not belong to the requested series"
        );
        Err(RecurError::SeriesMismatch {
            state: state.series_id(),
            requested,
        })
    }
}

impl RecurrenceEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_batch: batch_limit(DEFAULT_MAX_BATCH),
        }
    }

    /// ## Summary
    /// Builds an engine from the `[engine]` configuration section.
    ///
    /// ## Errors
    /// Returns an error if the configuration fails validation.
    pub fn from_config(config: &EngineConfig) -> RecurResult<Self> {
        config.validate()?;
        Ok(Self {
            max_batch: batch_limit(config.max_batch),
        })
    }

    /// Caps how many instances one materialization call may emit.
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: u32) -> Self {
        self.max_batch = batch_limit(max_batch.max(1));
        self
    }

    #[must_use]
    pub const fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// ## Summary
    /// Ensures every in-bound occurrence dated on or before `horizon` has
    /// been materialized, returning the instances created by this call.
    ///
    /// Generation resumes at `state.materialized_count()`, so repeating a
    /// call with the same or an earlier horizon yields nothing new. Candidates
    /// are taken in index order until one lies past the horizon or outside
    /// the rule's bound; nothing after that point is considered. An
    /// abandoned series never yields anything.
    ///
    /// At most `max_batch` instances are produced per call; the next call
    /// continues from where this one stopped.
    ///
    /// `state` is updated only if the whole batch succeeds, so the returned
    /// instances and the new cursor can be committed together.
    ///
    /// ## Errors
    /// - `SeriesMismatch` if `state` belongs to another series.
    /// - `OutOfOrderMaterializationError` / `NonMonotonicDateError` if the
    ///   cursor is stale or does not match `rule`.
    #[tracing::instrument(level = "debug", skip(self, rule, state), fields(start_index = state.materialized_count()))]
    pub fn ensure_materialized_up_to(
        &self,
        series_id: SeriesId,
        rule: &RecurrenceRule,
        state: &mut SeriesState,
        horizon: NaiveDate,
    ) -> RecurResult<Vec<OccurrenceInstance>> {
        ensure_same_series(state, series_id)?;

        if state.is_abandoned() {
            tracing::debug!("Series is abandoned, nothing to materialize");
            return Ok(Vec::new());
        }

        let start_index = state.materialized_count();
        let mut working = state.clone();
        let mut instances = Vec::new();

        let mut due = sequence::occurrences_from(rule, start_index)
            .take_while(|candidate| candidate.date <= horizon)
            .peekable();

        for candidate in due.by_ref().take(self.max_batch) {
            if let Err(err) = working.record_materialized(candidate.index, candidate.date) {
                tracing::warn!(
                    index = candidate.index,
                    date = %candidate.date,
                    error = %err,
                    "Rejecting materialization against stale series state"
                );
                return Err(err);
            }
            tracing::trace!(index = candidate.index, date = %candidate.date, "Materialized occurrence");
            instances.push(OccurrenceInstance {
                series_id,
                occurrence_date: candidate.date,
                sequence_index: candidate.index,
            });
        }

        if due.peek().is_some() {
            tracing::debug!(
                max_batch = self.max_batch,
                "Materialization batch limit reached, remaining occurrences deferred"
            );
        }

        tracing::debug!(
            emitted = instances.len(),
            materialized_count = working.materialized_count(),
            "Materialization complete"
        );
        *state = working;
        Ok(instances)
    }

    /// ## Summary
    /// Like [`RecurrenceEngine::ensure_materialized_up_to`], with the horizon
    /// taken as the calendar date of `now` in the series timezone.
    ///
    /// ## Errors
    /// See [`RecurrenceEngine::ensure_materialized_up_to`].
    pub fn ensure_materialized_through(
        &self,
        series_id: SeriesId,
        rule: &RecurrenceRule,
        state: &mut SeriesState,
        now: DateTime<Utc>,
        timezone: SeriesTimezone,
    ) -> RecurResult<Vec<OccurrenceInstance>> {
        let horizon = timezone.local_date(now);
        self.ensure_materialized_up_to(series_id, rule, state, horizon)
    }

    /// ## Summary
    /// Validates a replacement rule against the already materialized history.
    ///
    /// History is immutable: for every index below the materialized count,
    /// `new_rule` must give the same date as the rule that produced it. The
    /// end condition may shrink below the materialized history; the series
    /// then reports `Exhausted` and nothing recorded is touched. The newest recorded date is
    /// taken from `state`; earlier ones are recomputed from `current`, which
    /// by induction agrees with every date accepted so far.
    ///
    /// On success the returned rule should be stored in place of `current`;
    /// later materialization continues from `state.materialized_count()`
    /// under it. Previously materialized instances are never touched.
    ///
    /// ## Errors
    /// - `SeriesMismatch` if `state` belongs to another series.
    /// - `RetroactiveEditError` naming the first index whose date would change.
    ///   `current` stays in effect.
    #[tracing::instrument(level = "debug", skip(self, state, current, new_rule))]
    pub fn replace_rule(
        &self,
        series_id: SeriesId,
        state: &SeriesState,
        current: &RecurrenceRule,
        new_rule: RecurrenceRule,
    ) -> RecurResult<RecurrenceRule> {
        ensure_same_series(state, series_id)?;

        let count = state.materialized_count();
        let recorded = sequence::schedule_from(current, 0).take_while(|o| o.index < count);
        let mut proposed = sequence::schedule_from(&new_rule, 0);

        for old in recorded {
            let recorded_date = if old.index + 1 == count {
                state.last_materialized_date().unwrap_or(old.date)
            } else {
                old.date
            };
            let new_date = proposed.next().map(|o| o.date);

            if new_date != Some(recorded_date) {
                tracing::info!(
                    index = old.index,
                    recorded = %recorded_date,
                    proposed = ?new_date,
                    "Rejected retroactive rule edit"
                );
                return Err(RecurError::RetroactiveEditError {
                    index: old.index,
                    recorded: recorded_date,
                    proposed: new_date,
                });
            }
        }

        tracing::info!(
            materialized_count = count,
            frequency = %new_rule.frequency_unit(),
            interval = new_rule.interval(),
            "Replaced recurrence rule"
        );
        Ok(new_rule)
    }

    /// ## Summary
    /// Permanently stops materialization for a series.
    ///
    /// Idempotent: abandoning an abandoned series keeps the first timestamp.
    ///
    /// ## Errors
    /// Returns `SeriesMismatch` if `state` belongs to another series.
    pub fn abandon(
        &self,
        series_id: SeriesId,
        state: &mut SeriesState,
        at: DateTime<Utc>,
    ) -> RecurResult<()> {
        ensure_same_series(state, series_id)?;

        if state.mark_abandoned(at) {
            tracing::info!(
                %series_id,
                abandoned_at = %at,
                materialized_count = state.materialized_count(),
                "Series abandoned"
            );
        } else {
            tracing::debug!(%series_id, "Series already abandoned");
        }
        Ok(())
    }

    /// Current lifecycle state of a series. Does not modify anything.
    #[must_use]
    pub fn status(&self, rule: &RecurrenceRule, state: &SeriesState) -> SeriesStatus {
        if state.is_abandoned() {
            SeriesStatus::Abandoned
        } else if sequence::occurrences_from(rule, state.materialized_count())
            .peek()
            .is_some()
        {
            SeriesStatus::Active
        } else {
            SeriesStatus::Exhausted
        }
    }

    /// Up to `limit` upcoming occurrences after the cursor, without
    /// recording anything. Empty for abandoned series.
    #[must_use]
    pub fn preview(
        &self,
        rule: &RecurrenceRule,
        state: &SeriesState,
        limit: usize,
    ) -> Vec<Occurrence> {
        if state.is_abandoned() {
            return Vec::new();
        }
        sequence::occurrences_from(rule, state.materialized_count())
            .take(limit)
            .collect()
    }

    /// The next occurrence that would be materialized, if any.
    #[must_use]
    pub fn next_occurrence(&self, rule: &RecurrenceRule, state: &SeriesState) -> Option<NaiveDate> {
        self.preview(rule, state, 1).first().map(|o| o.date)
    }
}
