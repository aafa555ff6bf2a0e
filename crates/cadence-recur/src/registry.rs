//! # Series Registry
//!
//! In-memory store of recurring series backed by `DashMap`.
//!
//! Every operation on a series runs under that series' own mutex for its
//! whole duration, so concurrent calls for the same series are serialized
//! while different series proceed in parallel. The map's shard lock is only
//! held long enough to clone the series handle.

use std::sync::Arc;

use cadence_core::types::SeriesId;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::clock::SeriesTimezone;
use crate::engine::{OccurrenceInstance, RecurrenceEngine, SeriesStatus};
use crate::error::{RecurError, RecurResult};
use crate::rule::RecurrenceRule;
use crate::state::SeriesState;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Everything the engine needs for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub rule: RecurrenceRule,
    pub state: SeriesState,
    pub timezone: SeriesTimezone,
}

impl Series {
    /// A new series with a fresh id and an empty cursor.
    #[must_use]
    pub fn new(rule: RecurrenceRule, timezone: SeriesTimezone) -> Self {
        Self::with_id(SeriesId::new(), rule, timezone)
    }

    #[must_use]
    pub const fn with_id(id: SeriesId, rule: RecurrenceRule, timezone: SeriesTimezone) -> Self {
        Self {
            rule,
            state: SeriesState::new(id),
            timezone,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SeriesId {
        self.state.series_id()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct SeriesRegistry {
    engine: RecurrenceEngine,
    series: DashMap<SeriesId, Arc<Mutex<Series>>>,
}

impl SeriesRegistry {
    #[must_use]
    pub fn new(engine: RecurrenceEngine) -> Self {
        Self {
            engine,
            series: DashMap::new(),
        }
    }

    #[must_use]
    pub const fn engine(&self) -> &RecurrenceEngine {
        &self.engine
    }

    /// Insert a series (used for creation and for hydration from storage).
    /// Replaces any series already stored under the same id.
    pub fn insert(&self, series: Series) -> SeriesId {
        let id = series.id();
        self.series.insert(id, Arc::new(Mutex::new(series)));
        tracing::debug!(series_id = %id, "Series registered");
        id
    }

    /// Snapshot of a series.
    #[must_use]
    pub fn get(&self, id: SeriesId) -> Option<Series> {
        let handle = self.handle(id).ok()?;
        let snapshot = handle.lock().clone();
        Some(snapshot)
    }

    pub fn remove(&self, id: SeriesId) -> Option<Series> {
        let (_, handle) = self.series.remove(&id)?;
        let snapshot = handle.lock().clone();
        tracing::debug!(series_id = %id, "Series removed");
        Some(snapshot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    fn handle(&self, id: SeriesId) -> RecurResult<Arc<Mutex<Series>>> {
        self.series
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(RecurError::UnknownSeries(id))
    }

    /// ## Summary
    /// Materializes the series up to `horizon` under its lock.
    ///
    /// ## Errors
    /// `UnknownSeries` if the id is not registered, otherwise see
    /// [`RecurrenceEngine::ensure_materialized_up_to`]. A failed call leaves
    /// the stored cursor untouched.
    pub fn materialize(
        &self,
        id: SeriesId,
        horizon: NaiveDate,
    ) -> RecurResult<Vec<OccurrenceInstance>> {
        let handle = self.handle(id)?;
        let mut guard = handle.lock();
        let series = &mut *guard;
        self.engine
            .ensure_materialized_up_to(id, &series.rule, &mut series.state, horizon)
    }

    /// ## Summary
    /// Materializes the series up to the calendar date of `now` in the
    /// series' own timezone.
    ///
    /// ## Errors
    /// See [`SeriesRegistry::materialize`].
    pub fn materialize_now(
        &self,
        id: SeriesId,
        now: DateTime<Utc>,
    ) -> RecurResult<Vec<OccurrenceInstance>> {
        let handle = self.handle(id)?;
        let mut guard = handle.lock();
        let series = &mut *guard;
        self.engine.ensure_materialized_through(
            id,
            &series.rule,
            &mut series.state,
            now,
            series.timezone,
        )
    }

    /// ## Summary
    /// Replaces the rule of a series going forward.
    ///
    /// ## Errors
    /// `UnknownSeries`, or `RetroactiveEditError` if the new rule contradicts
    /// materialized history; the old rule is kept in that case.
    pub fn replace_rule(&self, id: SeriesId, new_rule: RecurrenceRule) -> RecurResult<()> {
        let handle = self.handle(id)?;
        let mut guard = handle.lock();
        let accepted = self
            .engine
            .replace_rule(id, &guard.state, &guard.rule, new_rule)?;
        guard.rule = accepted;
        Ok(())
    }

    /// ## Summary
    /// Abandons a series. Idempotent.
    ///
    /// ## Errors
    /// `UnknownSeries` if the id is not registered.
    pub fn abandon(&self, id: SeriesId, at: DateTime<Utc>) -> RecurResult<()> {
        let handle = self.handle(id)?;
        let mut guard = handle.lock();
        self.engine.abandon(id, &mut guard.state, at)
    }

    /// ## Errors
    /// `UnknownSeries` if the id is not registered.
    pub fn status(&self, id: SeriesId) -> RecurResult<SeriesStatus> {
        let handle = self.handle(id)?;
        let guard = handle.lock();
        Ok(self.engine.status(&guard.rule, &guard.state))
    }
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::new(RecurrenceEngine::default())
    }
}

impl std::fmt::Debug for SeriesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesRegistry")
            .field("series_count", &self.series.len())
            .field("engine", &self.engine)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
