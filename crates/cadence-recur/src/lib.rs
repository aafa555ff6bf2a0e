//! Recurrence engine: turns declarative repeat rules into an ordered,
//! idempotent stream of materialized occurrences.
//!
//! The pieces, leaves first:
//! - [`clock`]: calendar arithmetic and timezone normalization.
//! - [`rule`]: the immutable [`RecurrenceRule`] value.
//! - [`sequence`]: lazy, restartable occurrence sequences.
//! - [`state`]: the per-series materialization cursor.
//! - [`engine`]: orchestration, idempotence and rule replacement.
//! - [`registry`]: an in-memory store that serializes work per series.

pub mod clock;
pub mod engine;
pub mod error;
pub mod registry;
pub mod rule;
pub mod sequence;
pub mod state;

pub use cadence_core::types::SeriesId;
pub use clock::SeriesTimezone;
pub use engine::{OccurrenceInstance, RecurrenceEngine, SeriesStatus};
pub use error::{RecurError, RecurResult};
pub use registry::{Series, SeriesRegistry};
pub use rule::{EndCondition, FrequencyUnit, RecurrenceRule};
pub use sequence::{Occurrence, Occurrences};
pub use state::SeriesState;
