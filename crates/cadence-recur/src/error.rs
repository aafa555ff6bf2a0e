use cadence_core::types::SeriesId;
use chrono::NaiveDate;
use thiserror::Error;

/// Recurrence engine errors. All of them are local to a single series.
#[derive(Error, Debug)]
pub enum RecurError {
    /// A rule was rejected at construction; nothing was mutated.
    #[error("Invalid rule: {field} {reason}")]
    InvalidRuleError { field: &'static str, reason: String },

    /// The cursor was asked to record an index other than the next one.
    #[error("Out of order materialization: expected index {expected}, got {got}")]
    OutOfOrderMaterializationError { expected: u64, got: u64 },

    /// The cursor was asked to record a date not after the last recorded one.
    #[error("Non-monotonic occurrence date: {got} is not after {last}")]
    NonMonotonicDateError { last: NaiveDate, got: NaiveDate },

    /// A replacement rule disagrees with already materialized history.
    #[error(
        "Retroactive edit: occurrence {index} was materialized on {recorded}, new rule gives {}",
        .proposed.map_or_else(|| "no occurrence".to_string(), |date| date.to_string())
    )]
    RetroactiveEditError {
        index: u64,
        recorded: NaiveDate,
        proposed: Option<NaiveDate>,
    },

    /// The state passed in belongs to a different series than the call.
    #[error("Series mismatch: state belongs to {state}, call was for {requested}")]
    SeriesMismatch {
        state: SeriesId,
        requested: SeriesId,
    },

    /// No series with this id is registered.
    #[error("Unknown series: {0}")]
    UnknownSeries(SeriesId),

    /// The name is not a known IANA timezone.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A frequency unit or other textual value could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(transparent)]
    CoreError(#[from] cadence_core::error::CoreError),
}

pub type RecurResult<T> = std::result::Result<T, RecurError>;
