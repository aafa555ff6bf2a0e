use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Identity of a recurring series.
///
/// Occurrence instances reference their series by this id, and the
/// per-series cursor is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(Uuid);

impl SeriesId {
    /// Generates a time-ordered id for a newly created series.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// ## Summary
    /// Derives a stable id from an external key (for example a todo's
    /// primary key), so the same key always maps to the same series.
    #[must_use]
    pub fn from_external_key(namespace: &Uuid, key: &str) -> Self {
        Self(Uuid::new_v5(namespace, key.as_bytes()))
    }
}

impl Default for SeriesId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SeriesId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SeriesId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|err| CoreError::ParseError(format!("invalid series id {s:?}: {err}")))
    }
}
