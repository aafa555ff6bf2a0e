//! Lazy, restartable occurrence sequences.
//!
//! A sequence can be started from any index, not just resumed from a live
//! cursor: the date of an index is a pure function of the rule, so
//! recomputing from scratch after a rule edit or a reload is always safe.

use std::iter::FusedIterator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::rule::RecurrenceRule;

/// One scheduled date and its 0-based position in the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub index: u64,
    pub date: NaiveDate,
}

/// ## Summary
/// Iterator over the occurrences of a rule, in increasing index order.
///
/// Finite for `AfterCount` and `UntilDate` rules, infinite for `Forever`
/// ones; nothing is computed until the next element is requested. The
/// bound is checked before each element is yielded and the sequence ends
/// at the first candidate that fails it.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    next: Option<Occurrence>,
    bounded: bool,
}

/// ## Summary
/// Produces the in-bound occurrences of `rule` from `start_index` onwards.
///
/// The first candidate is `rule.anchor_date()` advanced by `start_index`
/// steps; each subsequent candidate is one `+interval` step further.
#[must_use]
pub fn occurrences_from(rule: &RecurrenceRule, start_index: u64) -> Occurrences<'_> {
    Occurrences::new(rule, start_index, true)
}

/// Same schedule as [`occurrences_from`] but ignoring the end condition.
///
/// Used when comparing a rule against history that may lie past a new
/// rule's bound.
pub(crate) fn schedule_from(rule: &RecurrenceRule, start_index: u64) -> Occurrences<'_> {
    Occurrences::new(rule, start_index, false)
}

impl<'a> Occurrences<'a> {
    fn new(rule: &'a RecurrenceRule, start_index: u64, bounded: bool) -> Self {
        let next = rule.occurrence_at(start_index).map(|date| Occurrence {
            index: start_index,
            date,
        });
        Self {
            rule,
            next,
            bounded,
        }
    }

    /// Looks at the next occurrence without advancing.
    #[must_use]
    pub fn peek(&self) -> Option<Occurrence> {
        self.next.filter(|candidate| {
            !self.bounded || self.rule.is_within_bound(candidate.index, candidate.date)
        })
    }

    fn step(&self, current: Occurrence) -> Option<Occurrence> {
        let date = clock::add_units(
            current.date,
            self.rule.frequency_unit(),
            self.rule.interval(),
        )?;
        Some(Occurrence {
            index: current.index.checked_add(1)?,
            date,
        })
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        let candidate = self.next.take()?;
        if self.bounded && !self.rule.is_within_bound(candidate.index, candidate.date) {
            return None;
        }
        self.next = self.step(candidate);
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(next) = self.next else {
            return (0, Some(0));
        };
        match (self.bounded, self.rule.total_count()) {
            (true, Some(count)) => {
                let left = usize::try_from(count.saturating_sub(next.index)).ok();
                (0, left)
            }
            _ => (0, None),
        }
    }
}

impl FusedIterator for Occurrences<'_> {}
