//! Absolute time windows during which the automatic energy management must stay off.

use chrono::{DateTime, Local, TimeDelta};
use itertools::Itertools;

use crate::core::{interval::Interval, schema::ChargingSchema};

/// How long before a period the EMS is switched off, and how long after it is switched back on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EmsBuffers {
    pub prep: TimeDelta,
    pub restore: TimeDelta,
}

impl Default for EmsBuffers {
    fn default() -> Self {
        Self { prep: TimeDelta::minutes(2), restore: TimeDelta::minutes(2) }
    }
}

impl EmsBuffers {
    /// Windows closer than this are merged into one.
    const MERGE_GAP: TimeDelta = TimeDelta::minutes(1);

    /// Derive the upcoming windows from the periods' nearest occurrences.
    ///
    /// Windows which have already ended are discarded, the ones which have already started
    /// are clamped to start right after `now`.
    #[must_use]
    pub fn derive_windows(self, schema: &ChargingSchema, now: DateTime<Local>) -> Vec<Interval> {
        let clamped_start = now + TimeDelta::seconds(1);
        schema
            .periods
            .iter()
            .filter_map(|period| period.next_occurrence(now - self.restore))
            .map(|occurrence| occurrence.expand(self.prep, self.restore))
            .filter(|window| window.end > now)
            .map(|window| {
                if window.start < now { window.with_start(clamped_start) } else { window }
            })
            .filter(|window| !window.is_empty())
            .sorted_by_key(|window| (window.start, window.end))
            .coalesce(|last, next| {
                if next.start - last.end <= Self::MERGE_GAP {
                    Ok(last.with_end(last.end.max(next.end)))
                } else {
                    Err((last, next))
                }
            })
            .collect()
    }
}
