//! Normalizes periods into a sorted, non-overlapping set.

use std::cmp::Reverse;

use crate::{core::period::ChargingPeriod, prelude::*};

/// Sweep the periods by start time, merging same-kind overlaps and pushing
/// other-kind overlaps past the preceding period.
///
/// On the same start time, the charge period goes first, so the discharge one yields.
#[must_use]
pub fn resolve(periods: impl IntoIterator<Item = ChargingPeriod>) -> Vec<ChargingPeriod> {
    // Latest first, so that the next period to sweep is popped off the end.
    let mut queue: Vec<ChargingPeriod> = periods.into_iter().collect();
    queue.sort_by_key(|period| Reverse((period.start, period.kind)));

    let mut resolved: Vec<ChargingPeriod> = Vec::with_capacity(queue.len());
    while let Some(mut period) = queue.pop() {
        if !period.is_valid() {
            warn!(%period, "dropping an empty period");
            continue;
        }
        let Some(last) = resolved.last_mut() else {
            resolved.push(period);
            continue;
        };
        if !last.overlaps(&period) {
            resolved.push(period);
        } else if last.kind == period.kind {
            debug!(%last, %period, "merging");
            last.end = last.end.max(period.end);
            last.power = last.power.max(period.power);
            last.weekdays |= period.weekdays;
        } else {
            period.start = last.end;
            if period.is_valid() {
                // The shifted period may now start after others still queued.
                debug!(%period, "shifted past the preceding period");
                let key = Reverse((period.start, period.kind));
                let index =
                    queue.partition_point(|queued| Reverse((queued.start, queued.kind)) < key);
                queue.insert(index, period);
            } else {
                info!(kind = %period.kind, "dropping a fully overlapped period");
            }
        }
    }
    resolved
}
