//! Cutting the scheduled charge down to what the live state of charge still needs.

use chrono::{DateTime, Local, TimeDelta};
use itertools::Itertools;

use crate::{
    core::period::{ChargingPeriod, PeriodKind},
    prelude::*,
};

/// Periods which would be left shorter than this are dropped.
const MIN_REMAINING: TimeDelta = TimeDelta::minutes(1);

/// Charge time still ahead of `now`, summed over the periods' nearest occurrences.
#[must_use]
pub fn remaining_charge(periods: &[ChargingPeriod], now: DateTime<Local>) -> TimeDelta {
    periods
        .iter()
        .filter(|period| period.kind == PeriodKind::Charge)
        .filter_map(|period| remaining(period, now))
        .fold(TimeDelta::zero(), |sum, remaining| sum + remaining)
}

fn remaining(period: &ChargingPeriod, now: DateTime<Local>) -> Option<TimeDelta> {
    let occurrence = period.next_occurrence(now)?;
    Some(occurrence.end - occurrence.start.max(now))
}

/// Trim the charge periods so that no more than `required` charge time remains.
///
/// The latest charge minutes go first: whole periods are removed, and the earliest affected
/// one is shortened at its end. Discharge periods are kept as they are.
#[must_use]
pub fn trim_charge(
    periods: Vec<ChargingPeriod>,
    required: TimeDelta,
    now: DateTime<Local>,
) -> Vec<ChargingPeriod> {
    let total = remaining_charge(&periods, now);
    if total <= required {
        return periods;
    }
    let mut excess = total - required;
    info!(%total, %required, %excess, "trimming the charge");

    let latest_first = periods
        .iter()
        .enumerate()
        .filter(|(_, period)| period.kind == PeriodKind::Charge)
        .filter_map(|(index, period)| {
            period.next_occurrence(now).map(|occurrence| (index, occurrence))
        })
        .sorted_by_key(|(_, occurrence)| std::cmp::Reverse(occurrence.start))
        .collect_vec();

    let mut removed = vec![false; periods.len()];
    let mut periods = periods;
    for (index, occurrence) in latest_first {
        if excess <= TimeDelta::zero() {
            break;
        }
        let remaining = occurrence.end - occurrence.start.max(now);
        if remaining - excess < MIN_REMAINING {
            debug!(period = %periods[index], "removing");
            removed[index] = true;
            excess -= remaining;
        } else {
            let period = &mut periods[index];
            period.end -= excess;
            debug!(%period, "shortened");
            excess = TimeDelta::zero();
        }
    }

    periods
        .into_iter()
        .zip(removed)
        .filter(|(period, removed)| !removed && period.is_valid())
        .map(|(period, _)| period)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone};

    use super::*;
    use crate::{core::interval::Interval, quantity::power::Watts};

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 17, hour, minute, 0).unwrap()
    }

    fn period(kind: PeriodKind, start: DateTime<Local>, end: DateTime<Local>) -> ChargingPeriod {
        ChargingPeriod::from_interval(kind, Interval::new(start, end), Watts::from(5000.0))
            .remove(0)
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_trim_140_to_95_minutes() {
        let periods = vec![
            period(PeriodKind::Charge, at(1, 0), at(2, 0)),
            period(PeriodKind::Charge, at(3, 0), at(4, 20)),
        ];
        let now = at(0, 30);
        assert_eq!(remaining_charge(&periods, now), TimeDelta::minutes(140));

        let trimmed = trim_charge(periods, TimeDelta::minutes(95), now);
        assert_eq!(remaining_charge(&trimmed, now), TimeDelta::minutes(95));
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].end, time(2, 0));
        assert_eq!(trimmed[1].end, time(3, 35));
        assert!(trimmed.iter().all(ChargingPeriod::is_valid));
    }

    #[test]
    fn test_remove_whole_latest_period() {
        let periods = vec![
            period(PeriodKind::Charge, at(1, 0), at(2, 0)),
            period(PeriodKind::Discharge, at(18, 0), at(19, 0)),
            period(PeriodKind::Charge, at(3, 0), at(3, 30)),
        ];
        let trimmed = trim_charge(periods, TimeDelta::minutes(50), at(0, 30));
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].end, time(1, 50));
        assert_eq!(trimmed[1].kind, PeriodKind::Discharge);
    }

    #[test]
    fn test_partially_elapsed() {
        let periods = vec![period(PeriodKind::Charge, at(1, 0), at(3, 0))];
        let now = at(2, 0);
        let trimmed = trim_charge(periods, TimeDelta::minutes(30), now);
        assert_eq!(trimmed[0].start, time(1, 0));
        assert_eq!(trimmed[0].end, time(2, 30));
        assert_eq!(remaining_charge(&trimmed, now), TimeDelta::minutes(30));
    }

    #[test]
    fn test_nothing_to_trim() {
        let periods = vec![period(PeriodKind::Charge, at(1, 0), at(2, 0))];
        let trimmed = trim_charge(periods.clone(), TimeDelta::minutes(90), at(0, 30));
        assert_eq!(trimmed, periods);
    }

    #[test]
    fn test_drop_sliver() {
        let periods = vec![period(PeriodKind::Charge, at(1, 0), at(2, 0))];
        let trimmed = trim_charge(periods, TimeDelta::seconds(30), at(0, 30));
        assert!(trimmed.is_empty());
    }
}
