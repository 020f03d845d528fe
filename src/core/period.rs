use std::fmt::{Display, Formatter};

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveTime, TimeDelta};
use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::{core::interval::Interval, quantity::power::Watts};

/// Charge sorts before discharge: on a tie, the discharge yields.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    Charge,
    Discharge,
}

impl Display for PeriodKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Charge => write!(f, "charge"),
            Self::Discharge => write!(f, "discharge"),
        }
    }
}

#[derive(Debug, EnumSetType)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Monday => "Mo",
            Self::Tuesday => "Tu",
            Self::Wednesday => "We",
            Self::Thursday => "Th",
            Self::Friday => "Fr",
            Self::Saturday => "Sa",
            Self::Sunday => "Su",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// A repeating time-of-day period of forced charging or discharging.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChargingPeriod {
    pub kind: PeriodKind,

    /// Inclusive time of day.
    pub start: NaiveTime,

    /// Exclusive time of day, always after the start.
    pub end: NaiveTime,

    pub power: Watts,

    pub weekdays: EnumSet<Weekday>,
}

/// `HH:MM|HH:MM|power_mask`, the mask is Monday-first.
impl Display for ChargingPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}_",
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.power.round_u32(),
        )?;
        for weekday in EnumSet::<Weekday>::all() {
            write!(f, "{}", if self.weekdays.contains(weekday) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl ChargingPeriod {
    /// Midnight cannot be an end time of day, so the last minute stands in for it.
    pub const LAST_MINUTE: NaiveTime = NaiveTime::from_hms_opt(23, 59, 0).unwrap();

    /// Convert the absolute interval into periods active on the respective weekdays,
    /// splitting it at midnight.
    pub fn from_interval(kind: PeriodKind, interval: Interval, power: Watts) -> Vec<Self> {
        let mut periods = Vec::new();
        let mut date = interval.start.date_naive();
        while date <= interval.end.date_naive() {
            let start = if date == interval.start.date_naive() {
                interval.start.time()
            } else {
                NaiveTime::MIN
            };
            let end = if date == interval.end.date_naive() {
                interval.end.time()
            } else {
                Self::LAST_MINUTE
            };
            if start < end {
                periods.push(Self {
                    kind,
                    start,
                    end,
                    power,
                    weekdays: EnumSet::only(date.weekday().into()),
                });
            }
            let Some(next_date) = date.checked_add_days(Days::new(1)) else { break };
            date = next_date;
        }
        periods
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start < self.end && !self.weekdays.is_empty()
    }

    /// Time-of-day overlap, regardless of the weekdays.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        (self.start < other.end) && (other.start < self.end)
    }

    /// Field-by-field equality of what the gateway actually receives.
    #[must_use]
    pub fn is_same_slot(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.start == other.start
            && self.end == other.end
            && self.power == other.power
    }

    #[must_use]
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.weekdays.contains(date.weekday().into())
    }

    /// Absolute interval of the period on the date, if it is active then.
    pub fn occurrence_on(&self, date: NaiveDate) -> Option<Interval> {
        if !self.is_active_on(date) {
            return None;
        }
        let start = date.and_time(self.start).and_local_timezone(Local).earliest()?;
        let end = date.and_time(self.end).and_local_timezone(Local).earliest()?;
        Some(Interval::new(start, end))
    }

    /// The nearest occurrence which has not ended yet.
    pub fn next_occurrence(&self, since: DateTime<Local>) -> Option<Interval> {
        (0..=7)
            .filter_map(|n_days| since.date_naive().checked_add_days(Days::new(n_days)))
            .filter_map(|date| self.occurrence_on(date))
            .find(|interval| interval.end > since)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_display() {
        let period = ChargingPeriod {
            kind: PeriodKind::Charge,
            start: time(2, 0),
            end: time(5, 30),
            power: Watts::from(2500.0),
            weekdays: Weekday::Monday | Weekday::Sunday,
        };
        assert_eq!(period.to_string(), "02:00|05:30|2500_1000001");
    }

    #[test]
    fn test_from_interval_same_day() {
        let start = Local.with_ymd_and_hms(2025, 11, 17, 22, 15, 0).unwrap();
        let interval = Interval::new(start, start + TimeDelta::hours(1));
        let periods = ChargingPeriod::from_interval(PeriodKind::Charge, interval, Watts::ZERO);
        assert_eq!(periods.len(), 1);
        assert_eq!((periods[0].start, periods[0].end), (time(22, 15), time(23, 15)));
        assert_eq!(periods[0].weekdays, EnumSet::only(Weekday::Monday));
    }

    #[test]
    fn test_from_interval_midnight() {
        let start = Local.with_ymd_and_hms(2025, 11, 17, 22, 0, 0).unwrap();
        let end = Local.with_ymd_and_hms(2025, 11, 18, 0, 0, 0).unwrap();
        let periods =
            ChargingPeriod::from_interval(PeriodKind::Charge, Interval::new(start, end), Watts::ZERO);
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].end, ChargingPeriod::LAST_MINUTE);
    }

    #[test]
    fn test_from_interval_cross_day() {
        let start = Local.with_ymd_and_hms(2025, 11, 17, 22, 15, 0).unwrap();
        let end = Local.with_ymd_and_hms(2025, 11, 18, 1, 15, 0).unwrap();
        let periods = ChargingPeriod::from_interval(
            PeriodKind::Discharge,
            Interval::new(start, end),
            Watts::ZERO,
        );
        assert_eq!(periods.len(), 2);
        assert_eq!((periods[0].start, periods[0].end), (time(22, 15), ChargingPeriod::LAST_MINUTE));
        assert_eq!((periods[1].start, periods[1].end), (NaiveTime::MIN, time(1, 15)));
        assert_eq!(periods[1].weekdays, EnumSet::only(Weekday::Tuesday));
    }

    #[test]
    fn test_next_occurrence_skips_inactive_days() {
        let period = ChargingPeriod {
            kind: PeriodKind::Charge,
            start: time(2, 0),
            end: time(3, 0),
            power: Watts::ZERO,
            weekdays: EnumSet::only(Weekday::Wednesday),
        };
        // Monday:
        let now = Local.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap();
        let occurrence = period.next_occurrence(now).unwrap();
        assert_eq!(occurrence.start, Local.with_ymd_and_hms(2025, 11, 19, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_in_progress() {
        let period = ChargingPeriod {
            kind: PeriodKind::Charge,
            start: time(11, 0),
            end: time(13, 0),
            power: Watts::ZERO,
            weekdays: EnumSet::all(),
        };
        let now = Local.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap();
        let occurrence = period.next_occurrence(now).unwrap();
        assert_eq!(occurrence.start, Local.with_ymd_and_hms(2025, 11, 17, 11, 0, 0).unwrap());
    }
}
