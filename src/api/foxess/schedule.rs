use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    core::period::{ChargingPeriod, PeriodKind},
    prelude::*,
    quantity::{percent::Percent, power::Watts},
};

#[serde_as]
#[derive(Serialize, Deserialize)]
pub struct Schedule {
    #[serde_as(as = "serde_with::BoolFromInt")]
    #[serde(rename = "enable")]
    pub is_enabled: bool,

    #[serde(rename = "groups")]
    pub groups: TimeSlotSequence,
}

#[serde_as]
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde_as(as = "serde_with::BoolFromInt")]
    #[serde(rename = "enable")]
    pub is_enabled: bool,

    #[serde(flatten)]
    pub start_time: StartTime,

    #[serde(flatten)]
    pub end_time: EndTime,

    #[serde(rename = "maxSoc")]
    pub max_soc: u32,

    /// The minimum SoC value of the offline battery (minimal safe SoC value?).
    #[expect(clippy::doc_markdown)]
    #[serde(rename = "minSocOnGrid")]
    pub min_soc_on_grid: u32,

    /// Discharge SoC value (minimal safe SoC value?).
    #[expect(clippy::doc_markdown)]
    #[serde(rename = "fdSoc")]
    pub feed_soc: u32,

    /// The maximum discharge power value (but also, maximum charge power?).
    #[serde(rename = "fdPwr")]
    pub feed_power: Watts,

    #[serde(rename = "workMode")]
    pub working_mode: WorkingMode,
}

impl TimeSlot {
    fn from_period(period: &ChargingPeriod, min_soc: u32) -> Self {
        Self {
            is_enabled: true,
            start_time: StartTime::from(period.start),
            end_time: EndTime::from(period.end),
            max_soc: 100,
            min_soc_on_grid: min_soc,
            feed_soc: min_soc,
            feed_power: period.power,
            working_mode: match period.kind {
                PeriodKind::Charge => WorkingMode::ForceCharge,
                PeriodKind::Discharge => WorkingMode::ForceDischarge,
            },
        }
    }
}

#[derive(Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StartTime {
    #[serde(rename = "startHour")]
    pub hour: u32,

    #[serde(rename = "startMinute")]
    pub minute: u32,
}

impl Display for StartTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl From<NaiveTime> for StartTime {
    fn from(time: NaiveTime) -> Self {
        Self { hour: time.hour(), minute: time.minute() }
    }
}

#[derive(Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EndTime {
    #[serde(rename = "endHour")]
    pub hour: u32,

    #[serde(rename = "endMinute")]
    pub minute: u32,
}

impl Display for EndTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl From<NaiveTime> for EndTime {
    fn from(time: NaiveTime) -> Self {
        // FoxESS Cloud won't accept `00:00`:
        if time == NaiveTime::MIN {
            Self { hour: 23, minute: 59 }
        } else {
            Self { hour: time.hour(), minute: time.minute() }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, derive_more::AsRef, derive_more::IntoIterator)]
pub struct TimeSlotSequence(#[into_iterator(ref)] Vec<TimeSlot>);

impl TimeSlotSequence {
    /// FoxESS Cloud allows maximum of 8 schedule groups.
    pub const MAX_LEN: usize = 8;

    /// Time slots have no weekdays, so only the periods coming up in the next 24 hours are taken.
    #[instrument(skip_all)]
    pub fn from_periods(
        periods: &[ChargingPeriod],
        now: DateTime<Local>,
        min_soc: Percent,
    ) -> Result<Self> {
        let horizon = now + TimeDelta::days(1);
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let min_soc = min_soc.0.round().clamp(0.0, 100.0) as u32;
        let slots: Vec<TimeSlot> = periods
            .iter()
            .filter(|period| {
                period
                    .next_occurrence(now)
                    .is_some_and(|occurrence| occurrence.start < horizon)
            })
            .map(|period| TimeSlot::from_period(period, min_soc))
            .collect();
        ensure!(
            slots.len() <= Self::MAX_LEN,
            "FoxESS Cloud allows at most {} time slots, got {}",
            Self::MAX_LEN,
            slots.len(),
        );
        debug!(n_slots = slots.len(), n_periods = periods.len(), "converted");
        Ok(Self(slots))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
pub enum WorkingMode {
    #[serde(rename = "SelfUse")]
    SelfUse,

    #[serde(rename = "Feedin")]
    FeedIn,

    #[serde(rename = "ForceCharge")]
    ForceCharge,

    #[serde(rename = "ForceDischarge")]
    ForceDischarge,

    #[serde(rename = "Backup")]
    BackUp,
}
