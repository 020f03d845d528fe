use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::period::{ChargingPeriod, PeriodKind};

/// Where the schema came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Source {
    /// Built by the daily planner.
    DailyPlan,

    /// Rewritten by the evening shift evaluation.
    EveningShift,

    /// Trimmed against the live state of charge just before applying.
    LiveTrim,
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyPlan => write!(f, "daily plan"),
            Self::EveningShift => write!(f, "evening shift"),
            Self::LiveTrim => write!(f, "live trim"),
        }
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChargingSchema {
    pub periods: Vec<ChargingPeriod>,

    pub created_at: DateTime<Local>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Local>>,

    pub source: Source,
}

impl ChargingSchema {
    pub const fn new(
        periods: Vec<ChargingPeriod>,
        created_at: DateTime<Local>,
        source: Source,
    ) -> Self {
        Self { periods, created_at, applied_at: None, source }
    }

    pub fn with_periods(&self, periods: Vec<ChargingPeriod>, source: Source) -> Self {
        Self { periods, created_at: self.created_at, applied_at: None, source }
    }

    pub fn charge_periods(&self) -> impl Iterator<Item = &ChargingPeriod> {
        self.periods.iter().filter(|period| period.kind == PeriodKind::Charge)
    }

    pub fn discharge_periods(&self) -> impl Iterator<Item = &ChargingPeriod> {
        self.periods.iter().filter(|period| period.kind == PeriodKind::Discharge)
    }

    /// Order-independent structural equality of the periods.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.periods.len() == other.periods.len()
            && self
                .sorted_for_gateway()
                .iter()
                .zip(&other.sorted_for_gateway())
                .all(|(lhs, rhs)| lhs.is_same_slot(rhs))
    }

    /// Charge periods first, each group by start time.
    #[must_use]
    pub fn sorted_for_gateway(&self) -> Vec<ChargingPeriod> {
        self.periods
            .iter()
            .copied()
            .sorted_by_key(|period| {
                (period.kind, period.start, period.end, OrderedFloat(period.power.0))
            })
            .collect()
    }

    /// Short human-readable line for the status sink.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.periods.is_empty() {
            return "no periods".to_owned();
        }
        self.sorted_for_gateway()
            .iter()
            .map(|period| format!("{} {period}", period.kind))
            .join(", ")
    }
}
