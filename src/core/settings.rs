use chrono::{NaiveTime, TimeDelta};

use crate::quantity::{percent::Percent, power::Watts};

/// Strategy thresholds of the daily plan.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Settings {
    /// Forced discharge power, capped by the inverter.
    pub discharge_power: Watts,

    /// Above this state of charge, charging may be postponed till tomorrow.
    pub high_soc_threshold: Percent,

    /// Above this state of charge, the battery may be discharged in the morning.
    pub morning_soc_threshold: Percent,

    /// The battery must never be planned to drop below this.
    pub minimum_soc: Percent,

    /// Evening discharge stops at this state of charge.
    pub discharge_target_soc: Percent,

    /// Rough household consumption per day, used to check bridging till a later charge.
    pub daily_consumption_soc: Percent,

    /// Minimal charge time when the battery is not full.
    pub min_charge_buffer: TimeDelta,

    pub morning_window_start: NaiveTime,

    pub morning_window_end: NaiveTime,

    /// The morning check happens this long before the charge start.
    pub morning_check_offset: TimeDelta,

    /// Prices from this time of day on are considered the evening ones.
    pub evening_threshold: NaiveTime,

    /// Minimal relative savings to postpone charging till tomorrow.
    pub min_cross_day_savings: f64,

    /// Discharge only where the price exceeds the charge price by this factor.
    pub discharge_premium: f64,

    /// Length of the default charge window, in hours.
    pub default_charge_hours: f64,

    /// Length of the discharge price window, in hours.
    pub discharge_window_hours: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discharge_power: Watts::from(2000.0),
            high_soc_threshold: Percent::from(60.0),
            morning_soc_threshold: Percent::from(70.0),
            minimum_soc: Percent::from(20.0),
            discharge_target_soc: Percent::from(30.0),
            daily_consumption_soc: Percent::from(40.0),
            min_charge_buffer: TimeDelta::minutes(15),
            morning_window_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            morning_window_end: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            morning_check_offset: TimeDelta::hours(1),
            evening_threshold: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            min_cross_day_savings: 0.05,
            discharge_premium: 1.15,
            default_charge_hours: 3.0,
            discharge_window_hours: 1.0,
        }
    }
}
