use chrono::{NaiveTime, TimeDelta};
use clap::Parser;

use crate::{cli::battery::BatteryArgs, core::settings::Settings, quantity::percent::Percent};

/// Thresholds of the daily three-checkpoint template.
#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct StrategyArgs {
    /// Above this state of charge, the charge may be postponed to tomorrow.
    #[clap(long = "high-soc-percent", default_value = "60", env = "HIGH_SOC_PERCENT")]
    pub high_soc_threshold: Percent,

    /// Above this state of charge, the morning discharge is considered.
    #[clap(long = "morning-soc-percent", default_value = "70", env = "MORNING_SOC_PERCENT")]
    pub morning_soc_threshold: Percent,

    /// The evening discharge stops at this state of charge.
    #[clap(
        long = "discharge-target-soc-percent",
        default_value = "30",
        env = "DISCHARGE_TARGET_SOC_PERCENT"
    )]
    pub discharge_target_soc: Percent,

    /// Estimated household consumption, in state of charge percent per day.
    #[clap(
        long = "daily-consumption-soc-percent",
        default_value = "40",
        env = "DAILY_CONSUMPTION_SOC_PERCENT"
    )]
    pub daily_consumption_soc: Percent,

    #[clap(
        long = "min-charge-buffer-minutes",
        default_value = "15",
        env = "MIN_CHARGE_BUFFER_MINUTES"
    )]
    pub min_charge_buffer_minutes: i64,

    #[clap(long = "morning-window-start", default_value = "06:00", env = "MORNING_WINDOW_START")]
    pub morning_window_start: NaiveTime,

    #[clap(long = "morning-window-end", default_value = "10:00", env = "MORNING_WINDOW_END")]
    pub morning_window_end: NaiveTime,

    /// The morning discharge is only added if the charge starts this much after the window start.
    #[clap(
        long = "morning-check-offset-minutes",
        default_value = "60",
        env = "MORNING_CHECK_OFFSET_MINUTES"
    )]
    pub morning_check_offset_minutes: i64,

    #[clap(long = "evening-threshold", default_value = "17:00", env = "EVENING_THRESHOLD")]
    pub evening_threshold: NaiveTime,

    /// Minimal relative savings of a cross-day charge, in percent.
    #[clap(
        long = "min-cross-day-savings-percent",
        default_value = "5",
        env = "MIN_CROSS_DAY_SAVINGS_PERCENT"
    )]
    pub min_cross_day_savings: Percent,

    /// Discharge only at prices above the charge price times this, in percent.
    #[clap(
        long = "discharge-premium-percent",
        default_value = "115",
        env = "DISCHARGE_PREMIUM_PERCENT"
    )]
    pub discharge_premium: Percent,
}

impl StrategyArgs {
    pub fn settings(&self, battery: &BatteryArgs) -> Settings {
        Settings {
            discharge_power: battery.discharge_power,
            high_soc_threshold: self.high_soc_threshold,
            morning_soc_threshold: self.morning_soc_threshold,
            minimum_soc: battery.min_soc,
            discharge_target_soc: self.discharge_target_soc,
            daily_consumption_soc: self.daily_consumption_soc,
            min_charge_buffer: TimeDelta::minutes(self.min_charge_buffer_minutes),
            morning_window_start: self.morning_window_start,
            morning_window_end: self.morning_window_end,
            morning_check_offset: TimeDelta::minutes(self.morning_check_offset_minutes),
            evening_threshold: self.evening_threshold,
            min_cross_day_savings: self.min_cross_day_savings.to_proportion(),
            discharge_premium: self.discharge_premium.to_proportion(),
            ..Settings::default()
        }
    }
}
