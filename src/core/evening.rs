//! Moving tonight's discharge to tomorrow morning when the morning peak is dearer.

use bon::Builder;
use chrono::{DateTime, Local, NaiveTime};

use crate::{
    core::{
        battery::BatteryState,
        interval::Interval,
        overlap,
        period::{ChargingPeriod, PeriodKind},
        schema::{ChargingSchema, Source},
        series::PriceSeries,
        settings::Settings,
    },
    prelude::*,
};

#[must_use]
#[derive(Debug)]
pub enum EveningDecision {
    Keep,

    Shift {
        schema: ChargingSchema,

        /// One-off discharge to carry over into tomorrow's plan.
        morning: Vec<ChargingPeriod>,
    },
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct EveningShift<'a> {
    schema: &'a ChargingSchema,
    today: &'a PriceSeries,
    tomorrow: Option<&'a PriceSeries>,
    battery: BatteryState,
    settings: &'a Settings,
}

impl<S: evening_shift_builder::IsComplete> EveningShiftBuilder<'_, S> {
    pub fn evaluate(self) -> EveningDecision {
        self.build().evaluate()
    }
}

impl EveningShift<'_> {
    #[instrument(skip_all, name = "checking the evening discharge…")]
    fn evaluate(self) -> EveningDecision {
        let Some(tomorrow) = self.tomorrow else {
            info!("no prices for tomorrow yet");
            return EveningDecision::Keep;
        };
        let evening_threshold = self.settings.evening_threshold;
        let Some((evening_time, evening_rate)) =
            self.today.filter(|(time, _)| time.time() >= evening_threshold).peak()
        else {
            info!("no evening prices");
            return EveningDecision::Keep;
        };
        let Some((morning_time, morning_rate)) = tomorrow
            .filter(|(time, _)| {
                Self::is_within(
                    *time,
                    self.settings.morning_window_start,
                    self.settings.morning_window_end,
                )
            })
            .peak()
        else {
            info!("no morning prices for tomorrow");
            return EveningDecision::Keep;
        };
        if morning_rate <= evening_rate {
            info!(%evening_time, %evening_rate, %morning_rate, "keeping the evening discharge");
            return EveningDecision::Keep;
        }

        let power = self.settings.discharge_power.min(self.battery.max_inverter_power);
        let duration = self.battery.discharge_duration(self.settings.discharge_target_soc, power);
        if duration.is_zero() {
            info!(state_of_charge = %self.battery.state_of_charge, "nothing to discharge");
            return EveningDecision::Keep;
        }
        let morning = ChargingPeriod::from_interval(
            PeriodKind::Discharge,
            Interval::starting_at(morning_time, duration),
            power,
        );
        info!(%morning_time, %morning_rate, %evening_rate, "moving the discharge to the morning");

        let periods = self
            .schema
            .periods
            .iter()
            .copied()
            .filter(|period| {
                period.kind != PeriodKind::Discharge || period.start < evening_threshold
            })
            .chain(morning.iter().copied());
        let schema = self.schema.with_periods(overlap::resolve(periods), Source::EveningShift);
        EveningDecision::Shift { schema, morning }
    }

    fn is_within(time: DateTime<Local>, start: NaiveTime, end: NaiveTime) -> bool {
        (start..end).contains(&time.time())
    }
}
