//! Daily schema from the three checkpoints: morning discharge, charge and evening discharge.

use bon::Builder;
use chrono::{DateTime, Local, TimeDelta};

use crate::{
    core::{
        battery::BatteryState,
        cross_day::{ChargePlan, CrossDayOptimizer},
        error::ScheduleError,
        interval::Interval,
        overlap,
        period::{ChargingPeriod, PeriodKind},
        schema::{ChargingSchema, Source},
        series::PriceSeries,
        settings::Settings,
        window::highest_window,
    },
    prelude::*,
};

#[must_use]
#[derive(Debug)]
pub struct DailyPlan {
    pub schema: ChargingSchema,

    pub charge_plan: ChargePlan,

    /// When to compare tonight's discharge against tomorrow's morning peak.
    pub evening_check_at: Option<DateTime<Local>>,
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Planner<'a> {
    today: &'a PriceSeries,
    tomorrow: Option<&'a PriceSeries>,
    battery: BatteryState,
    settings: &'a Settings,
    now: DateTime<Local>,

    /// Periods planned earlier for today, like a morning discharge moved from last evening.
    #[builder(default)]
    carry_over: Vec<ChargingPeriod>,
}

impl<S: planner_builder::IsComplete> PlannerBuilder<'_, S> {
    pub fn plan(self) -> Result<DailyPlan> {
        self.build().plan()
    }
}

impl Planner<'_> {
    const MIN_PRICE_POINTS: usize = 3;

    const EVENING_CHECK_LEAD: TimeDelta = TimeDelta::minutes(30);

    #[instrument(skip_all, name = "planning the day…", fields(now = %self.now))]
    fn plan(self) -> Result<DailyPlan> {
        if self.today.len() < Self::MIN_PRICE_POINTS {
            bail!(ScheduleError::InsufficientPriceData {
                n_points: self.today.len(),
                min_points: Self::MIN_PRICE_POINTS,
            });
        }

        let charge_plan = CrossDayOptimizer::builder()
            .today(self.today)
            .maybe_tomorrow(self.tomorrow)
            .battery(self.battery)
            .settings(self.settings)
            .now(self.now)
            .optimize()?;
        let charge_power = self.battery.max_inverter_power;
        let discharge_power = self.settings.discharge_power.min(self.battery.max_inverter_power);

        let mut periods = self.carry_over.clone();

        // Checkpoint 1:
        if let Some(morning) = self.morning_discharge(charge_plan.charge)? {
            info!(%morning, "adding the morning discharge");
            periods.extend(ChargingPeriod::from_interval(
                PeriodKind::Discharge,
                morning,
                discharge_power,
            ));
        }

        // Checkpoint 2:
        periods.extend(ChargingPeriod::from_interval(
            PeriodKind::Charge,
            charge_plan.charge,
            charge_power,
        ));

        // Checkpoint 3:
        let discharge_duration =
            self.battery.discharge_duration(self.settings.discharge_target_soc, discharge_power);
        let evening_check_at = if discharge_duration > TimeDelta::zero() {
            let discharge = Interval::starting_at(charge_plan.discharge.start, discharge_duration);
            info!(%discharge, "adding the discharge");
            periods.extend(ChargingPeriod::from_interval(
                PeriodKind::Discharge,
                discharge,
                discharge_power,
            ));
            Some(discharge.start - Self::EVENING_CHECK_LEAD)
        } else {
            info!(
                state_of_charge = %self.battery.state_of_charge,
                target = %self.settings.discharge_target_soc,
                "nothing to discharge",
            );
            None
        };

        let schema = ChargingSchema::new(overlap::resolve(periods), self.now, Source::DailyPlan);
        info!(n_periods = schema.periods.len(), summary = %schema.summary(), "planned");
        Ok(DailyPlan { schema, charge_plan, evening_check_at })
    }

    /// The dearest hour between the morning window start and the charge start,
    /// when the battery is full enough and there is still time for it.
    fn morning_discharge(&self, charge: Interval) -> Result<Option<Interval>> {
        if self.battery.state_of_charge <= self.settings.morning_soc_threshold {
            debug!("state of charge is too low for the morning discharge");
            return Ok(None);
        }
        if self.now >= charge.start {
            debug!("the charge has already started");
            return Ok(None);
        }
        let Some(floor) = charge
            .start
            .date_naive()
            .and_time(self.settings.morning_window_start)
            .and_local_timezone(Local)
            .earliest()
        else {
            return Ok(None);
        };
        if charge.start - self.settings.morning_check_offset <= floor {
            debug!(%floor, "the charge starts too early for the morning discharge");
            return Ok(None);
        }

        let prices = match self.tomorrow {
            Some(tomorrow) => self.today.chain(tomorrow),
            None => self.today.clone(),
        };
        let candidates = prices.within(Interval::new(floor, charge.start));
        if candidates.is_empty() {
            return Ok(None);
        }
        let mut window = highest_window(&candidates, self.settings.discharge_window_hours)?;
        window = window.with_end(window.end.min(charge.start));
        if window.start < self.now {
            window = window.with_start(self.now);
        }
        Ok(if window.is_empty() { None } else { Some(window) })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike};
    use itertools::Itertools;

    use super::*;
    use crate::{
        core::series::tests::hourly,
        quantity::{energy::WattHours, percent::Percent, power::Watts, rate::Rate},
    };

    fn battery(state_of_charge: f64) -> BatteryState {
        BatteryState {
            state_of_charge: Percent::from(state_of_charge),
            capacity: WattHours::from(10_000.0),
            max_inverter_power: Watts::from(5000.0),
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 17, hour, minute, 0).unwrap()
    }

    fn sparse_prices() -> PriceSeries {
        [(2, 0.20), (8, 0.31), (17, 0.25), (23, 0.15)]
            .into_iter()
            .map(|(hour, rate)| (at(hour, 0), Rate::from(rate)))
            .collect()
    }

    fn assert_disjoint(schema: &ChargingSchema) {
        for (lhs, rhs) in schema.periods.iter().tuple_combinations() {
            assert!(!lhs.overlaps(rhs), "{lhs} overlaps {rhs}");
        }
    }

    #[test]
    fn test_insufficient_price_data() {
        let prices: PriceSeries =
            [(at(1, 0), Rate::from(0.1)), (at(2, 0), Rate::from(0.2))].into_iter().collect();
        let error = Planner::builder()
            .today(&prices)
            .battery(battery(50.0))
            .settings(&Settings::default())
            .now(at(0, 5))
            .plan()
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::InsufficientPriceData { n_points: 2, .. })
        ));
    }

    #[test]
    fn test_morning_discharge_before_late_charge() -> Result {
        let plan = Planner::builder()
            .today(&sparse_prices())
            .battery(battery(75.0))
            .settings(&Settings::default())
            .now(at(0, 5))
            .plan()?;
        assert_disjoint(&plan.schema);
        assert_eq!(plan.charge_plan.charge.start, at(23, 0));

        let discharges = plan.schema.discharge_periods().collect_vec();
        assert!(
            discharges
                .iter()
                .any(|period| period.start <= NaiveTime::from_hms_opt(8, 0, 0).unwrap()
                    && NaiveTime::from_hms_opt(8, 0, 0).unwrap() < period.end)
        );
        let charges = plan.schema.charge_periods().collect_vec();
        assert_eq!(charges[0].start, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(charges.last().unwrap().start, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        Ok(())
    }

    /// Past the start of the dearest morning hour, the discharge starts now and keeps its end.
    #[test]
    fn test_morning_discharge_clamped_to_now() -> Result {
        let prices = sparse_prices();
        let settings = Settings::default();
        let early = Planner::builder()
            .today(&prices)
            .battery(battery(75.0))
            .settings(&settings)
            .now(at(0, 5))
            .build();
        let charge = CrossDayOptimizer::builder()
            .today(&prices)
            .battery(battery(75.0))
            .settings(&settings)
            .now(at(0, 5))
            .optimize()?
            .charge;
        let window = early.morning_discharge(charge)?.unwrap();
        assert!(window.start <= at(8, 0));
        assert!(at(8, 20) < window.end);

        let late = Planner::builder()
            .today(&prices)
            .battery(battery(75.0))
            .settings(&settings)
            .now(at(8, 20))
            .build();
        let clamped = late.morning_discharge(charge)?.unwrap();
        assert_eq!(clamped.start, at(8, 20));
        assert_eq!(clamped.end, window.end);
        Ok(())
    }

    #[test]
    fn test_no_morning_discharge_once_charging() -> Result {
        let plan = Planner::builder()
            .today(&sparse_prices())
            .battery(battery(75.0))
            .settings(&Settings::default())
            .now(at(23, 30))
            .plan()?;
        assert!(
            plan.schema
                .discharge_periods()
                .all(|period| period.start > NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        );
        Ok(())
    }

    #[test]
    fn test_no_morning_discharge_on_low_soc() -> Result {
        let plan = Planner::builder()
            .today(&sparse_prices())
            .battery(battery(65.0))
            .settings(&Settings::default())
            .now(at(0, 5))
            .plan()?;
        // Only the evening discharge (at the dearest 08:00) and the charge:
        assert_eq!(plan.schema.discharge_periods().count(), 1);
        Ok(())
    }

    #[test]
    fn test_hourly_day() -> Result {
        let rates = [
            0.20, 0.19, 0.18, 0.17, 0.18, 0.21, 0.25, 0.30, 0.32, 0.28, 0.24, 0.22, 0.21, 0.20,
            0.21, 0.23, 0.27, 0.34, 0.38, 0.35, 0.29, 0.26, 0.24, 0.22,
        ];
        let today = hourly(NaiveDate::from_ymd_opt(2025, 11, 17).unwrap(), &rates);
        let plan = Planner::builder()
            .today(&today)
            .battery(battery(50.0))
            .settings(&Settings::default())
            .now(at(0, 5))
            .plan()?;
        assert_disjoint(&plan.schema);

        let charges = plan.schema.charge_periods().collect_vec();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].start.hour(), 2);
        assert_eq!(charges[0].end.hour(), 5);
        assert_eq!(charges[0].power, Watts::from(5000.0));

        // 20% of 10 kWh at 2 kW is one hour:
        let discharges = plan.schema.discharge_periods().collect_vec();
        assert_eq!(discharges.len(), 1);
        assert_eq!(discharges[0].start.hour(), 18);
        assert_eq!(discharges[0].duration(), TimeDelta::hours(1));
        assert_eq!(plan.evening_check_at, Some(at(17, 30)));
        Ok(())
    }

    #[test]
    fn test_nothing_to_discharge() -> Result {
        let plan = Planner::builder()
            .today(&sparse_prices())
            .battery(battery(25.0))
            .settings(&Settings::default())
            .now(at(0, 5))
            .plan()?;
        assert_eq!(plan.schema.discharge_periods().count(), 0);
        assert_eq!(plan.evening_check_at, None);
        Ok(())
    }

    #[test]
    fn test_carry_over_is_resolved() -> Result {
        let carried = ChargingPeriod::from_interval(
            PeriodKind::Discharge,
            Interval::new(at(2, 30), at(3, 30)),
            Watts::from(2000.0),
        );
        let rates = [0.1, 0.1, 0.1, 0.1, 0.1, 0.5, 0.5, 0.5];
        let today = hourly(NaiveDate::from_ymd_opt(2025, 11, 17).unwrap(), &rates);
        let plan = Planner::builder()
            .today(&today)
            .battery(battery(50.0))
            .settings(&Settings::default())
            .now(at(0, 5))
            .carry_over(carried)
            .plan()?;
        assert_disjoint(&plan.schema);
        Ok(())
    }
}
