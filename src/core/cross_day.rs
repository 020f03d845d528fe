//! Postponing the charge window across midnight when the battery can bridge till then.

use bon::Builder;
use chrono::{DateTime, Local, TimeDelta};

use crate::{
    core::{
        battery::BatteryState,
        interval::Interval,
        series::PriceSeries,
        settings::Settings,
        window::{highest_window, lowest_window},
    },
    prelude::*,
    quantity::{percent::Percent, rate::Rate},
};

/// Chosen charge and discharge windows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChargePlan {
    pub charge: Interval,
    pub discharge: Interval,

    /// Whether the charge window was picked from the combined today and tomorrow prices.
    pub is_cross_day: bool,
}

#[derive(Debug, derive_more::Display)]
enum Rejection {
    #[display("non-positive prices today")]
    NonPositivePrices,

    #[display("savings of {:.1}% are too small", savings * 100.0)]
    InsufficientSavings { savings: f64 },

    #[display("projected state of charge {projected} would fall below {minimum}")]
    CannotBridge { projected: Percent, minimum: Percent },
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct CrossDayOptimizer<'a> {
    today: &'a PriceSeries,
    tomorrow: Option<&'a PriceSeries>,
    battery: BatteryState,
    settings: &'a Settings,
    now: DateTime<Local>,
}

impl<S: cross_day_optimizer_builder::IsComplete> CrossDayOptimizerBuilder<'_, S> {
    pub fn optimize(self) -> Result<ChargePlan> {
        self.build().optimize()
    }
}

impl CrossDayOptimizer<'_> {
    #[instrument(
        skip_all,
        name = "optimizing the charge window…",
        fields(state_of_charge = %self.battery.state_of_charge),
    )]
    fn optimize(self) -> Result<ChargePlan> {
        let baseline = self.baseline()?;

        if self.battery.state_of_charge <= self.settings.high_soc_threshold {
            debug!("state of charge is not high enough to postpone charging");
            return Ok(baseline);
        }
        let Some(tomorrow) = self.tomorrow.filter(|tomorrow| !tomorrow.is_empty()) else {
            info!("no prices for tomorrow yet, keeping today's charge window");
            return Ok(baseline);
        };
        let required = self.battery.required_charge_time(self.settings.min_charge_buffer);
        if required <= TimeDelta::zero() {
            debug!("the battery is full, nothing to postpone");
            return Ok(baseline);
        }

        match self.try_cross_day(tomorrow, required, baseline)? {
            Ok(plan) => {
                info!(charge = %plan.charge, discharge = %plan.discharge, "postponing the charge window");
                Ok(plan)
            }
            Err(rejection) => {
                info!(%rejection, "keeping today's charge window");
                Ok(baseline)
            }
        }
    }

    /// Cheapest default-length charge window today and the dearest upcoming hour today.
    fn baseline(&self) -> Result<ChargePlan> {
        let charge = lowest_window(self.today, self.settings.default_charge_hours)
            .context("failed to find today's charge window")?;
        let upcoming = self.today.since(self.now);
        let discharge = if upcoming.is_empty() {
            warn!("all of today's prices have elapsed, picking the discharge from the whole day");
            highest_window(self.today, self.settings.discharge_window_hours)
        } else {
            highest_window(&upcoming, self.settings.discharge_window_hours)
        }
        .context("failed to find today's discharge window")?;
        Ok(ChargePlan { charge, discharge, is_cross_day: false })
    }

    fn try_cross_day(
        &self,
        tomorrow: &PriceSeries,
        required: TimeDelta,
        baseline: ChargePlan,
    ) -> Result<Result<ChargePlan, Rejection>> {
        let combined = self.today.since(self.now).chain(tomorrow);
        #[expect(clippy::cast_precision_loss)]
        let required_hours = required.num_minutes() as f64 / 60.0;
        let charge = lowest_window(&combined, required_hours)
            .context("failed to find the cross-day charge window")?;

        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_intervals =
            (required.as_seconds_f64() / self.today.step().as_seconds_f64()).ceil() as usize;
        let today_average =
            self.today.cheapest_average(n_intervals).context("no prices for today")?;
        let charge_average =
            combined.average_over(charge).context("no prices within the charge window")?;
        debug!(%today_average, %charge_average, "compared the averages");

        if today_average <= Rate::ZERO {
            return Ok(Err(Rejection::NonPositivePrices));
        }
        let savings = (today_average.0 - charge_average.0) / today_average.0;
        if savings <= self.settings.min_cross_day_savings {
            return Ok(Err(Rejection::InsufficientSavings { savings }));
        }
        let projected = self.projected_soc(charge.start);
        if projected < self.settings.minimum_soc {
            return Ok(Err(Rejection::CannotBridge { projected, minimum: self.settings.minimum_soc }));
        }

        let threshold = charge_average * self.settings.discharge_premium;
        let premium = combined.since(self.now).filter(|(_, rate)| *rate > threshold);
        let discharge = if premium.is_empty() {
            debug!(%threshold, "no premium prices, keeping today's discharge window");
            baseline.discharge
        } else {
            highest_window(&premium, self.settings.discharge_window_hours)?
        };

        Ok(Ok(ChargePlan { charge, discharge, is_cross_day: true }))
    }

    /// Approximate state of charge right before the charge starts.
    ///
    /// This is a linear consumption model over the configured daily consumption,
    /// not a measured forecast.
    fn projected_soc(&self, charge_start: DateTime<Local>) -> Percent {
        let hours_until_charge = (charge_start - self.now).as_seconds_f64().max(0.0) / 3600.0;
        self.battery.state_of_charge - self.settings.daily_consumption_soc * (hours_until_charge / 24.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Timelike};

    use super::*;
    use crate::{
        core::series::tests::hourly,
        quantity::{energy::WattHours, power::Watts},
    };

    const TODAY: [f64; 24] = [
        0.20, 0.19, 0.18, 0.18, 0.19, 0.21, 0.25, 0.30, 0.32, 0.28, 0.24, 0.22, 0.21, 0.20, 0.21,
        0.23, 0.27, 0.34, 0.38, 0.35, 0.29, 0.26, 0.24, 0.22,
    ];

    /// Much cheaper at night.
    const TOMORROW: [f64; 24] = [
        0.10, 0.08, 0.05, 0.05, 0.06, 0.09, 0.20, 0.30, 0.40, 0.28, 0.24, 0.22, 0.21, 0.20, 0.21,
        0.23, 0.27, 0.34, 0.38, 0.35, 0.29, 0.26, 0.24, 0.22,
    ];

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 17).unwrap()
    }

    fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 18).unwrap()
    }

    fn battery(state_of_charge: f64) -> BatteryState {
        BatteryState {
            state_of_charge: Percent::from(state_of_charge),
            capacity: WattHours::from(10_000.0),
            max_inverter_power: Watts::from(5000.0),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_baseline_on_low_soc() -> Result {
        let plan = CrossDayOptimizer::builder()
            .today(&hourly(today(), &TODAY))
            .tomorrow(&hourly(tomorrow(), &TOMORROW))
            .battery(battery(40.0))
            .settings(&Settings::default())
            .now(now())
            .optimize()?;
        assert!(!plan.is_cross_day);
        assert_eq!(plan.charge.start.hour(), 1);
        assert_eq!(plan.charge.duration(), TimeDelta::hours(3));
        assert_eq!(plan.discharge.start.hour(), 18);
        Ok(())
    }

    #[test]
    fn test_baseline_without_tomorrow() -> Result {
        let plan = CrossDayOptimizer::builder()
            .today(&hourly(today(), &TODAY))
            .battery(battery(90.0))
            .settings(&Settings::default())
            .now(now())
            .optimize()?;
        assert!(!plan.is_cross_day);
        Ok(())
    }

    #[test]
    fn test_cross_day_accepted() -> Result {
        // 25% missing of 10 kWh at 5 kW is 30 minutes:
        let plan = CrossDayOptimizer::builder()
            .today(&hourly(today(), &TODAY))
            .tomorrow(&hourly(tomorrow(), &TOMORROW))
            .battery(battery(75.0))
            .settings(&Settings::default())
            .now(now())
            .optimize()?;
        assert!(plan.is_cross_day);
        assert_eq!(plan.charge.start, Local.with_ymd_and_hms(2025, 11, 18, 2, 0, 0).unwrap());
        assert_eq!(plan.charge.duration(), TimeDelta::minutes(30));
        // The dearest upcoming hour is tomorrow at 08:00:
        assert_eq!(plan.discharge.start, Local.with_ymd_and_hms(2025, 11, 18, 8, 0, 0).unwrap());
        Ok(())
    }

    #[test]
    fn test_cross_day_rejected_when_cannot_bridge() -> Result {
        let settings = Settings { minimum_soc: Percent::from(70.0), ..Settings::default() };
        let plan = CrossDayOptimizer::builder()
            .today(&hourly(today(), &TODAY))
            .tomorrow(&hourly(tomorrow(), &TOMORROW))
            .battery(battery(75.0))
            .settings(&settings)
            .now(now())
            .optimize()?;
        assert!(!plan.is_cross_day);
        Ok(())
    }

    #[test]
    fn test_cross_day_rejected_on_small_savings() -> Result {
        let plan = CrossDayOptimizer::builder()
            .today(&hourly(today(), &TODAY))
            .tomorrow(&hourly(tomorrow(), &TODAY))
            .battery(battery(75.0))
            .settings(&Settings::default())
            .now(now())
            .optimize()?;
        assert!(!plan.is_cross_day);
        Ok(())
    }

    /// Whatever the consumption, a postponed charge never starts below the minimum.
    #[test]
    fn test_never_postpones_below_minimum() -> Result {
        for daily_consumption in [0.0, 10.0, 20.0, 40.0, 60.0, 80.0, 100.0] {
            let settings = Settings {
                daily_consumption_soc: Percent::from(daily_consumption),
                ..Settings::default()
            };
            let today_prices = hourly(today(), &TODAY);
            let tomorrow_prices = hourly(tomorrow(), &TOMORROW);
            let plan = CrossDayOptimizer::builder()
                .today(&today_prices)
                .tomorrow(&tomorrow_prices)
                .battery(battery(75.0))
                .settings(&settings)
                .now(now())
                .optimize()?;
            if plan.is_cross_day {
                let hours = (plan.charge.start - now()).as_seconds_f64() / 3600.0;
                let projected = 75.0 - hours / 24.0 * daily_consumption;
                assert!(projected >= settings.minimum_soc.0);
            }
        }
        Ok(())
    }
}
