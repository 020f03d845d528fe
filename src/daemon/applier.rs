//! Trimming the prepared schema against the live state of charge and sending it to the gateway.

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::{
    core::{
        mode::UserMode,
        schema::{ChargingSchema, Source},
        trim::{remaining_charge, trim_charge},
    },
    daemon::Daemon,
    prelude::*,
    tables::build_periods_table,
};

#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum ApplyOutcome {
    #[display("applied")]
    Applied,

    #[display("skipped ({_0})")]
    Skipped(SkipReason),

    #[display("failed")]
    Failed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum SkipReason {
    /// Same periods as the last applied schema.
    #[display("unchanged")]
    Unchanged,

    #[display("simulated")]
    Simulated,

    /// The battery is in the automatic mode, a retry has been scheduled.
    #[display("deferred in {_0} mode")]
    Deferred(UserMode),

    /// Nothing left to charge or discharge.
    #[display("nothing left")]
    NothingLeft,
}

impl Daemon {
    /// Apply the schema, adjusted to the live state of charge, unless it is already applied.
    ///
    /// Failures are logged and reported, the next trigger will try again.
    #[instrument(skip_all, name = "applying…", fields(source = ?schema.source))]
    pub async fn apply(self: &Arc<Self>, schema: &ChargingSchema, now: DateTime<Local>) -> ApplyOutcome {
        if schema.periods.is_empty() {
            warn!("refusing to apply an empty schema");
            return ApplyOutcome::Failed;
        }

        if !self.options.simulate
            && let Some(control) = &self.control
        {
            match self.guarded("querying the mode", control.get_user_mode()).await {
                Ok(UserMode::Automatic) => {
                    info!("the battery is in the automatic mode, deferring");
                    self.remember_mode(UserMode::Automatic);
                    self.schedule_retry(now);
                    return ApplyOutcome::Skipped(SkipReason::Deferred(UserMode::Automatic));
                }
                Ok(mode) => {
                    self.remember_mode(mode);
                }
                Err(error) => warn!("proceeding without the mode: {error:#}"),
            }
        }

        let candidate = match self.trimmed(schema, now).await {
            Some(candidate) => candidate,
            None => schema.clone(),
        };
        if candidate.periods.is_empty() {
            info!("nothing left to apply");
            return ApplyOutcome::Skipped(SkipReason::NothingLeft);
        }

        let mut applied = self.applied.lock().await;
        if applied.as_ref().is_some_and(|applied| applied.is_equivalent(&candidate)) {
            info!("already applied");
            return ApplyOutcome::Skipped(SkipReason::Unchanged);
        }

        let periods = candidate.sorted_for_gateway();
        if self.options.simulate {
            info!("simulating:\n{}", build_periods_table(&periods));
            return ApplyOutcome::Skipped(SkipReason::Simulated);
        }
        let Some(control) = &self.control else {
            warn!("the battery gateway is not configured");
            return ApplyOutcome::Failed;
        };
        match self.guarded("saving the schedule", control.save_schedule(&periods)).await {
            Ok(true) => {
                let candidate = ChargingSchema { applied_at: Some(now), ..candidate };
                if let Err(error) = self.store.save_applied(&candidate) {
                    warn!("failed to persist the applied schema: {error:#}");
                }
                let summary = candidate.summary();
                *applied = Some(candidate);
                drop(applied);
                info!(%summary, "applied");
                self.report(format!("applied: {summary}")).await;
                ApplyOutcome::Applied
            }
            Ok(false) => {
                drop(applied);
                warn!("the gateway refused the schedule");
                self.report("the gateway refused the schedule".to_owned()).await;
                ApplyOutcome::Failed
            }
            Err(error) => {
                drop(applied);
                error!("{error:#}");
                self.report(format!("apply failed: {error}")).await;
                ApplyOutcome::Failed
            }
        }
    }

    /// Schema with the charge cut down to what the live state of charge needs, if anything is cut.
    async fn trimmed(&self, schema: &ChargingSchema, now: DateTime<Local>) -> Option<ChargingSchema> {
        let battery = match self.guarded("fetching the battery state", self.battery.get_state()).await
        {
            Ok(battery) => battery,
            Err(error) => {
                warn!("applying untrimmed: {error:#}");
                return None;
            }
        };
        let required = battery.required_charge_time(self.settings.min_charge_buffer);
        let scheduled = remaining_charge(&schema.periods, now);
        info!(state_of_charge = %battery.state_of_charge, %required, %scheduled, "checking the charge time");
        if scheduled <= required {
            return None;
        }
        let periods = trim_charge(schema.periods.clone(), required, now);
        Some(schema.with_periods(periods, Source::LiveTrim))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::{
        core::period::PeriodKind,
        daemon::fakes::{Fakes, schema_at},
        quantity::percent::Percent,
    };

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 17, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_apply_twice_saves_once() {
        let fakes = Fakes::default();
        let daemon = fakes.daemon();
        let schema = schema_at(at(2, 0), at(5, 0));
        assert_eq!(daemon.apply(&schema, at(1, 58)).await, ApplyOutcome::Applied);
        assert_eq!(
            daemon.apply(&schema, at(1, 59)).await,
            ApplyOutcome::Skipped(SkipReason::Unchanged),
        );
        assert_eq!(fakes.control.n_saves(), 1);
        assert!(fakes.store.applied.lock().unwrap().is_some());
        assert!(fakes.status.last().is_some_and(|status| status.starts_with("applied")));
    }

    #[tokio::test]
    async fn test_empty_schema_fails() {
        let fakes = Fakes::default();
        let daemon = fakes.daemon();
        let schema = ChargingSchema::new(Vec::new(), at(0, 5), Source::DailyPlan);
        assert_eq!(daemon.apply(&schema, at(1, 58)).await, ApplyOutcome::Failed);
        assert_eq!(fakes.control.n_saves(), 0);
    }

    #[tokio::test]
    async fn test_trim_to_live_soc() {
        let fakes = Fakes::default();
        // 30% of 10 kWh at 5 kW is 36 minutes:
        fakes.battery.set_state_of_charge(Percent::from(70.0));
        let daemon = fakes.daemon();
        let schema = schema_at(at(2, 0), at(5, 0));
        assert_eq!(daemon.apply(&schema, at(1, 58)).await, ApplyOutcome::Applied);
        let saved = fakes.control.last_save().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].kind, PeriodKind::Charge);
        assert_eq!(saved[0].duration(), TimeDelta::minutes(36));
    }

    #[tokio::test]
    async fn test_deferred_in_automatic_mode() {
        let fakes = Fakes::default();
        *fakes.control.mode.lock().unwrap() = Some(UserMode::Automatic);
        let daemon = fakes.daemon();
        let outcome = daemon.apply(&schema_at(at(2, 0), at(5, 0)), at(1, 58)).await;
        assert_eq!(outcome, ApplyOutcome::Skipped(SkipReason::Deferred(UserMode::Automatic)));
        assert_eq!(fakes.control.n_saves(), 0);
        assert!(daemon.retry.is_pending());
    }

    #[tokio::test]
    async fn test_gateway_failure_is_not_fatal() {
        let fakes = Fakes::default();
        fakes.control.fail_saves();
        let daemon = fakes.daemon();
        let schema = schema_at(at(2, 0), at(5, 0));
        assert_eq!(daemon.apply(&schema, at(1, 58)).await, ApplyOutcome::Failed);
        assert!(fakes.store.applied.lock().unwrap().is_none());
        assert!(fakes.status.last().is_some_and(|status| status.starts_with("apply failed")));
    }

    #[tokio::test]
    async fn test_full_battery_keeps_discharge_only() {
        let fakes = Fakes::default();
        fakes.battery.set_state_of_charge(Percent::FULL);
        let daemon = fakes.daemon();
        let mut schema = schema_at(at(2, 0), at(5, 0));
        schema.periods.extend(schema_at(at(18, 0), at(19, 0)).periods.into_iter().map(|period| {
            crate::core::period::ChargingPeriod { kind: PeriodKind::Discharge, ..period }
        }));
        assert_eq!(daemon.apply(&schema, at(1, 58)).await, ApplyOutcome::Applied);
        let saved = fakes.control.last_save().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].kind, PeriodKind::Discharge);
    }
}
