//! Event-driven runtime around the planner: daily builds, EMS windows, retries and application.

mod applier;
mod ems;
#[cfg(test)]
mod fakes;
mod retry;
mod timer;

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bon::Builder;
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveTime, TimeDelta};
use enumset::EnumSet;
use reqwest::Url;
use tokio::sync::Mutex;

pub use self::{
    applier::{ApplyOutcome, SkipReason},
    ems::{BlockReason, WindowStart},
};
use self::{retry::RetryGuard, timer::spawn_at};
use crate::{
    api::{
        battery::{BatteryControl, BatteryMonitor},
        ems::{EmsSwitch, StatusSink},
        heartbeat,
        price_feed::PriceFeed,
    },
    core::{
        ems_window::EmsBuffers,
        error::ScheduleError,
        evening::{EveningDecision, EveningShift},
        period::ChargingPeriod,
        planner::{DailyPlan, Planner},
        schema::ChargingSchema,
        settings::Settings,
    },
    prelude::*,
    state::StateStore,
};

/// Runtime knobs which are not part of the strategy.
#[derive(Copy, Clone, Debug)]
pub struct Options {
    /// Log what would be done instead of touching the gateway and the EMS switch.
    pub simulate: bool,

    pub buffers: EmsBuffers,

    /// Pause between switching the EMS off and applying the schema.
    pub settle_delay: Duration,

    /// Upper bound on every external call.
    pub gateway_timeout: Duration,

    pub daily_build_at: NaiveTime,

    pub insufficient_data_retry: TimeDelta,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            simulate: false,
            buffers: EmsBuffers::default(),
            settle_delay: Duration::from_secs(5),
            gateway_timeout: Duration::from_secs(30),
            daily_build_at: NaiveTime::from_hms_opt(0, 5, 0).unwrap_or_default(),
            insufficient_data_retry: TimeDelta::minutes(10),
        }
    }
}

/// Prepared schema along with the date it was built for and its generation.
#[derive(Clone, Debug)]
pub struct Prepared {
    pub date: NaiveDate,
    pub schema: ChargingSchema,
    pub generation: u64,
}

#[derive(Builder)]
pub struct Daemon {
    settings: Settings,

    #[builder(default)]
    options: Options,

    prices: Arc<dyn PriceFeed>,
    battery: Arc<dyn BatteryMonitor>,

    /// Absent when the gateway is not configured.
    control: Option<Arc<dyn BatteryControl>>,

    ems_switch: Arc<dyn EmsSwitch>,
    status: Arc<dyn StatusSink>,
    store: Arc<dyn StateStore>,
    heartbeat_url: Option<Url>,

    #[builder(skip)]
    prepared: Mutex<Option<Prepared>>,

    #[builder(skip)]
    applied: Mutex<Option<ChargingSchema>>,

    #[builder(skip)]
    generation: AtomicU64,

    #[builder(skip)]
    retry: RetryGuard,
}

impl Daemon {
    /// Restore the persisted state and keep planning every day until interrupted.
    #[instrument(skip_all, name = "running the daemon…")]
    pub async fn run(self: Arc<Self>) -> Result {
        let now = Local::now();
        self.restore(now).await;
        if self.prepared.lock().await.is_none() {
            self.build_daily(now).await;
        }
        self.schedule_daily_build(now);

        tokio::signal::ctrl_c().await.context("failed to wait for the interrupt")?;
        info!("interrupted");
        Ok(())
    }

    /// Load the applied snapshot and today's prepared schema, if any.
    #[instrument(skip_all, name = "restoring the state…")]
    async fn restore(self: &Arc<Self>, now: DateTime<Local>) {
        match self.store.load_applied() {
            Ok(applied) => *self.applied.lock().await = applied,
            Err(error) => warn!("failed to load the applied schema: {error:#}"),
        }
        let mut prepared = self.prepared.lock().await;
        match self.store.load_prepared(now.date_naive()) {
            Ok(Some(schema)) => {
                let generation = self.next_generation();
                info!(generation, summary = %schema.summary(), "restored the prepared schema");
                self.schedule_windows(&schema, generation, now);
                *prepared = Some(Prepared { date: now.date_naive(), schema, generation });
            }
            Ok(None) => {
                *prepared = None;
            }
            Err(error) => warn!("failed to load the prepared schema: {error:#}"),
        }
    }

    /// Build, persist and schedule the day's schema.
    ///
    /// Insufficient price data is retried later; anything else waits for the next daily build.
    #[instrument(skip_all, name = "building the daily schema…", fields(now = %now))]
    pub async fn build_daily(self: &Arc<Self>, now: DateTime<Local>) -> Option<DailyPlan> {
        match self.plan(now).await {
            Ok(plan) => {
                self.install(&plan, now).await;
                Some(plan)
            }
            Err(error) => {
                if let Some(ScheduleError::InsufficientPriceData { .. }) = error.downcast_ref() {
                    let at = now + self.options.insufficient_data_retry;
                    warn!(%at, "{error:#}, retrying later");
                    self.schedule_build_retry(at);
                } else {
                    error!("failed to build the daily schema: {error:#}");
                }
                self.report(format!("planning failed: {error}")).await;
                None
            }
        }
    }

    async fn plan(&self, now: DateTime<Local>) -> Result<DailyPlan> {
        let prices = self.guarded("fetching the prices", self.prices.get_prices()).await?;
        let battery = self.guarded("fetching the battery state", self.battery.get_state()).await?;
        let carry_over = self.carry_over(now.date_naive()).await;
        Planner::builder()
            .today(&prices.today)
            .maybe_tomorrow(prices.tomorrow.as_ref())
            .battery(battery)
            .settings(&self.settings)
            .now(now)
            .carry_over(carry_over)
            .plan()
    }

    /// One-off periods which the previous schema planned for the date.
    async fn carry_over(&self, on: NaiveDate) -> Vec<ChargingPeriod> {
        let Some(previous) = self.prepared.lock().await.clone() else { return Vec::new() };
        if on.checked_sub_days(Days::new(1)) != Some(previous.date) {
            return Vec::new();
        }
        let only_today = EnumSet::only(on.weekday().into());
        let periods: Vec<ChargingPeriod> = previous
            .schema
            .periods
            .into_iter()
            .filter(|period| period.weekdays == only_today)
            .collect();
        if !periods.is_empty() {
            info!(n_periods = periods.len(), "carrying over");
        }
        periods
    }

    async fn install(self: &Arc<Self>, plan: &DailyPlan, now: DateTime<Local>) {
        let generation = {
            let mut prepared = self.prepared.lock().await;
            let generation = self.next_generation();
            self.persist_prepared(now.date_naive(), &plan.schema);
            *prepared = Some(Prepared {
                date: now.date_naive(),
                schema: plan.schema.clone(),
                generation,
            });
            generation
        };
        info!(generation, summary = %plan.schema.summary(), "installed");
        self.report(format!("planned: {}", plan.schema.summary())).await;

        self.schedule_windows(&plan.schema, generation, now);
        if let Some(at) = plan.evening_check_at.filter(|at| *at > now) {
            let this = Arc::clone(self);
            spawn_at(at, "evening check", async move {
                this.check_evening(generation).await;
            });
        }
        if let Some(url) = &self.heartbeat_url
            && let Err(error) = heartbeat::send(url.clone()).await
        {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    fn schedule_build_retry(self: &Arc<Self>, at: DateTime<Local>) {
        let this = Arc::clone(self);
        spawn_at(at, "daily build retry", async move {
            this.build_daily(Local::now()).await;
        });
    }

    fn schedule_daily_build(self: &Arc<Self>, now: DateTime<Local>) {
        let Some(at) = now
            .date_naive()
            .checked_add_days(Days::new(1))
            .and_then(|date| {
                date.and_time(self.options.daily_build_at).and_local_timezone(Local).earliest()
            })
        else {
            error!("failed to schedule the next daily build");
            return;
        };
        let this = Arc::clone(self);
        spawn_at(at, "daily build", async move {
            let now = Local::now();
            this.build_daily(now).await;
            this.schedule_daily_build(now);
        });
    }

    /// Move tonight's discharge to tomorrow morning when that pays off more.
    ///
    /// Holds the prepared schema lock for the whole read-then-mutate sequence.
    #[instrument(skip_all, name = "evening check…", fields(generation = generation))]
    pub async fn check_evening(self: &Arc<Self>, generation: u64) -> Option<EveningDecision> {
        let mut prepared = self.prepared.lock().await;
        let Some(current) = prepared.as_ref().filter(|current| current.generation == generation)
        else {
            info!("superseded");
            return None;
        };
        let (prices, battery) = match tokio::try_join!(
            self.guarded("fetching the prices", self.prices.get_prices()),
            self.guarded("fetching the battery state", self.battery.get_state()),
        ) {
            Ok(inputs) => inputs,
            Err(error) => {
                warn!("keeping the schema: {error:#}");
                return None;
            }
        };
        let decision = EveningShift::builder()
            .schema(&current.schema)
            .today(&prices.today)
            .maybe_tomorrow(prices.tomorrow.as_ref())
            .battery(battery)
            .settings(&self.settings)
            .evaluate();
        if let EveningDecision::Shift { schema, .. } = &decision {
            let generation = self.next_generation();
            let date = current.date;
            self.persist_prepared(date, schema);
            *prepared = Some(Prepared { date, schema: schema.clone(), generation });
            drop(prepared);

            let now = Local::now();
            self.report(format!("discharge moved to the morning: {}", schema.summary())).await;
            self.schedule_windows(schema, generation, now);
        }
        Some(decision)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    async fn current(&self) -> Option<Prepared> {
        self.prepared.lock().await.clone()
    }

    fn persist_prepared(&self, on: NaiveDate, schema: &ChargingSchema) {
        if let Err(error) = self.store.save_prepared(on, schema) {
            warn!("failed to persist the prepared schema: {error:#}");
        }
    }

    /// Await the external call, but no longer than the gateway timeout.
    async fn guarded<T>(&self, what: &str, future: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.options.gateway_timeout, future)
            .await
            .with_context(|| format!("{what} timed out"))?
            .with_context(|| format!("{what} failed"))
    }

    async fn report(&self, status: String) {
        if let Err(error) = self.guarded("updating the status", self.status.set_status(&status)).await {
            warn!("{error:#}");
        }
    }
}
