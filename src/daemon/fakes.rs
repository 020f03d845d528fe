//! In-memory collaborators for the daemon tests.

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};

use crate::{
    api::{
        battery::{BatteryControl, BatteryMonitor},
        ems::{EmsSwitch, StatusSink},
        price_feed::{DailyPrices, PriceFeed},
    },
    core::{
        battery::BatteryState,
        interval::Interval,
        mode::UserMode,
        period::{ChargingPeriod, PeriodKind},
        schema::{ChargingSchema, Source},
        series::PriceSeries,
        settings::Settings,
    },
    daemon::{Daemon, Options, Prepared},
    prelude::*,
    quantity::{energy::WattHours, percent::Percent, power::Watts},
    state::StateStore,
};

pub fn schema_at(start: DateTime<Local>, end: DateTime<Local>) -> ChargingSchema {
    let periods =
        ChargingPeriod::from_interval(PeriodKind::Charge, Interval::new(start, end), Watts::from(5000.0));
    ChargingSchema::new(periods, start, Source::DailyPlan)
}

pub struct FakePrices(pub Mutex<DailyPrices>);

#[async_trait]
impl PriceFeed for FakePrices {
    async fn get_prices(&self) -> Result<DailyPrices> {
        Ok(self.0.lock().unwrap().clone())
    }
}

pub struct FakeBattery(Mutex<BatteryState>);

impl FakeBattery {
    pub fn set_state_of_charge(&self, state_of_charge: Percent) {
        self.0.lock().unwrap().state_of_charge = state_of_charge;
    }
}

#[async_trait]
impl BatteryMonitor for FakeBattery {
    async fn get_state(&self) -> Result<BatteryState> {
        Ok(*self.0.lock().unwrap())
    }
}

#[derive(Default)]
pub struct FakeControl {
    /// `None` makes the query fail.
    pub mode: Mutex<Option<UserMode>>,

    saves: Mutex<Vec<Vec<ChargingPeriod>>>,
    fails: AtomicBool,
}

impl FakeControl {
    pub fn n_saves(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_save(&self) -> Option<Vec<ChargingPeriod>> {
        self.saves.lock().unwrap().last().cloned()
    }

    pub fn fail_saves(&self) {
        self.fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BatteryControl for FakeControl {
    async fn save_schedule(&self, periods: &[ChargingPeriod]) -> Result<bool> {
        if self.fails.load(Ordering::SeqCst) {
            bail!("connection reset");
        }
        self.saves.lock().unwrap().push(periods.to_vec());
        Ok(true)
    }

    async fn get_user_mode(&self) -> Result<UserMode> {
        (*self.mode.lock().unwrap()).context("query failed")
    }
}

pub struct FakeSwitch {
    pub on: AtomicBool,
    pub n_turns: AtomicUsize,
}

#[async_trait]
impl EmsSwitch for FakeSwitch {
    async fn is_on(&self) -> Result<bool> {
        Ok(self.on.load(Ordering::SeqCst))
    }

    async fn turn(&self, on: bool) -> Result {
        self.n_turns.fetch_add(1, Ordering::SeqCst);
        self.on.store(on, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStatus(Mutex<Vec<String>>);

impl FakeStatus {
    pub fn last(&self) -> Option<String> {
        self.0.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl StatusSink for FakeStatus {
    async fn set_status(&self, status: &str) -> Result {
        self.0.lock().unwrap().push(status.to_owned());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub prepared: Mutex<Option<(NaiveDate, ChargingSchema)>>,
    pub applied: Mutex<Option<ChargingSchema>>,
    pub mode: Mutex<Option<UserMode>>,
}

impl StateStore for MemoryStore {
    fn load_prepared(&self, on: NaiveDate) -> Result<Option<ChargingSchema>> {
        Ok(self
            .prepared
            .lock()
            .unwrap()
            .clone()
            .filter(|(date, _)| *date == on)
            .map(|(_, schema)| schema))
    }

    fn save_prepared(&self, on: NaiveDate, schema: &ChargingSchema) -> Result {
        *self.prepared.lock().unwrap() = Some((on, schema.clone()));
        Ok(())
    }

    fn load_applied(&self) -> Result<Option<ChargingSchema>> {
        Ok(self.applied.lock().unwrap().clone())
    }

    fn save_applied(&self, schema: &ChargingSchema) -> Result {
        *self.applied.lock().unwrap() = Some(schema.clone());
        Ok(())
    }

    fn save_last_known_mode(&self, mode: UserMode) -> Result {
        *self.mode.lock().unwrap() = Some(mode);
        Ok(())
    }
}

pub struct Fakes {
    pub prices: Arc<FakePrices>,
    pub battery: Arc<FakeBattery>,
    pub control: Arc<FakeControl>,
    pub switch: Arc<FakeSwitch>,
    pub status: Arc<FakeStatus>,
    pub store: Arc<MemoryStore>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            prices: Arc::new(FakePrices(Mutex::new(DailyPrices {
                today: PriceSeries::from_iter([]),
                tomorrow: None,
            }))),
            battery: Arc::new(FakeBattery(Mutex::new(BatteryState {
                state_of_charge: Percent::from(50.0),
                capacity: WattHours::from(10_000.0),
                max_inverter_power: Watts::from(5000.0),
            }))),
            control: Arc::new(FakeControl {
                mode: Mutex::new(Some(UserMode::SelfUse)),
                ..FakeControl::default()
            }),
            switch: Arc::new(FakeSwitch { on: AtomicBool::new(true), n_turns: AtomicUsize::new(0) }),
            status: Arc::new(FakeStatus::default()),
            store: Arc::new(MemoryStore::default()),
        }
    }
}

impl Fakes {
    pub fn set_prices(&self, today: PriceSeries, tomorrow: Option<PriceSeries>) {
        *self.prices.0.lock().unwrap() = DailyPrices { today, tomorrow };
    }

    pub fn daemon(&self) -> Arc<Daemon> {
        self.build(Some(self.control.clone()), false)
    }

    pub fn daemon_without_control(&self) -> Arc<Daemon> {
        self.build(None, false)
    }

    pub fn simulated_daemon(&self) -> Arc<Daemon> {
        self.build(Some(self.control.clone()), true)
    }

    fn build(&self, control: Option<Arc<FakeControl>>, simulate: bool) -> Arc<Daemon> {
        let options = Options {
            simulate,
            settle_delay: std::time::Duration::ZERO,
            ..Options::default()
        };
        Arc::new(
            Daemon::builder()
                .settings(Settings::default())
                .options(options)
                .prices(self.prices.clone())
                .battery(self.battery.clone())
                .maybe_control(control.map(|control| control as Arc<dyn BatteryControl>))
                .ems_switch(self.switch.clone())
                .status(self.status.clone())
                .store(self.store.clone())
                .build(),
        )
    }

    /// Install the schema as prepared for its creation date, returning its generation.
    pub async fn prepare(&self, daemon: &Daemon, schema: ChargingSchema) -> u64 {
        let generation = daemon.next_generation();
        *daemon.prepared.lock().await =
            Some(Prepared { date: schema.created_at.date_naive(), schema, generation });
        generation
    }
}
