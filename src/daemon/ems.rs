//! Switching the automatic energy management off around the scheduled periods.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};

use crate::{
    core::{interval::Interval, mode::UserMode, schema::ChargingSchema},
    daemon::{
        ApplyOutcome,
        Daemon,
        retry::next_boundary,
        timer::spawn_at,
    },
    prelude::*,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum WindowState {
    #[display("idle")]
    Idle,

    #[display("awaiting EMS off")]
    AwaitingEmsOff,

    #[display("active")]
    Active,

    #[display("awaiting restore")]
    AwaitingRestore,
}

/// Why the battery could not be taken over from the EMS.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum BlockReason {
    #[display("mode unknown (not configured)")]
    NotConfigured,

    #[display("mode unknown (query failed)")]
    QueryFailed,

    #[display("mode is {_0}")]
    Mode(UserMode),

    #[display("EMS switch unavailable")]
    SwitchFailed,
}

#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum WindowStart {
    /// The window belongs to a schema which has been replaced since.
    Superseded,

    Blocked(BlockReason),

    Applied(ApplyOutcome),
}

/// One EMS-off window as tracked by its timer task.
#[derive(Debug)]
pub struct Window {
    pub interval: Interval,
    pub generation: u64,
    pub state: WindowState,
}

impl Window {
    pub const fn new(interval: Interval, generation: u64) -> Self {
        Self { interval, generation, state: WindowState::Idle }
    }

    fn transition(&mut self, state: WindowState) {
        debug!(interval = %self.interval, from = %self.state, to = %state, "transition");
        self.state = state;
    }
}

impl Daemon {
    /// Spawn a timer task per derived window of the schema.
    pub(super) fn schedule_windows(
        self: &Arc<Self>,
        schema: &ChargingSchema,
        generation: u64,
        now: DateTime<Local>,
    ) {
        let windows = self.options.buffers.derive_windows(schema, now);
        info!(n_windows = windows.len(), generation, "scheduling the EMS windows");
        for interval in windows {
            let this = Arc::clone(self);
            spawn_at(interval.start, "EMS window", async move {
                let mut window = Window::new(interval, generation);
                let start = this.on_window_start(&mut window, Local::now()).await;
                info!(%interval, ?start, "window started");
                if start == WindowStart::Superseded {
                    return;
                }
                tokio::time::sleep((interval.end - Local::now()).to_std().unwrap_or_default())
                    .await;
                this.on_window_end(&mut window, Local::now()).await;
            });
        }
    }

    #[instrument(skip_all, name = "starting the EMS window…", fields(interval = %window.interval))]
    pub async fn on_window_start(
        self: &Arc<Self>,
        window: &mut Window,
        now: DateTime<Local>,
    ) -> WindowStart {
        if !self.is_current(window.generation) {
            info!(generation = window.generation, "superseded");
            return WindowStart::Superseded;
        }
        window.transition(WindowState::AwaitingEmsOff);
        match self.take_over_and_apply(now).await {
            WindowStart::Applied(outcome) => {
                window.transition(WindowState::Active);
                WindowStart::Applied(outcome)
            }
            other => other,
        }
    }

    /// Turn the EMS back on, unless another window of the current schema still covers `now`.
    #[instrument(skip_all, name = "ending the EMS window…", fields(interval = %window.interval))]
    pub async fn on_window_end(self: &Arc<Self>, window: &mut Window, now: DateTime<Local>) {
        window.transition(WindowState::AwaitingRestore);
        if self.active_window(now).await.is_some() {
            info!("another window is still active");
        } else {
            self.restore_ems().await;
        }
        window.transition(WindowState::Idle);
    }

    /// Current schema window covering `now`, if any.
    async fn active_window(&self, now: DateTime<Local>) -> Option<Interval> {
        let prepared = self.current().await?;
        self.options
            .buffers
            .derive_windows(&prepared.schema, now)
            .into_iter()
            .find(|window| window.start <= now + TimeDelta::seconds(1))
    }

    pub(super) async fn take_over_and_apply(self: &Arc<Self>, now: DateTime<Local>) -> WindowStart {
        if let Err(reason) = self.take_over_ems().await {
            warn!(%reason, "blocked");
            self.report(format!("blocked: {reason}")).await;
            self.schedule_retry(now);
            return WindowStart::Blocked(reason);
        }
        let Some(prepared) = self.current().await else {
            warn!("no prepared schema");
            return WindowStart::Superseded;
        };
        WindowStart::Applied(self.apply(&prepared.schema, now).await)
    }

    /// Make sure the EMS is off, checking the battery mode before switching it off.
    async fn take_over_ems(&self) -> Result<(), BlockReason> {
        let is_on = match self.guarded("reading the EMS switch", self.ems_switch.is_on()).await {
            Ok(is_on) => is_on,
            Err(error) => {
                warn!("{error:#}");
                return Err(BlockReason::SwitchFailed);
            }
        };
        if !is_on {
            debug!("EMS is already off");
            return Ok(());
        }
        let Some(control) = &self.control else {
            return Err(BlockReason::NotConfigured);
        };
        let mode = match self.guarded("querying the mode", control.get_user_mode()).await {
            Ok(mode) => mode,
            Err(error) => {
                warn!("{error:#}");
                return Err(BlockReason::QueryFailed);
            }
        };
        self.remember_mode(mode);
        if mode.is_blocking() {
            return Err(BlockReason::Mode(mode));
        }
        if self.options.simulate {
            info!(%mode, "simulating: would switch the EMS off");
            return Ok(());
        }
        if let Err(error) = self.guarded("switching the EMS off", self.ems_switch.turn(false)).await
        {
            warn!("{error:#}");
            return Err(BlockReason::SwitchFailed);
        }
        if !self.options.settle_delay.is_zero() {
            tokio::time::sleep(self.options.settle_delay).await;
        }
        Ok(())
    }

    async fn restore_ems(&self) {
        match self.guarded("reading the EMS switch", self.ems_switch.is_on()).await {
            Ok(true) => debug!("EMS is already on"),
            Ok(false) if self.options.simulate => info!("simulating: would switch the EMS on"),
            Ok(false) => {
                if let Err(error) =
                    self.guarded("switching the EMS on", self.ems_switch.turn(true)).await
                {
                    error!("{error:#}");
                    return;
                }
                info!("EMS restored");
                self.report("EMS restored".to_owned()).await;
            }
            Err(error) => error!("{error:#}"),
        }
    }

    pub(super) fn remember_mode(&self, mode: UserMode) {
        if let Err(error) = self.store.save_last_known_mode(mode) {
            warn!("failed to persist the mode: {error:#}");
        }
    }

    /// Retry at the next 5-minute boundary, unless a retry is already pending.
    pub(super) fn schedule_retry(self: &Arc<Self>, now: DateTime<Local>) {
        if !self.retry.try_acquire() {
            info!("a retry is already scheduled");
            return;
        }
        let at = match next_boundary(now) {
            Ok(at) => at,
            Err(error) => {
                error!("{error:#}");
                self.retry.release();
                return;
            }
        };
        info!(%at, "scheduling a retry");
        let this = Arc::clone(self);
        spawn_at(at, "retry", async move {
            this.retry.release();
            this.on_retry(Local::now()).await;
        });
    }

    #[instrument(skip_all, name = "retrying…")]
    async fn on_retry(self: &Arc<Self>, now: DateTime<Local>) {
        if self.active_window(now).await.is_none() {
            info!("no active window anymore");
            return;
        }
        let start = self.take_over_and_apply(now).await;
        info!(?start, "retried");
    }
}
