use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};
use clap::Parser;

use crate::{core::ems_window::EmsBuffers, daemon::Options};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct EmsArgs {
    /// Switch the EMS off this long before a period starts.
    #[clap(long = "ems-prep-minutes", default_value = "2", env = "EMS_PREP_MINUTES")]
    pub prep_minutes: i64,

    /// Switch the EMS back on this long after a period ends.
    #[clap(long = "ems-restore-minutes", default_value = "2", env = "EMS_RESTORE_MINUTES")]
    pub restore_minutes: i64,

    /// Pause after switching the EMS off, before applying the schedule.
    #[clap(long = "ems-settle-seconds", default_value = "5", env = "EMS_SETTLE_SECONDS")]
    pub settle_seconds: u64,

    /// Timeout of every gateway and Home Assistant call.
    #[clap(long = "gateway-timeout-seconds", default_value = "30", env = "GATEWAY_TIMEOUT_SECONDS")]
    pub gateway_timeout_seconds: u64,

    #[clap(long = "daily-build-at", default_value = "00:05", env = "DAILY_BUILD_AT")]
    pub daily_build_at: NaiveTime,

    /// Retry the daily build this long after the prices turned out insufficient.
    #[clap(
        long = "insufficient-data-retry-minutes",
        default_value = "10",
        env = "INSUFFICIENT_DATA_RETRY_MINUTES"
    )]
    pub insufficient_data_retry_minutes: i64,
}

impl EmsArgs {
    pub fn buffers(&self) -> EmsBuffers {
        EmsBuffers {
            prep: TimeDelta::minutes(self.prep_minutes),
            restore: TimeDelta::minutes(self.restore_minutes),
        }
    }

    pub fn options(&self, simulate: bool) -> Options {
        Options {
            simulate,
            buffers: self.buffers(),
            settle_delay: Duration::from_secs(self.settle_seconds),
            gateway_timeout: Duration::from_secs(self.gateway_timeout_seconds),
            daily_build_at: self.daily_build_at,
            insufficient_data_retry: TimeDelta::minutes(self.insufficient_data_retry_minutes),
        }
    }
}
