use async_trait::async_trait;

use crate::{
    core::{battery::BatteryState, mode::UserMode, period::ChargingPeriod},
    prelude::*,
};

#[async_trait]
pub trait BatteryMonitor: Send + Sync {
    /// Read the live battery state.
    async fn get_state(&self) -> Result<BatteryState>;
}

/// Vendor gateway which actually steers the battery.
#[async_trait]
pub trait BatteryControl: Send + Sync {
    /// Replace the battery schedule, periods are already in the gateway order.
    ///
    /// Returns `false` when the gateway has accepted the call but refused the schedule.
    async fn save_schedule(&self, periods: &[ChargingPeriod]) -> Result<bool>;

    async fn get_user_mode(&self) -> Result<UserMode>;
}
