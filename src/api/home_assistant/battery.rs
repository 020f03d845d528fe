use std::sync::Arc;

use async_trait::async_trait;
use serde::de::IgnoredAny;

use crate::{
    api::{battery::BatteryMonitor, home_assistant::Api},
    core::battery::BatteryState,
    prelude::*,
    quantity::{energy::WattHours, percent::Percent, power::Watts},
};

/// State of charge sensor, combined with the static battery parameters.
pub struct BatterySensor {
    api: Arc<Api>,
    entity_id: String,
    capacity: WattHours,
    max_inverter_power: Watts,
}

impl BatterySensor {
    pub const fn new(
        api: Arc<Api>,
        entity_id: String,
        capacity: WattHours,
        max_inverter_power: Watts,
    ) -> Self {
        Self { api, entity_id, capacity, max_inverter_power }
    }
}

#[async_trait]
impl BatteryMonitor for BatterySensor {
    #[instrument(skip_all, name = "fetching the battery state…", fields(entity_id = %self.entity_id))]
    async fn get_state(&self) -> Result<BatteryState> {
        let state = self.api.get_state::<IgnoredAny>(&self.entity_id).await?;
        ensure!(state.is_available(), "`{}` is `{}`", self.entity_id, state.value);
        let state_of_charge: Percent = state
            .value
            .parse()
            .with_context(|| format!("`{}` is not a number", state.value))?;
        ensure!(
            (Percent::ZERO..=Percent::FULL).contains(&state_of_charge),
            "state of charge {state_of_charge} is out of range",
        );
        info!(%state_of_charge, "fetched");
        Ok(BatteryState {
            state_of_charge,
            capacity: self.capacity,
            max_inverter_power: self.max_inverter_power,
        })
    }
}
