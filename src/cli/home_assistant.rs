use std::sync::Arc;

use clap::Parser;
use reqwest::Url;

use crate::{
    api::home_assistant::{Api, BatterySensor, InputText, PriceSensor, Switch},
    cli::battery::BatteryArgs,
    prelude::*,
};

#[derive(Parser)]
pub struct HomeAssistantConnectionArgs {
    /// Home Assistant API access token.
    #[clap(long = "home-assistant-access-token", env = "HOME_ASSISTANT_ACCESS_TOKEN")]
    pub access_token: String,

    /// Home Assistant API base URL. For example: `http://localhost:8123/api`.
    #[clap(long = "home-assistant-api-base-url", env = "HOME_ASSISTANT_API_BASE_URL")]
    pub base_url: Url,
}

impl HomeAssistantConnectionArgs {
    pub fn try_new_api(&self) -> Result<Arc<Api>> {
        Ok(Arc::new(Api::try_new(&self.access_token, self.base_url.clone())?))
    }
}

#[derive(Parser)]
pub struct HomeAssistantArgs {
    #[clap(flatten)]
    pub connection: HomeAssistantConnectionArgs,

    /// Nord Pool price sensor with `raw_today` and `raw_tomorrow` attributes.
    #[clap(long = "price-entity-id", env = "PRICE_ENTITY_ID")]
    pub price_entity_id: String,

    /// Battery state of charge sensor, in percent.
    #[clap(long = "soc-entity-id", env = "SOC_ENTITY_ID")]
    pub soc_entity_id: String,

    /// Switch of the automatic energy management.
    #[clap(long = "ems-entity-id", env = "EMS_ENTITY_ID")]
    pub ems_entity_id: String,

    /// Text helper for the status line.
    #[clap(long = "status-entity-id", env = "STATUS_ENTITY_ID")]
    pub status_entity_id: String,
}

/// All the Home Assistant backed collaborators, sharing one client.
pub struct HomeAssistant {
    pub prices: PriceSensor,
    pub battery: BatterySensor,
    pub ems_switch: Switch,
    pub status: InputText,
}

impl HomeAssistantArgs {
    pub fn connect(&self, battery: &BatteryArgs) -> Result<HomeAssistant> {
        let api = self.connection.try_new_api()?;
        Ok(HomeAssistant {
            prices: PriceSensor::new(api.clone(), self.price_entity_id.clone()),
            battery: BatterySensor::new(
                api.clone(),
                self.soc_entity_id.clone(),
                battery.capacity,
                battery.max_inverter_power,
            ),
            ems_switch: Switch::new(api.clone(), self.ems_entity_id.clone()),
            status: InputText::new(api, self.status_entity_id.clone()),
        })
    }
}
