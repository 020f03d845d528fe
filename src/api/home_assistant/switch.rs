use std::sync::Arc;

use async_trait::async_trait;
use serde::de::IgnoredAny;

use crate::{
    api::{
        ems::EmsSwitch,
        home_assistant::{Api, EntityTarget},
    },
    prelude::*,
};

pub struct Switch {
    api: Arc<Api>,
    entity_id: String,
}

impl Switch {
    pub const fn new(api: Arc<Api>, entity_id: String) -> Self {
        Self { api, entity_id }
    }
}

#[async_trait]
impl EmsSwitch for Switch {
    #[instrument(skip_all, fields(entity_id = %self.entity_id))]
    async fn is_on(&self) -> Result<bool> {
        let state = self.api.get_state::<IgnoredAny>(&self.entity_id).await?;
        match state.value.as_str() {
            "on" => Ok(true),
            "off" => Ok(false),
            other => bail!("`{}` is `{other}`", self.entity_id),
        }
    }

    #[instrument(skip_all, fields(entity_id = %self.entity_id, on = on))]
    async fn turn(&self, on: bool) -> Result {
        info!("switching…");
        let service = if on { "turn_on" } else { "turn_off" };
        self.api.call_service("switch", service, &EntityTarget { entity_id: &self.entity_id }).await
    }
}
