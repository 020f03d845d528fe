mod battery;
mod input_text;
mod prices;
mod switch;

use chrono::{DateTime, Local};
use reqwest::{
    Client,
    ClientBuilder,
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use self::{
    battery::BatterySensor,
    input_text::InputText,
    prices::PriceSensor,
    switch::Switch,
};
use crate::prelude::*;

pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    pub fn try_new(access_token: &str, base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client = ClientBuilder::new()
            .user_agent("vixen")
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url })
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(entity_id = entity_id))]
    pub async fn get_state<A: DeserializeOwned>(&self, entity_id: &str) -> Result<EntityState<A>> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .push("states")
            .push(entity_id);
        let state: EntityState<A> = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch `{entity_id}`"))?
            .error_for_status()
            .with_context(|| format!("failed to fetch `{entity_id}`"))?
            .json()
            .await
            .with_context(|| format!("failed to deserialize `{entity_id}` state"))?;
        debug!(state = %state.value, last_changed_at = %state.last_changed_at, "fetched");
        Ok(state)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(domain = domain, service = service))]
    pub async fn call_service<B: Serialize + Sync>(
        &self,
        domain: &str,
        service: &str,
        body: &B,
    ) -> Result {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .push("services")
            .push(domain)
            .push(service);
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to call `{domain}.{service}`"))?
            .error_for_status()
            .with_context(|| format!("`{domain}.{service}` failed"))?;
        Ok(())
    }
}

/// Entity state as returned by `/api/states/<entity_id>`.
#[must_use]
#[derive(Deserialize)]
pub struct EntityState<A> {
    #[serde(rename = "state")]
    pub value: String,

    pub attributes: A,

    #[serde(rename = "last_changed")]
    pub last_changed_at: DateTime<Local>,
}

impl<A> EntityState<A> {
    pub fn is_available(&self) -> bool {
        !matches!(self.value.as_str(), "unavailable" | "unknown")
    }
}

#[derive(Serialize)]
struct EntityTarget<'a> {
    entity_id: &'a str,
}
