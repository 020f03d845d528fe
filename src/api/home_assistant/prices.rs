use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_with::serde_as;

use crate::{
    api::{
        home_assistant::Api,
        price_feed::{DailyPrices, PriceFeed},
    },
    core::series::PriceSeries,
    prelude::*,
    quantity::rate::Rate,
};

/// Nord Pool–style sensor with the raw hourly prices in its attributes.
pub struct PriceSensor {
    api: Arc<Api>,
    entity_id: String,
}

impl PriceSensor {
    pub const fn new(api: Arc<Api>, entity_id: String) -> Self {
        Self { api, entity_id }
    }
}

#[async_trait]
impl PriceFeed for PriceSensor {
    #[instrument(skip_all, name = "fetching the prices…", fields(entity_id = %self.entity_id))]
    async fn get_prices(&self) -> Result<DailyPrices> {
        let attributes = self.api.get_state::<PriceAttributes>(&self.entity_id).await?.attributes;
        let prices = DailyPrices::from(attributes);
        info!(
            n_today = prices.today.len(),
            n_tomorrow = prices.tomorrow.as_ref().map_or(0, PriceSeries::len),
            "fetched",
        );
        Ok(prices)
    }
}

#[serde_as]
#[derive(Deserialize)]
struct PriceAttributes {
    #[serde_as(as = "serde_with::VecSkipError<_>")]
    #[serde(default)]
    raw_today: Vec<RawPrice>,

    #[serde_as(as = "serde_with::VecSkipError<_>")]
    #[serde(default)]
    raw_tomorrow: Vec<RawPrice>,
}

#[derive(Deserialize)]
struct RawPrice {
    start: DateTime<Local>,
    value: Rate,
}

impl From<PriceAttributes> for DailyPrices {
    fn from(attributes: PriceAttributes) -> Self {
        let collect = |raw: Vec<RawPrice>| -> PriceSeries {
            raw.into_iter().map(|price| (price.start, price.value)).collect()
        };
        let tomorrow = collect(attributes.raw_tomorrow);
        Self {
            today: collect(attributes.raw_today),
            tomorrow: if tomorrow.is_empty() { None } else { Some(tomorrow) },
        }
    }
}
