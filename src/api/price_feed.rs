use async_trait::async_trait;

use crate::{core::series::PriceSeries, prelude::*};

/// Today's prices and, once published, tomorrow's.
#[must_use]
#[derive(Clone, Debug)]
pub struct DailyPrices {
    pub today: PriceSeries,
    pub tomorrow: Option<PriceSeries>,
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn get_prices(&self) -> Result<DailyPrices>;
}
