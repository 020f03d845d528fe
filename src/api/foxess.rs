mod response;
mod schedule;
pub mod work_mode;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use itertools::Itertools;
use reqwest::{
    Client,
    Method,
    header::{HeaderMap, HeaderValue},
};
use response::Response;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use self::schedule::{Schedule, TimeSlot, TimeSlotSequence, WorkingMode};
use crate::{
    api::battery::BatteryControl,
    core::{mode::UserMode, period::ChargingPeriod},
    prelude::*,
    quantity::{Quantity, percent::Percent},
};

pub struct Api {
    client: Client,
    api_key: String,
    serial_number: String,
    min_soc: Percent,
}

impl Api {
    /// Minimal state of charge written into the time slots unless overridden.
    const DEFAULT_MIN_SOC: Percent = Quantity(10.0);

    pub fn try_new(api_key: String, serial_number: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Lang", HeaderValue::from_static("en"));
        headers.insert("Token", HeaderValue::from_str(&api_key)?);
        let client = Client::builder()
            .user_agent("vixen")
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_key, serial_number, min_soc: Self::DEFAULT_MIN_SOC })
    }

    #[must_use]
    pub const fn with_min_soc(mut self, min_soc: Percent) -> Self {
        self.min_soc = min_soc;
        self
    }

    #[instrument(skip_all, fields(serial_number = %self.serial_number))]
    pub async fn get_schedule(&self) -> Result<Schedule> {
        #[derive(Serialize)]
        struct GetScheduleRequest<'a> {
            #[serde(rename = "deviceSN")]
            serial_number: &'a str,
        }

        self.call(
            Method::POST,
            "op/v1/device/scheduler/get",
            (),
            &GetScheduleRequest { serial_number: &self.serial_number },
        )
        .await
        .context("failed to get the schedule")
    }

    #[instrument(skip_all, fields(serial_number = %self.serial_number))]
    pub async fn set_schedule(&self, groups: &TimeSlotSequence) -> Result {
        info!(n_groups = groups.len(), "setting…");

        #[derive(Serialize)]
        struct SetScheduleRequest<'a> {
            #[serde(rename = "deviceSN")]
            serial_number: &'a str,

            #[serde(rename = "groups")]
            groups: &'a TimeSlotSequence,
        }

        self.call(
            Method::POST,
            "op/v1/device/scheduler/enable",
            (),
            SetScheduleRequest { serial_number: &self.serial_number, groups },
        )
        .await
    }

    /// Raw `WorkMode` device setting.
    #[instrument(skip_all, fields(serial_number = %self.serial_number))]
    pub async fn get_work_mode(&self) -> Result<String> {
        #[derive(Serialize)]
        struct GetSettingRequest<'a> {
            #[serde(rename = "sn")]
            serial_number: &'a str,

            key: &'a str,
        }

        #[derive(Deserialize)]
        struct Setting {
            value: String,
        }

        let setting: Setting = self
            .call(
                Method::POST,
                "op/v0/device/setting/get",
                (),
                GetSettingRequest { serial_number: &self.serial_number, key: "WorkMode" },
            )
            .await
            .context("failed to get the work mode")?;
        Ok(setting.value)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    async fn call<Q: Serialize, B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Q,
        body: B,
    ) -> Result<R> {
        let (timestamp, signature) = self.build_signature(path);
        let response = Result::<serde_json::Value>::from(
            self.client
                .request(method, format!("https://www.foxesscloud.com/{path}"))
                .header("Timestamp", timestamp)
                .header("Signature", signature)
                .query(&query)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("failed to call `{path}`"))?
                .error_for_status()
                .with_context(|| format!("`{path}` failed"))?
                .json::<Response>()
                .await
                .with_context(|| format!("failed to deserialize `{path}` response JSON"))?,
        )?;
        debug!(?response, "call succeeded");
        serde_json::from_value(response)
            .with_context(|| format!("failed to deserialize `{path}` response structure"))
    }

    /// The digest covers the path, the token and the timestamp, separated by literal `\r\n`.
    fn build_signature(&self, path: &str) -> (String, String) {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let digest =
            md5::compute(format!(r"/{path}\r\n{0}\r\n{timestamp}", self.api_key).as_bytes());
        (timestamp, format!("{digest:x}"))
    }
}

#[async_trait]
impl BatteryControl for Api {
    #[instrument(skip_all, name = "saving the schedule…", fields(n_periods = periods.len()))]
    async fn save_schedule(&self, periods: &[ChargingPeriod]) -> Result<bool> {
        let wire = periods.iter().map(|period| format!("{}:{period}", period.kind)).join(",");
        info!(%wire, "converting…");
        let groups = TimeSlotSequence::from_periods(periods, Local::now(), self.min_soc)?;
        if groups.is_empty() {
            warn!("no periods within the next 24 hours");
            return Ok(false);
        }
        self.set_schedule(&groups).await?;
        Ok(true)
    }

    #[instrument(skip_all, name = "querying the work mode…")]
    async fn get_user_mode(&self) -> Result<UserMode> {
        let raw = self.get_work_mode().await?;
        let mode = work_mode::parse(&raw);
        info!(%raw, %mode, "fetched");
        Ok(mode)
    }
}
