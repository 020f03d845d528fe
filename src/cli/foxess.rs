use clap::Parser;

use crate::{api::foxess, prelude::*, quantity::percent::Percent};

/// FoxESS Cloud credentials, the gateway is not configured without them.
#[derive(Parser)]
pub struct FoxEssApiArgs {
    #[clap(long = "fox-ess-api-key", env = "FOX_ESS_API_KEY")]
    pub api_key: Option<String>,

    #[clap(long = "fox-ess-serial-number", alias = "serial", env = "FOX_ESS_SERIAL_NUMBER")]
    pub serial_number: Option<String>,
}

impl FoxEssApiArgs {
    pub fn try_new_api(&self, min_soc: Percent) -> Result<Option<foxess::Api>> {
        match (&self.api_key, &self.serial_number) {
            (Some(api_key), Some(serial_number)) => Ok(Some(
                foxess::Api::try_new(api_key.clone(), serial_number.clone())?
                    .with_min_soc(min_soc),
            )),
            (None, None) => {
                warn!("FoxESS Cloud is not configured");
                Ok(None)
            }
            _ => bail!("both FoxESS Cloud API key and serial number are required"),
        }
    }
}
