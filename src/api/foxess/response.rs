use serde::Deserialize;

use crate::prelude::*;

/// Generic API response.
///
/// The result is read into [`serde_json::Value`] first in order to log it,
/// and only then parsed into the actual structure.
#[derive(Deserialize)]
pub struct Response {
    /// Error code (when the result is not equal to zero, the request failed).
    #[serde(rename = "errno")]
    error_code: i32,

    #[serde(rename = "msg")]
    message: Option<String>,

    #[serde(rename = "result", default)]
    result: serde_json::Value,
}

impl From<Response> for Result<serde_json::Value> {
    fn from(response: Response) -> Self {
        if response.error_code == 0 {
            Ok(response.result)
        } else if let Some(message) = response.message {
            bail!(
                r#"FoxESS Cloud error {error_code} ("{message}")"#,
                error_code = response.error_code,
            )
        } else {
            bail!("FoxESS Cloud error {error_code}", error_code = response.error_code)
        }
    }
}
