use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    api::{ems::StatusSink, home_assistant::Api},
    prelude::*,
};

/// Text helper showing the current status on the dashboard.
pub struct InputText {
    api: Arc<Api>,
    entity_id: String,
}

impl InputText {
    /// Home Assistant rejects longer values.
    const MAX_LEN: usize = 255;

    pub const fn new(api: Arc<Api>, entity_id: String) -> Self {
        Self { api, entity_id }
    }

    fn truncate(status: &str) -> &str {
        match status.char_indices().nth(Self::MAX_LEN) {
            Some((index, _)) => &status[..index],
            None => status,
        }
    }
}

#[async_trait]
impl StatusSink for InputText {
    #[instrument(skip_all, fields(entity_id = %self.entity_id))]
    async fn set_status(&self, status: &str) -> Result {
        #[derive(Serialize)]
        struct SetValue<'a> {
            entity_id: &'a str,
            value: &'a str,
        }

        debug!(status, "updating…");
        self.api
            .call_service(
                "input_text",
                "set_value",
                &SetValue { entity_id: &self.entity_id, value: Self::truncate(status) },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(InputText::truncate("charging"), "charging");
        let long = "é".repeat(300);
        assert_eq!(InputText::truncate(&long).chars().count(), 255);
    }
}
