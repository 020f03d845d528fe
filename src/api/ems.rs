use async_trait::async_trait;

use crate::prelude::*;

/// On/off switch of the automatic energy management.
#[async_trait]
pub trait EmsSwitch: Send + Sync {
    async fn is_on(&self) -> Result<bool>;

    async fn turn(&self, on: bool) -> Result;
}

/// Human-readable status line, updated on notable transitions.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(&self, status: &str) -> Result;
}
