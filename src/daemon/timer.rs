use std::future::Future;

use chrono::{DateTime, Local};
use tokio::task::JoinHandle;

use crate::prelude::*;

/// Run the task at the wall-clock time, or right away if the time has passed.
pub fn spawn_at<F>(at: DateTime<Local>, name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let delay = (at - Local::now()).to_std().unwrap_or_default();
    debug!(name, %at, ?delay, "scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        debug!(name, "firing…");
        task.await;
    })
}
