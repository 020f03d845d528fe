use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, DurationRound, Local, TimeDelta};

use crate::prelude::*;

const BOUNDARY: TimeDelta = TimeDelta::minutes(5);

/// Next 5-minute clock boundary strictly after `now`.
pub fn next_boundary(now: DateTime<Local>) -> Result<DateTime<Local>> {
    let rounded = now.duration_trunc(BOUNDARY).context("failed to round the time")?;
    Ok(rounded + BOUNDARY)
}

/// Single in-flight retry, shared by everything that can be blocked by the battery mode.
#[derive(Debug, Default)]
pub struct RetryGuard(AtomicBool);

impl RetryGuard {
    /// Returns `true` if the caller now owns the retry slot.
    pub fn try_acquire(&self) -> bool {
        self.0.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
