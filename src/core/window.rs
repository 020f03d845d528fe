//! Cheapest and dearest contiguous price windows.

use chrono::TimeDelta;

use crate::{
    core::{error::ScheduleError, interval::Interval, series::PriceSeries},
    prelude::*,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Extreme {
    Lowest,
    Highest,
}

impl Extreme {
    /// Strict comparison, so that the earliest candidate wins on ties.
    fn is_better(self, candidate: f64, best: f64) -> bool {
        match self {
            Self::Lowest => candidate < best,
            Self::Highest => candidate > best,
        }
    }
}

/// Find the window of the given duration with the lowest total price.
pub fn lowest_window(series: &PriceSeries, duration_hours: f64) -> Result<Interval> {
    find_window(series, duration_hours, Extreme::Lowest)
}

/// Find the window of the given duration with the highest total price.
pub fn highest_window(series: &PriceSeries, duration_hours: f64) -> Result<Interval> {
    find_window(series, duration_hours, Extreme::Highest)
}

#[instrument(skip(series), level = Level::DEBUG, fields(n_points = series.len()))]
fn find_window(series: &PriceSeries, duration_hours: f64, extreme: Extreme) -> Result<Interval> {
    if series.is_empty() {
        bail!(ScheduleError::InvalidInput { reason: "empty price series" });
    }
    if !duration_hours.is_finite() || duration_hours <= 0.0 {
        bail!(ScheduleError::InvalidInput { reason: "window duration must be positive" });
    }

    #[expect(clippy::cast_possible_truncation)]
    let duration = TimeDelta::minutes((duration_hours * 60.0).ceil() as i64);
    let step = series.step();

    if duration <= step {
        // Shorter than one interval: just the extreme single one.
        let mut best = 0;
        for index in 1..series.len() {
            if extreme.is_better(series[index].1.0, series[best].1.0) {
                best = index;
            }
        }
        return Ok(Interval::starting_at(series[best].0, duration));
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n_intervals = (duration.as_seconds_f64() / step.as_seconds_f64()).ceil() as usize;
    if n_intervals >= series.len() {
        let span = series.span().context("empty price series")?;
        debug!(%span, "the series is not longer than the window");
        return Ok(span);
    }

    let mut sum: f64 = series.iter().take(n_intervals).map(|(_, rate)| rate.0).sum();
    let (mut best_index, mut best_sum) = (0, sum);
    for index in 1..=(series.len() - n_intervals) {
        sum += series[index + n_intervals - 1].1.0 - series[index - 1].1.0;
        if extreme.is_better(sum, best_sum) {
            (best_index, best_sum) = (index, sum);
        }
    }

    // Fractional durations end exactly at the requested time, not at the interval boundary:
    Ok(Interval::starting_at(series[best_index].0, duration))
}
