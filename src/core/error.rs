/// Scheduling failures that the caller reacts to, rather than just logs.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ScheduleError {
    /// Not enough price points to plan the day, retry later.
    #[display("insufficient price data: {n_points} point(s), at least {min_points} required")]
    InsufficientPriceData { n_points: usize, min_points: usize },

    #[display("invalid input: {reason}")]
    InvalidInput { reason: &'static str },
}
