use std::ops::Index;

use chrono::{DateTime, Local, TimeDelta};
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{core::interval::Interval, quantity::rate::Rate};

pub type Point<K, V> = (K, V);

/// Price per interval, keyed by the interval start.
///
/// Points are always kept in chronological order, whatever order they came in.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
    points: Vec<Point<DateTime<Local>, Rate>>,

    /// Length of a single price interval.
    step: TimeDelta,
}

impl Default for PriceSeries {
    fn default() -> Self {
        Self { points: Vec::new(), step: Self::DEFAULT_STEP }
    }
}

impl FromIterator<Point<DateTime<Local>, Rate>> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = Point<DateTime<Local>, Rate>>>(iter: I) -> Self {
        let mut points = iter.into_iter().collect_vec();
        points.sort_by_key(|(time, _)| *time);
        points.dedup_by_key(|(time, _)| *time);
        let step = points
            .iter()
            .tuple_windows()
            .map(|((lhs, _), (rhs, _))| *rhs - *lhs)
            .min()
            .unwrap_or(Self::DEFAULT_STEP);
        Self { points, step }
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a Point<DateTime<Local>, Rate>;
    type IntoIter = std::slice::Iter<'a, Point<DateTime<Local>, Rate>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl Index<usize> for PriceSeries {
    type Output = Point<DateTime<Local>, Rate>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl PriceSeries {
    const DEFAULT_STEP: TimeDelta = TimeDelta::hours(1);

    pub const fn len(&self) -> usize {
        self.points.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point<DateTime<Local>, Rate>> {
        self.points.iter()
    }

    pub const fn step(&self) -> TimeDelta {
        self.step
    }

    /// Time interval covered by the point at the index.
    pub fn interval_at(&self, index: usize) -> Interval {
        Interval::starting_at(self.points[index].0, self.step)
    }

    /// Whole time span from the first interval start till the last interval end.
    pub fn span(&self) -> Option<Interval> {
        let (first, _) = self.points.first()?;
        let (last, _) = self.points.last()?;
        Some(Interval::new(*first, *last + self.step))
    }

    /// Points whose interval has not yet fully elapsed.
    #[must_use]
    pub fn since(&self, now: DateTime<Local>) -> Self {
        self.filter(|(time, _)| *time + self.step > now)
    }

    /// Points which start within the interval.
    #[must_use]
    pub fn within(&self, interval: Interval) -> Self {
        self.filter(|(time, _)| interval.contains(*time))
    }

    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&Point<DateTime<Local>, Rate>) -> bool) -> Self {
        Self {
            points: self.points.iter().filter(|point| predicate(point)).copied().collect(),
            step: self.step,
        }
    }

    /// Concatenate with another series, for example today's and tomorrow's prices.
    #[must_use]
    pub fn chain(&self, other: &Self) -> Self {
        let mut series: Self = self.points.iter().chain(&other.points).copied().collect();
        series.step = self.step.min(other.step);
        series
    }

    #[expect(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<Rate> {
        if self.points.is_empty() {
            None
        } else {
            Some(self.points.iter().map(|(_, rate)| *rate).sum::<Rate>() / self.points.len() as f64)
        }
    }

    /// Average over the intervals which intersect the time span.
    pub fn average_over(&self, interval: Interval) -> Option<Rate> {
        self.filter(|(time, _)| Interval::starting_at(*time, self.step).overlaps(interval))
            .average()
    }

    /// Average of the `n` cheapest intervals, wherever they are.
    #[expect(clippy::cast_precision_loss)]
    pub fn cheapest_average(&self, n: usize) -> Option<Rate> {
        if n == 0 || self.points.is_empty() {
            return None;
        }
        let cheapest = self
            .points
            .iter()
            .map(|(_, rate)| *rate)
            .sorted_by_key(|rate| OrderedFloat(rate.0))
            .take(n)
            .collect_vec();
        Some(cheapest.iter().copied().sum::<Rate>() / cheapest.len() as f64)
    }

    /// Most expensive point, the earliest one on ties.
    pub fn peak(&self) -> Option<Point<DateTime<Local>, Rate>> {
        self.points.iter().copied().reduce(|best, point| if point.1 > best.1 { point } else { best })
    }
}
