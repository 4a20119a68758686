//! Timestamp-ordered point containers.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

use super::metric::MetricValue;
use super::rollup::{BasicRollup, HistogramRollup};

/// A single data point at a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point<T> {
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// The point payload.
    pub data: T,
}

impl<T> Point<T> {
    /// Creates a new point.
    #[must_use]
    pub const fn new(timestamp: i64, data: T) -> Self {
        Self { timestamp, data }
    }
}

/// An ordered mapping from timestamp to point.
///
/// Timestamps are unique; iteration is always ascending regardless of
/// insertion order.
///
/// # Example
///
/// ```
/// use shared::models::{Point, Points};
///
/// let mut points = Points::new();
/// points.add(Point::new(20, "b"));
/// points.add(Point::new(10, "a"));
///
/// let order: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
/// assert_eq!(order, vec![10, 20]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Point<T>>", into = "Vec<Point<T>>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: Deserialize<'de>"
))]
pub struct Points<T> {
    points: BTreeMap<i64, Point<T>>,
}

impl<T> Points<T> {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: BTreeMap::new(),
        }
    }

    /// Inserts a point, replacing any existing point at the same timestamp.
    ///
    /// Returns the replaced point, if there was one.
    pub fn add(&mut self, point: Point<T>) -> Option<Point<T>> {
        self.points.insert(point.timestamp, point)
    }

    /// Returns the point at `timestamp`, if any.
    #[must_use]
    pub fn get(&self, timestamp: i64) -> Option<&Point<T>> {
        self.points.get(&timestamp)
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The largest timestamp present.
    #[must_use]
    pub fn latest_timestamp(&self) -> Option<i64> {
        self.points.keys().next_back().copied()
    }

    /// Iterates points in ascending timestamp order.
    pub fn iter(&self) -> btree_map::Values<'_, i64, Point<T>> {
        self.points.values()
    }

    /// Keeps only the points for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Point<T>) -> bool) {
        self.points.retain(|_, point| keep(point));
    }
}

impl<T> Default for Points<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<Point<T>> for Points<T> {
    fn from_iter<I: IntoIterator<Item = Point<T>>>(iter: I) -> Self {
        let mut points = Self::new();
        for point in iter {
            points.add(point);
        }
        points
    }
}

impl<T> From<Vec<Point<T>>> for Points<T> {
    fn from(points: Vec<Point<T>>) -> Self {
        points.into_iter().collect()
    }
}

impl<T> From<Points<T>> for Vec<Point<T>> {
    fn from(points: Points<T>) -> Self {
        points.into_iter().collect()
    }
}

impl<T> IntoIterator for Points<T> {
    type Item = Point<T>;
    type IntoIter = btree_map::IntoValues<i64, Point<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_values()
    }
}

impl<'a, T> IntoIterator for &'a Points<T> {
    type Item = &'a Point<T>;
    type IntoIter = btree_map::Values<'a, i64, Point<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Payload of a point returned by the store or synthesized on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataPoint {
    /// A raw, unaggregated sample value.
    Full(MetricValue),
    /// A basic rollup over one bucket.
    Rollup(BasicRollup),
    /// A histogram rollup over one bucket.
    Histogram(HistogramRollup),
}

impl DataPoint {
    /// Returns the raw value if this is a full-resolution point.
    #[must_use]
    pub fn as_full(&self) -> Option<&MetricValue> {
        match self {
            Self::Full(v) => Some(v),
            Self::Rollup(_) | Self::Histogram(_) => None,
        }
    }

    /// Returns the rollup if this is a rollup point.
    #[must_use]
    pub fn as_rollup(&self) -> Option<&BasicRollup> {
        match self {
            Self::Rollup(r) => Some(r),
            Self::Full(_) | Self::Histogram(_) => None,
        }
    }

    /// Returns the histogram if this is a histogram point.
    #[must_use]
    pub fn as_histogram(&self) -> Option<&HistogramRollup> {
        match self {
            Self::Histogram(h) => Some(h),
            Self::Full(_) | Self::Rollup(_) => None,
        }
    }
}
