//! Query result container.

use serde::{Deserialize, Serialize};

use super::points::{DataPoint, Point, Points};

/// What kind of points a [`MetricData`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricDataKind {
    /// Raw samples.
    Full,
    /// Basic rollups.
    Rollup,
    /// Histogram rollups.
    Histogram,
}

/// Points returned by a single store query, with their metadata.
///
/// Callers receive it by value and read it through accessors. Only the
/// owning handler adds points while filling a coverage gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    points: Points<DataPoint>,
    kind: MetricDataKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

impl MetricData {
    /// Creates a result from its points.
    #[must_use]
    pub fn new(points: Points<DataPoint>, kind: MetricDataKind, unit: Option<String>) -> Self {
        Self { points, kind, unit }
    }

    /// Creates an empty result.
    #[must_use]
    pub fn empty(kind: MetricDataKind) -> Self {
        Self::new(Points::new(), kind, None)
    }

    /// The points, ascending by timestamp.
    #[must_use]
    pub fn points(&self) -> &Points<DataPoint> {
        &self.points
    }

    /// The kind of points carried.
    #[must_use]
    pub fn kind(&self) -> MetricDataKind {
        self.kind
    }

    /// The unit of the series, if known.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
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

    pub(crate) fn add_point(&mut self, point: Point<DataPoint>) {
        self.points.add(point);
    }

    /// Drops rollups that aggregate no samples, returning how many went.
    pub(crate) fn drop_empty_rollups(&mut self) -> usize {
        let before = self.points.len();
        self.points
            .retain(|point| !matches!(&point.data, DataPoint::Rollup(r) if r.is_empty()));
        before - self.points.len()
    }
}
