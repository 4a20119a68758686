//! Aggregate (rollup) value types.
//!
//! A [`BasicRollup`] summarizes the numeric raw samples of one bucket. A
//! rollup with a count of zero means "no data" and is never merged into a
//! query result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::points::{DataPoint, Points};

/// Errors that can occur while folding raw points into a rollup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollupError {
    /// A raw sample carried a string or boolean value.
    #[error("Cannot roll up non-numeric sample at {timestamp}")]
    NonNumericSample {
        /// Timestamp of the offending point.
        timestamp: i64,
    },

    /// A point in the input was not a raw sample.
    #[error("Expected a full resolution point at {timestamp}")]
    UnexpectedPoint {
        /// Timestamp of the offending point.
        timestamp: i64,
    },
}

/// Count, sum, extrema and variance of a set of numeric samples.
///
/// # Example
///
/// ```
/// use shared::models::BasicRollup;
///
/// let rollup = BasicRollup::from_values([2.0, 4.0, 6.0]);
/// assert_eq!(rollup.count(), 3);
/// assert_eq!(rollup.average(), Some(4.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicRollup {
    count: u64,
    sum: f64,
    mean: f64,
    m2: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl BasicRollup {
    /// Folds an iterator of values into a rollup.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut rollup = Self::default();
        for value in values {
            rollup.observe(value);
        }
        rollup
    }

    /// Folds full-resolution points into a rollup.
    ///
    /// # Errors
    ///
    /// Returns an error if any point is not a numeric raw sample.
    pub fn from_raw(points: &Points<DataPoint>) -> Result<Self, RollupError> {
        let mut rollup = Self::default();
        for point in points {
            let timestamp = point.timestamp;
            let value = point
                .data
                .as_full()
                .ok_or(RollupError::UnexpectedPoint { timestamp })?
                .as_f64()
                .ok_or(RollupError::NonNumericSample { timestamp })?;
            rollup.observe(value);
        }
        Ok(rollup)
    }

    // Welford's online update.
    #[allow(clippy::cast_precision_loss)]
    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Number of samples folded in.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns true if no samples were folded in.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of all samples.
    #[must_use]
    pub const fn sum(&self) -> f64 {
        self.sum
    }

    /// Arithmetic mean, `None` when empty.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance, `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Smallest sample.
    #[must_use]
    pub const fn min(&self) -> Option<f64> {
        self.min
    }

    /// Largest sample.
    #[must_use]
    pub const fn max(&self) -> Option<f64> {
        self.max
    }
}

/// One bin of a histogram rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Mean of the samples in this bin.
    pub mean: f64,
    /// Number of samples in this bin.
    pub count: u64,
}

/// A histogram aggregate over one bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistogramRollup {
    /// The histogram bins, ordered by mean.
    pub bins: Vec<HistogramBin>,
}

impl HistogramRollup {
    /// Creates a histogram from its bins.
    #[must_use]
    pub fn new(bins: Vec<HistogramBin>) -> Self {
        Self { bins }
    }

    /// Total samples across all bins.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }
}
