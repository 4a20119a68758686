//! Metric storage trait and implementations.
//!
//! Provides the `MetricStore` trait the read path queries, and an
//! `InMemoryMetricStore` implementation for development and testing.

use crate::models::{
    BasicRollup, DataPoint, HistogramRollup, Locator, Metric, MetricData, MetricDataKind,
    MetricValue, Point, Points,
};
use crate::rollup::{Granularity, Range};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during metric store operations.
#[derive(Debug, Error)]
pub enum MetricStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on metric store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Transport or disk failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for metric storage implementations.
///
/// Both fetches return an empty result, not an error, when no data exists.
/// Implementations must be thread-safe (Send + Sync).
pub trait MetricStore: Send + Sync {
    /// Fetches points intersecting `range` at `granularity`: raw samples for
    /// `Full`, basic rollups otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn fetch_range(
        &self,
        locator: &Locator,
        range: Range,
        granularity: Granularity,
    ) -> Result<MetricData, MetricStoreError>;

    /// Fetches histogram rollups intersecting `range` at `granularity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn fetch_histogram_range(
        &self,
        locator: &Locator,
        range: Range,
        granularity: Granularity,
    ) -> Result<MetricData, MetricStoreError>;
}

#[derive(Debug, Default)]
struct Series {
    unit: Option<String>,
    raw: BTreeMap<i64, MetricValue>,
    rollups: HashMap<Granularity, BTreeMap<i64, BasicRollup>>,
    histograms: HashMap<Granularity, BTreeMap<i64, HistogramRollup>>,
}

fn slice<T: Clone>(
    points: Option<&BTreeMap<i64, T>>,
    range: Range,
    wrap: impl Fn(T) -> DataPoint,
) -> Points<DataPoint> {
    if range.is_empty() {
        return Points::new();
    }
    points
        .into_iter()
        .flat_map(|p| p.range(range.start()..range.end()))
        .map(|(ts, v)| Point::new(*ts, wrap(v.clone())))
        .collect()
}

/// In-memory metric store implementation.
///
/// Persisted rollups are written explicitly with [`Self::insert_rollup`];
/// nothing here aggregates in the background, so the rollup layer lags raw
/// data for as long as a test wants it to.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    series: Arc<RwLock<HashMap<Locator, Series>>>,
}

impl InMemoryMetricStore {
    /// Creates a new empty in-memory metric store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a new in-memory metric store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Inserts a single raw sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert_metric(&self, metric: Metric) -> Result<(), MetricStoreError> {
        self.insert_batch(vec![metric])
    }

    /// Inserts multiple raw samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert_batch(&self, metrics: Vec<Metric>) -> Result<(), MetricStoreError> {
        let mut series = self
            .series
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        for metric in metrics {
            let entry = series.entry(metric.locator().clone()).or_default();
            if let Some(unit) = metric.unit() {
                entry.unit = Some(unit.to_string());
            }
            entry
                .raw
                .insert(metric.collection_time(), metric.value().clone());
        }
        Ok(())
    }

    /// Persists a basic rollup at `timestamp` for `granularity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert_rollup(
        &self,
        locator: &Locator,
        granularity: Granularity,
        timestamp: i64,
        rollup: BasicRollup,
    ) -> Result<(), MetricStoreError> {
        let mut series = self
            .series
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        series
            .entry(locator.clone())
            .or_default()
            .rollups
            .entry(granularity)
            .or_default()
            .insert(timestamp, rollup);
        Ok(())
    }

    /// Persists a histogram rollup at `timestamp` for `granularity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert_histogram(
        &self,
        locator: &Locator,
        granularity: Granularity,
        timestamp: i64,
        histogram: HistogramRollup,
    ) -> Result<(), MetricStoreError> {
        let mut series = self
            .series
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        series
            .entry(locator.clone())
            .or_default()
            .histograms
            .entry(granularity)
            .or_default()
            .insert(timestamp, histogram);
        Ok(())
    }

    /// Returns the total number of raw samples in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn count(&self) -> Result<usize, MetricStoreError> {
        let series = self
            .series
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        Ok(series.values().map(|s| s.raw.len()).sum())
    }

    /// Clears all data from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn clear(&self) -> Result<(), MetricStoreError> {
        let mut series = self
            .series
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        series.clear();
        Ok(())
    }
}

impl MetricStore for InMemoryMetricStore {
    fn fetch_range(
        &self,
        locator: &Locator,
        range: Range,
        granularity: Granularity,
    ) -> Result<MetricData, MetricStoreError> {
        let series = self
            .series
            .read()
            .map_err(|_| MetricStoreError::LockError)?;

        let kind = if granularity == Granularity::Full {
            MetricDataKind::Full
        } else {
            MetricDataKind::Rollup
        };
        let Some(entry) = series.get(locator) else {
            return Ok(MetricData::empty(kind));
        };

        let points = if granularity == Granularity::Full {
            slice(Some(&entry.raw), range, DataPoint::Full)
        } else {
            slice(entry.rollups.get(&granularity), range, DataPoint::Rollup)
        };
        Ok(MetricData::new(points, kind, entry.unit.clone()))
    }

    fn fetch_histogram_range(
        &self,
        locator: &Locator,
        range: Range,
        granularity: Granularity,
    ) -> Result<MetricData, MetricStoreError> {
        let series = self
            .series
            .read()
            .map_err(|_| MetricStoreError::LockError)?;

        let Some(entry) = series.get(locator) else {
            return Ok(MetricData::empty(MetricDataKind::Histogram));
        };
        let points = slice(
            entry.histograms.get(&granularity),
            range,
            DataPoint::Histogram,
        );
        Ok(MetricData::new(
            points,
            MetricDataKind::Histogram,
            entry.unit.clone(),
        ))
    }
}
