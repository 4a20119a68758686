//! Read-time rollup handler.
//!
//! Serves a series at a requested granularity. The background aggregation
//! that persists rollups runs behind ingest, so a coarse query reaching up to
//! "now" finds its newest buckets missing. The handler detects that trailing
//! coverage gap and fills it by aggregating raw samples on read. Synthesized
//! rollups are returned, never persisted.
//!
//! Only a trailing gap is filled. Buckets missing between two persisted
//! rollups are returned as missing.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::metrics;
use crate::config::{ConfigError, RollupConfig};
use crate::models::{BasicRollup, DataPoint, Locator, MetricData, Point, RollupError};
use crate::rollup::{Granularity, GranularityError, Range};
use crate::storage::{MetricStore, MetricStoreError};

/// Errors that fail a handler call.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Histograms requested at a resolution they do not exist at.
    #[error("Histograms are not available for granularity {0}")]
    UnsupportedGranularity(Granularity),

    /// The requested window is malformed.
    #[error(transparent)]
    Granularity(#[from] GranularityError),

    /// The primary store query failed.
    #[error("Store query failed: {0}")]
    Store(#[from] MetricStoreError),

    /// The handler configuration is invalid.
    #[error("Invalid handler configuration: {0}")]
    Config(#[from] ConfigError),

    /// The backfill worker pool could not be started.
    #[error("Failed to start backfill workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why one backfill sub-range could not be computed.
#[derive(Debug, Error)]
pub enum BackfillError {
    /// The raw data fetch failed.
    #[error("raw fetch failed: {0}")]
    Store(#[from] MetricStoreError),

    /// The raw data could not be aggregated.
    #[error("aggregation failed: {0}")]
    Rollup(#[from] RollupError),
}

/// A backfill sub-range that was skipped because of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRange {
    /// The bucket that was left unfilled.
    pub range: Range,
    /// Description of the failure.
    pub reason: String,
}

/// Result of a rollup query.
///
/// Persisted and synthesized rollups are merged into one point set and are
/// not distinguishable. `skipped` lists buckets whose backfill failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupResponse {
    granularity: Granularity,
    data: MetricData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<SkippedRange>,
}

impl RollupResponse {
    /// The granularity the data was served at.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// The merged points.
    #[must_use]
    pub fn data(&self) -> &MetricData {
        &self.data
    }

    /// Backfill sub-ranges that failed.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRange] {
        &self.skipped
    }

    /// Returns true if any backfill sub-range failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Serves rollup and histogram queries against an injected store.
///
/// # Example
///
/// ```
/// use shared::handlers::RollupHandler;
/// use shared::models::{Locator, Metric};
/// use shared::rollup::Granularity;
/// use shared::storage::InMemoryMetricStore;
///
/// let store = InMemoryMetricStore::new_shared();
/// let locator = Locator::new("acme", "load");
/// for (ts, v) in [(300_000, 3.0), (360_000, 5.0), (600_000, 7.0)] {
///     store.insert_metric(Metric::new(locator.clone(), v, ts, 3600, None).unwrap()).unwrap();
/// }
///
/// let handler = RollupHandler::new(store);
/// let response = handler
///     .get_rollup_by_granularity("acme", "load", 0, 900_000, Granularity::Min5)
///     .unwrap();
///
/// // Nothing persisted: the buckets after `from` were synthesized from raw data.
/// assert_eq!(response.data().len(), 2);
/// ```
pub struct RollupHandler {
    store: Arc<dyn MetricStore>,
    config: RollupConfig,
    pool: Option<ThreadPool>,
}

impl RollupHandler {
    /// Creates a handler with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self {
            store,
            config: RollupConfig::default(),
            pool: None,
        }
    }

    /// Creates a handler with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the backfill
    /// worker pool cannot be started.
    pub fn with_config(
        store: Arc<dyn MetricStore>,
        config: RollupConfig,
    ) -> Result<Self, HandlerError> {
        config.validate_config()?;

        let pool = if config.backfill_parallelism > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(config.backfill_parallelism)
                    .thread_name(|i| format!("strata-backfill-{i}"))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            store,
            config,
            pool,
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// Returns the series at `granularity` over `[from, to)`.
    ///
    /// The store is queried from the bucket containing `from`. For any level
    /// coarser than `Full`, buckets after the newest persisted rollup (or
    /// after `from` when nothing is persisted) are synthesized from raw
    /// samples. A bucket with no raw samples stays
    /// empty; a bucket whose raw fetch or aggregation fails is logged,
    /// reported in [`RollupResponse::skipped`], and left empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `from > to`, `from` cannot be aligned to a bucket,
    /// or the primary store query fails.
    pub fn get_rollup_by_granularity(
        &self,
        tenant_id: &str,
        metric_name: &str,
        from: i64,
        to: i64,
        granularity: Granularity,
    ) -> Result<RollupResponse, HandlerError> {
        metrics::record_rollups_by_granularity();
        self.rollup_for_granularity(tenant_id, metric_name, from, to, granularity)
    }

    /// Returns the series over `[from, to)` at the granularity whose bucket
    /// count is closest to `points`.
    ///
    /// # Errors
    ///
    /// Returns an error if `from >= to`, `points` is zero, or the primary
    /// store query fails.
    pub fn get_rollup_by_points(
        &self,
        tenant_id: &str,
        metric_name: &str,
        from: i64,
        to: i64,
        points: u32,
    ) -> Result<RollupResponse, HandlerError> {
        metrics::record_rollups_by_points();
        let granularity = Granularity::from_points_in_interval(from, to, points)?;
        self.rollup_for_granularity(tenant_id, metric_name, from, to, granularity)
    }

    /// Returns histogram rollups at `granularity` over `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnsupportedGranularity`] for `Full` without
    /// querying the store, or an error if the store query fails.
    pub fn get_histograms_by_granularity(
        &self,
        tenant_id: &str,
        metric_name: &str,
        from: i64,
        to: i64,
        granularity: Granularity,
    ) -> Result<MetricData, HandlerError> {
        if !granularity.is_coarser(Granularity::Full) {
            return Err(HandlerError::UnsupportedGranularity(granularity));
        }

        let locator = Locator::new(tenant_id, metric_name);
        let range = granularity.snapped_range(from, to)?;

        let started = Instant::now();
        let data = self
            .store
            .fetch_histogram_range(&locator, range, granularity)?;
        metrics::record_fetch_duration(started.elapsed());

        metrics::record_points_returned(data.kind(), data.len());
        Ok(data)
    }

    fn rollup_for_granularity(
        &self,
        tenant_id: &str,
        metric_name: &str,
        from: i64,
        to: i64,
        granularity: Granularity,
    ) -> Result<RollupResponse, HandlerError> {
        let started = Instant::now();
        let response = self.query_rollups(tenant_id, metric_name, from, to, granularity);
        metrics::record_handler_duration(started.elapsed());
        response
    }

    fn query_rollups(
        &self,
        tenant_id: &str,
        metric_name: &str,
        from: i64,
        to: i64,
        granularity: Granularity,
    ) -> Result<RollupResponse, HandlerError> {
        let locator = Locator::new(tenant_id, metric_name);
        let range = granularity.snapped_range(from, to)?;

        let fetch_started = Instant::now();
        let mut data = self.store.fetch_range(&locator, range, granularity)?;
        metrics::record_fetch_duration(fetch_started.elapsed());

        // An empty rollup covers nothing and must not mark its bucket as done.
        let dropped = data.drop_empty_rollups();
        if dropped > 0 {
            tracing::debug!(locator = %locator, dropped, "Ignoring persisted empty rollups");
        }

        // Full resolution has no finer source to rebuild it from.
        let skipped = match granularity.bucket_millis() {
            Some(width) if self.config.backfill_enabled => {
                let started = Instant::now();
                let filled =
                    self.fill_trailing_gap(&locator, &mut data, from, to, granularity, width);
                metrics::record_calc_on_read_duration(started.elapsed());
                filled?
            }
            _ => Vec::new(),
        };

        metrics::record_points_returned(data.kind(), data.len());
        Ok(RollupResponse {
            granularity,
            data,
            skipped,
        })
    }

    fn fill_trailing_gap(
        &self,
        locator: &Locator,
        data: &mut MetricData,
        from: i64,
        to: i64,
        granularity: Granularity,
        width: i64,
    ) -> Result<Vec<SkippedRange>, HandlerError> {
        let latest = data
            .points()
            .latest_timestamp()
            .map_or(from, |ts| ts.max(from));
        let gap_start = latest.saturating_add(width);
        if gap_start > to {
            return Ok(Vec::new());
        }

        let ranges = granularity.ranges_for_interval(gap_start, to)?;
        tracing::debug!(
            locator = %locator,
            granularity = %granularity,
            latest,
            sub_ranges = ranges.len(),
            "Computing missing rollups on read"
        );

        // Every sub-range is computed before anything is merged.
        let outcomes: Vec<(Range, Result<BasicRollup, BackfillError>)> = match &self.pool {
            Some(pool) => pool.install(|| {
                ranges
                    .par_iter()
                    .map(|r| (*r, self.backfill_range(locator, *r)))
                    .collect()
            }),
            None => ranges
                .iter()
                .map(|r| (*r, self.backfill_range(locator, *r)))
                .collect(),
        };

        let mut skipped = Vec::new();
        for (range, outcome) in outcomes {
            match outcome {
                Ok(rollup) if rollup.count() > 0 => {
                    data.add_point(Point::new(range.start(), DataPoint::Rollup(rollup)));
                }
                Ok(_) => {
                    tracing::trace!(locator = %locator, range = %range, "No raw data for bucket");
                }
                Err(e) => {
                    tracing::error!(
                        locator = %locator,
                        range = %range,
                        error = %e,
                        "Failed to compute rollup during read"
                    );
                    skipped.push(SkippedRange {
                        range,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(skipped)
    }

    fn backfill_range(&self, locator: &Locator, range: Range) -> Result<BasicRollup, BackfillError> {
        let raw = self.store.fetch_range(locator, range, Granularity::Full)?;
        Ok(BasicRollup::from_raw(raw.points())?)
    }
}
