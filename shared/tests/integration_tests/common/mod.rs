//! Common test utilities and helpers for integration tests.
//!
//! Provides a store that records every query it receives and can be told to
//! fail specific ones, plus helpers for seeding series data.

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use shared::models::{BasicRollup, HistogramRollup, Locator, Metric, MetricData, MetricValue};
use shared::rollup::{Granularity, Range};
use shared::storage::{InMemoryMetricStore, MetricStore, MetricStoreError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const TENANT: &str = "tenant";
pub const METRIC: &str = "svc.latency";
pub const FIVE_MIN: i64 = 300_000;

/// Which store operation a recorded call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Range(Range, Granularity),
    Histogram(Range, Granularity),
}

/// A store that records every call and can fail selected ones.
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemoryMetricStore,
    calls: Mutex<Vec<Call>>,
    failing_starts: Mutex<HashSet<i64>>,
    fail_primary: Mutex<bool>,
}

impl RecordingStore {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn locator() -> Locator {
        Locator::new(TENANT, METRIC)
    }

    pub fn insert_raw(&self, timestamp: i64, value: impl Into<MetricValue>) {
        let metric = Metric::new(Self::locator(), value, timestamp, 86_400, None).unwrap();
        self.inner.insert_metric(metric).unwrap();
    }

    pub fn insert_rollup(&self, granularity: Granularity, timestamp: i64, values: &[f64]) {
        self.inner
            .insert_rollup(
                &Self::locator(),
                granularity,
                timestamp,
                BasicRollup::from_values(values.iter().copied()),
            )
            .unwrap();
    }

    pub fn insert_histogram(&self, granularity: Granularity, timestamp: i64, histogram: HistogramRollup) {
        self.inner
            .insert_histogram(&Self::locator(), granularity, timestamp, histogram)
            .unwrap();
    }

    /// Makes raw fetches for sub-ranges starting at `start` fail.
    pub fn fail_raw_fetch_at(&self, start: i64) {
        self.failing_starts.lock().unwrap().insert(start);
    }

    /// Makes every non-`Full` range fetch fail.
    pub fn fail_primary_fetch(&self) {
        *self.fail_primary.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Ranges of the raw (`Full`) fetches issued, in ascending order.
    pub fn raw_fetches(&self) -> Vec<Range> {
        let mut ranges: Vec<Range> = self
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Range(r, Granularity::Full) => Some(r),
                _ => None,
            })
            .collect();
        ranges.sort_by_key(Range::start);
        ranges
    }
}

impl MetricStore for RecordingStore {
    fn fetch_range(
        &self,
        locator: &Locator,
        range: Range,
        granularity: Granularity,
    ) -> Result<MetricData, MetricStoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Range(range, granularity));

        if granularity == Granularity::Full
            && self.failing_starts.lock().unwrap().contains(&range.start())
        {
            return Err(MetricStoreError::Io(std::io::Error::other(
                "connection reset",
            )));
        }
        if granularity != Granularity::Full && *self.fail_primary.lock().unwrap() {
            return Err(MetricStoreError::StorageError("timeout".to_string()));
        }
        self.inner.fetch_range(locator, range, granularity)
    }

    fn fetch_histogram_range(
        &self,
        locator: &Locator,
        range: Range,
        granularity: Granularity,
    ) -> Result<MetricData, MetricStoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Histogram(range, granularity));
        self.inner.fetch_histogram_range(locator, range, granularity)
    }
}

pub fn range(start: i64, end: i64) -> Range {
    Range::new(start, end).unwrap()
}

/// Runs `f` against a thread-local metrics recorder and returns the
/// histogram values recorded under each name.
pub fn capture_histograms<T>(f: impl FnOnce() -> T) -> (T, Vec<(String, Vec<f64>)>) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let result = metrics::with_local_recorder(&recorder, f);
    let histograms = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Histogram(values) => Some((
                key.key().name().to_string(),
                values.into_iter().map(|v| v.into_inner()).collect(),
            )),
            _ => None,
        })
        .collect();
    (result, histograms)
}
