//! JSON fixtures for seeding the in-memory store.
//!
//! ```json
//! {
//!   "metrics": [
//!     {"tenant_id": "acme", "metric_name": "cpu", "value": 12.5, "collection_time": 1000}
//!   ],
//!   "rollups": [
//!     {"tenant_id": "acme", "metric_name": "cpu", "granularity": "5m", "timestamp": 0, "values": [1, 2]}
//!   ],
//!   "histograms": [
//!     {"tenant_id": "acme", "metric_name": "cpu", "granularity": "5m", "timestamp": 0,
//!      "bins": [{"mean": 1.0, "count": 3}]}
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::models::{
    BasicRollup, HistogramBin, HistogramRollup, Locator, Metric, MetricValue,
};
use shared::rollup::Granularity;
use shared::storage::InMemoryMetricStore;
use std::path::Path;

const DEFAULT_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

fn default_ttl() -> i64 {
    DEFAULT_TTL_SECONDS
}

#[derive(Debug, Deserialize)]
struct RawSample {
    tenant_id: String,
    metric_name: String,
    value: serde_json::Value,
    collection_time: i64,
    #[serde(default = "default_ttl")]
    ttl_seconds: i64,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersistedRollup {
    tenant_id: String,
    metric_name: String,
    granularity: Granularity,
    timestamp: i64,
    values: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct PersistedHistogram {
    tenant_id: String,
    metric_name: String,
    granularity: Granularity,
    timestamp: i64,
    bins: Vec<HistogramBin>,
}

/// Contents of a fixture file.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    metrics: Vec<RawSample>,
    #[serde(default)]
    rollups: Vec<PersistedRollup>,
    #[serde(default)]
    histograms: Vec<PersistedHistogram>,
}

impl Fixture {
    /// Reads and parses a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    /// Parses fixture JSON.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds an in-memory store holding the fixture data.
    pub fn into_store(self) -> Result<InMemoryMetricStore> {
        let store = InMemoryMetricStore::new();

        let mut metrics = Vec::with_capacity(self.metrics.len());
        for sample in self.metrics {
            let locator = Locator::new(sample.tenant_id, sample.metric_name);
            let value = MetricValue::try_from(sample.value)
                .with_context(|| format!("Bad value for {locator} at {}", sample.collection_time))?;
            metrics.push(Metric::new(
                locator,
                value,
                sample.collection_time,
                sample.ttl_seconds,
                sample.unit,
            )?);
        }
        store.insert_batch(metrics)?;

        for rollup in self.rollups {
            store.insert_rollup(
                &Locator::new(rollup.tenant_id, rollup.metric_name),
                rollup.granularity,
                rollup.timestamp,
                BasicRollup::from_values(rollup.values),
            )?;
        }

        for histogram in self.histograms {
            store.insert_histogram(
                &Locator::new(histogram.tenant_id, histogram.metric_name),
                histogram.granularity,
                histogram.timestamp,
                HistogramRollup::new(histogram.bins),
            )?;
        }

        tracing::debug!(raw_samples = store.count()?, "Fixture loaded");
        Ok(store)
    }
}
