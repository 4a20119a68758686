//! Read-path metrics recording.
//!
//! Emits the rollup handler's counters, timers and point-count histograms
//! through the `metrics` facade. Nothing is recorded unless the embedding
//! application installs a recorder.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::models::MetricDataKind;

/// Requests that chose their granularity from a point count.
pub const ROLLUPS_BY_POINTS: &str = "strata_rollups_by_points_total";
/// Requests for an explicit granularity.
pub const ROLLUPS_BY_GRANULARITY: &str = "strata_rollups_by_granularity_total";
/// Primary store fetch latency in seconds.
pub const FETCH_DURATION: &str = "strata_fetch_duration_seconds";
/// Whole rollup query latency in seconds.
pub const HANDLER_DURATION: &str = "strata_handler_duration_seconds";
/// Latency of on-read rollup synthesis in seconds.
pub const CALC_ON_READ_DURATION: &str = "strata_calc_on_read_duration_seconds";
/// Points per full-resolution response.
pub const FULL_POINTS_RETURNED: &str = "strata_full_points_returned";
/// Points per rollup response.
pub const ROLLUP_POINTS_RETURNED: &str = "strata_rollup_points_returned";
/// Points per histogram response.
pub const HISTOGRAM_POINTS_RETURNED: &str = "strata_histogram_points_returned";

/// Record a rollup request by point count
pub fn record_rollups_by_points() {
    counter!(ROLLUPS_BY_POINTS).increment(1);
}

/// Record a rollup request by granularity
pub fn record_rollups_by_granularity() {
    counter!(ROLLUPS_BY_GRANULARITY).increment(1);
}

/// Record a primary store fetch
pub fn record_fetch_duration(duration: Duration) {
    histogram!(FETCH_DURATION).record(duration.as_secs_f64());
}

/// Record a completed rollup query
pub fn record_handler_duration(duration: Duration) {
    histogram!(HANDLER_DURATION).record(duration.as_secs_f64());
}

/// Record one on-read synthesis pass
pub fn record_calc_on_read_duration(duration: Duration) {
    histogram!(CALC_ON_READ_DURATION).record(duration.as_secs_f64());
}

/// Record the size of a response, partitioned by what it carries
#[allow(clippy::cast_precision_loss)]
pub fn record_points_returned(kind: MetricDataKind, points: usize) {
    let name = match kind {
        MetricDataKind::Full => FULL_POINTS_RETURNED,
        MetricDataKind::Rollup => ROLLUP_POINTS_RETURNED,
        MetricDataKind::Histogram => HISTOGRAM_POINTS_RETURNED,
    };
    histogram!(name).record(points as f64);
}
