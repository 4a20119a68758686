//! Data models for the Strata read path.
//!
//! Series identity, raw samples, rollups, and the point containers query
//! results are carried in.

pub mod locator;
pub mod metric;
pub mod metric_data;
pub mod points;
pub mod rollup;

pub use locator::Locator;
pub use metric::{DataType, Metric, MetricError, MetricValue};
pub use metric_data::{MetricData, MetricDataKind};
pub use points::{DataPoint, Point, Points};
pub use rollup::{BasicRollup, HistogramBin, HistogramRollup, RollupError};
