//! Storage traits and implementations.
//!
//! The persistent store is an external collaborator. The `MetricStore` trait
//! is the boundary the read path queries through; `InMemoryMetricStore` backs
//! tests and the command-line tool.

pub mod metric_store;

pub use metric_store::{InMemoryMetricStore, MetricStore, MetricStoreError};
