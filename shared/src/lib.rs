//! Strata Shared Library
//!
//! This crate contains the read path of the Strata multi-resolution
//! time-series store: the rollup data model, the granularity hierarchy, the
//! store facade, and the handler that fills missing rollups on read.
//!
//! # Modules
//!
//! - [`models`] - Locators, raw samples, rollups and point containers
//! - [`rollup`] - Granularity levels and time ranges
//! - [`storage`] - Store trait and an in-memory implementation
//! - [`handlers`] - Rollup handler and its instrumentation
//! - [`config`] - Handler configuration
//!
//! # Example
//!
//! ```
//! use shared::handlers::RollupHandler;
//! use shared::models::{BasicRollup, Locator, Metric};
//! use shared::rollup::Granularity;
//! use shared::storage::InMemoryMetricStore;
//!
//! let store = InMemoryMetricStore::new_shared();
//! let locator = Locator::new("acme", "api.latency");
//!
//! // Background aggregation has persisted the first bucket only.
//! store
//!     .insert_rollup(&locator, Granularity::Min5, 0, BasicRollup::from_values([12.0]))
//!     .unwrap();
//! store
//!     .insert_metric(Metric::new(locator, 20.0, 310_000, 86_400, None).unwrap())
//!     .unwrap();
//!
//! let handler = RollupHandler::new(store);
//! let response = handler
//!     .get_rollup_by_granularity("acme", "api.latency", 0, 600_000, Granularity::Min5)
//!     .unwrap();
//!
//! assert_eq!(response.data().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod handlers;
pub mod models;
pub mod rollup;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
