//! Configuration module for Strata.
//!
//! This module contains configuration structures for the read path.

pub mod handler;

pub use handler::{ConfigError, RollupConfig, BACKFILL_ENABLED_ENV, BACKFILL_PARALLELISM_ENV};
