//! Temporal resolution primitives.
//!
//! [`Granularity`] defines the resolution levels and bucket alignment;
//! [`Range`] is the half-open window the store is queried with.

pub mod granularity;
pub mod range;

pub use granularity::{Granularity, GranularityError, FULL_NOMINAL_INTERVAL_MILLIS};
pub use range::Range;
