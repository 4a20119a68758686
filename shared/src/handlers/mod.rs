//! Read-path request handlers.

pub mod metrics;
pub mod rollup_handler;

pub use rollup_handler::{
    BackfillError, HandlerError, RollupHandler, RollupResponse, SkippedRange,
};
