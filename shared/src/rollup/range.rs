//! Half-open time windows.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use super::granularity::GranularityError;

/// A half-open `[start, end)` time window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    start: i64,
    end: i64,
}

impl Range {
    /// Creates a new range.
    ///
    /// # Errors
    ///
    /// Returns [`GranularityError::InvalidRange`] if `start > end`.
    pub fn new(start: i64, end: i64) -> Result<Self, GranularityError> {
        if start > end {
            return Err(GranularityError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start of the window.
    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive end of the window.
    #[must_use]
    pub const fn end(&self) -> i64 {
        self.end
    }

    /// Returns true if the window contains no instants.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_millis(self.start),
            format_millis(self.end)
        )
    }
}
