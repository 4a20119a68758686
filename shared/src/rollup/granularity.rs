//! Granularity hierarchy for multi-resolution time-series data.
//!
//! Each level other than [`Granularity::Full`] describes a fixed-width
//! aggregation bucket. `Full` is raw, unaggregated data and has no bucket
//! width.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use super::range::Range;

const MINUTE_MILLIS: i64 = 60 * 1000;

/// Nominal spacing between raw samples, used only to estimate how many
/// points a `Full` resolution query returns.
pub const FULL_NOMINAL_INTERVAL_MILLIS: i64 = 30 * 1000;

/// Errors raised by granularity and range arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GranularityError {
    /// The interval start lies after its end.
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Interval start in milliseconds.
        start: i64,
        /// Interval end in milliseconds.
        end: i64,
    },

    /// A points-based query asked for zero points.
    #[error("Requested point count must be greater than zero")]
    InvalidPointCount,

    /// The timestamp has no bucket boundary at or below it in `i64`.
    #[error("Timestamp {0} cannot be aligned to a bucket boundary")]
    TimestampOutOfRange(i64),

    /// A granularity name could not be parsed.
    #[error("Unknown granularity: '{0}'")]
    UnknownGranularity(String),
}

/// Resolution level of stored data, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Raw samples, never aggregated.
    #[serde(rename = "full")]
    Full,
    /// 5 minute rollups.
    #[serde(rename = "5m")]
    Min5,
    /// 20 minute rollups.
    #[serde(rename = "20m")]
    Min20,
    /// 60 minute rollups.
    #[serde(rename = "60m")]
    Min60,
    /// 240 minute rollups.
    #[serde(rename = "240m")]
    Min240,
    /// 1440 minute (one day) rollups.
    #[serde(rename = "1440m")]
    Min1440,
}

impl Granularity {
    const ALL: [Self; 6] = [
        Self::Full,
        Self::Min5,
        Self::Min20,
        Self::Min60,
        Self::Min240,
        Self::Min1440,
    ];

    /// Returns every granularity, finest first.
    #[must_use]
    pub const fn granularities() -> &'static [Self] {
        &Self::ALL
    }

    /// Returns the bucket width in milliseconds, or `None` for `Full`.
    #[must_use]
    pub const fn bucket_millis(&self) -> Option<i64> {
        match self {
            Self::Full => None,
            Self::Min5 => Some(5 * MINUTE_MILLIS),
            Self::Min20 => Some(20 * MINUTE_MILLIS),
            Self::Min60 => Some(60 * MINUTE_MILLIS),
            Self::Min240 => Some(240 * MINUTE_MILLIS),
            Self::Min1440 => Some(1440 * MINUTE_MILLIS),
        }
    }

    /// Returns the short name of this granularity (e.g. `"5m"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Min5 => "5m",
            Self::Min20 => "20m",
            Self::Min60 => "60m",
            Self::Min240 => "240m",
            Self::Min1440 => "1440m",
        }
    }

    /// Rounds `millis` down to the start of the bucket containing it.
    ///
    /// `Full` has no buckets, so the timestamp is returned unchanged. A
    /// timestamp in the partial bucket at the bottom of the `i64` range
    /// snaps to `i64::MIN`; use [`Granularity::snapped_range`] to reject it.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::rollup::Granularity;
    ///
    /// assert_eq!(Granularity::Min5.snap_millis(301_000), 300_000);
    /// assert_eq!(Granularity::Full.snap_millis(301_000), 301_000);
    /// ```
    #[must_use]
    pub const fn snap_millis(&self, millis: i64) -> i64 {
        match self.bucket_millis() {
            Some(width) => millis.saturating_sub(millis.rem_euclid(width)),
            None => millis,
        }
    }

    /// Returns the query window `[snap(from), to)`.
    ///
    /// # Errors
    ///
    /// Returns [`GranularityError::TimestampOutOfRange`] if `from` has no
    /// bucket start representable in `i64`, or
    /// [`GranularityError::InvalidRange`] if `from > to`.
    pub fn snapped_range(&self, from: i64, to: i64) -> Result<Range, GranularityError> {
        let start = match self.bucket_millis() {
            Some(width) => from
                .checked_sub(from.rem_euclid(width))
                .ok_or(GranularityError::TimestampOutOfRange(from))?,
            None => from,
        };
        Range::new(start, to)
    }

    /// Returns true if this granularity is strictly coarser than `other`.
    #[must_use]
    pub fn is_coarser(&self, other: Self) -> bool {
        *self > other
    }

    /// Returns the next coarser granularity, if any.
    #[must_use]
    pub fn coarser(&self) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.is_coarser(*self))
    }

    /// Returns the next finer granularity, if any.
    #[must_use]
    pub fn finer(&self) -> Option<Self> {
        Self::ALL.iter().rev().copied().find(|g| self.is_coarser(*g))
    }

    /// Splits `[start, end)` into consecutive bucket-aligned sub-ranges.
    ///
    /// The first range starts exactly at `start` and the last ends exactly at
    /// `end`; every boundary in between falls on a bucket edge. `Full` has no
    /// buckets and yields the whole interval as one range.
    ///
    /// # Errors
    ///
    /// Returns [`GranularityError::InvalidRange`] if `start > end`.
    pub fn ranges_for_interval(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Range>, GranularityError> {
        let whole = Range::new(start, end)?;
        if whole.is_empty() {
            return Ok(Vec::new());
        }

        let Some(width) = self.bucket_millis() else {
            return Ok(vec![whole]);
        };

        let mut ranges = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let next = cursor
                .saturating_add(width - cursor.rem_euclid(width))
                .min(end);
            ranges.push(Range::new(cursor, next)?);
            cursor = next;
        }
        Ok(ranges)
    }

    /// Picks the granularity whose expected point count over `[from, to)` is
    /// closest to `points`. Ties go to the coarser level.
    ///
    /// # Errors
    ///
    /// Returns an error if `from >= to` or `points` is zero.
    pub fn from_points_in_interval(
        from: i64,
        to: i64,
        points: u32,
    ) -> Result<Self, GranularityError> {
        if from >= to {
            return Err(GranularityError::InvalidRange {
                start: from,
                end: to,
            });
        }
        if points == 0 {
            return Err(GranularityError::InvalidPointCount);
        }

        let duration = to.abs_diff(from);
        let requested = u64::from(points);
        let mut best = Self::Full;
        let mut closest = u64::MAX;

        for granularity in Self::ALL {
            let width = granularity
                .bucket_millis()
                .unwrap_or(FULL_NOMINAL_INTERVAL_MILLIS)
                .unsigned_abs();
            let diff = requested.abs_diff(duration / width);
            if diff > closest {
                break;
            }
            closest = diff;
            best = granularity;
        }
        Ok(best)
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = GranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GranularityError::UnknownGranularity(s.to_string()))
    }
}
