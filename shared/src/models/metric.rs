//! Raw metric sample model.
//!
//! Defines the `Metric` structure produced at ingest and the closed set of
//! value types a raw sample may carry.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::locator::Locator;

/// Errors raised while building or classifying a raw sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// TTL outside the open interval `(0, i32::MAX)`.
    #[error("TTL supplied for metric is invalid. Required: 0 < ttl < {max}, provided: {0}", max = i32::MAX)]
    InvalidTtl(i64),

    /// Value outside the supported variant set.
    #[error("Unknown metric value type: {0}")]
    UnknownMetricType(String),
}

/// Discriminant of a [`MetricValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// UTF-8 string.
    #[serde(rename = "S")]
    String,
    /// 32-bit integer.
    #[serde(rename = "I")]
    Int,
    /// 64-bit integer.
    #[serde(rename = "L")]
    Long,
    /// 64-bit float.
    #[serde(rename = "D")]
    Double,
    /// Boolean.
    #[serde(rename = "B")]
    Boolean,
}

impl DataType {
    /// Classifies a value by its variant.
    #[must_use]
    pub const fn classify(value: &MetricValue) -> Self {
        match value {
            MetricValue::String(_) => Self::String,
            MetricValue::Int(_) => Self::Int,
            MetricValue::Long(_) => Self::Long,
            MetricValue::Double(_) => Self::Double,
            MetricValue::Boolean(_) => Self::Boolean,
        }
    }

    /// Parses a single-letter type code (`S`, `I`, `L`, `D`, `B`).
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::UnknownMetricType`] for any other code.
    pub fn from_code(code: &str) -> Result<Self, MetricError> {
        match code {
            "S" => Ok(Self::String),
            "I" => Ok(Self::Int),
            "L" => Ok(Self::Long),
            "D" => Ok(Self::Double),
            "B" => Ok(Self::Boolean),
            other => Err(MetricError::UnknownMetricType(other.to_string())),
        }
    }

    /// Returns the single-letter type code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Int => "I",
            Self::Long => "L",
            Self::Double => "D",
            Self::Boolean => "B",
        }
    }

    /// Returns true for `Int`, `Long` and `Double`.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Double)
    }

    /// Returns true for `String`.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Returns true for `Boolean`.
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The value carried by a raw sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MetricValue {
    /// String value.
    #[serde(rename = "S")]
    String(String),
    /// 32-bit integer value.
    #[serde(rename = "I")]
    Int(i32),
    /// 64-bit integer value.
    #[serde(rename = "L")]
    Long(i64),
    /// Floating point value.
    #[serde(rename = "D")]
    Double(f64),
    /// Boolean value.
    #[serde(rename = "B")]
    Boolean(bool),
}

impl MetricValue {
    /// Returns the value's data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        DataType::classify(self)
    }

    /// Returns the value as `f64` if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::String(_) | Self::Boolean(_) => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl TryFrom<serde_json::Value> for MetricValue {
    type Error = MetricError;

    /// Classifies an untyped JSON scalar. Integers that fit in 32 bits become
    /// `Int`, other integers `Long`, everything else numeric `Double`.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(Self::String(s)),
            Value::Bool(b) => Ok(Self::Boolean(b)),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(i32::try_from(v).map_or(Self::Long(v), Self::Int))
                } else {
                    n.as_f64()
                        .map(Self::Double)
                        .ok_or_else(|| MetricError::UnknownMetricType(n.to_string()))
                }
            }
            Value::Null => Err(MetricError::UnknownMetricType("null".to_string())),
            Value::Array(_) => Err(MetricError::UnknownMetricType("array".to_string())),
            Value::Object(_) => Err(MetricError::UnknownMetricType("object".to_string())),
        }
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

fn validate_ttl(ttl_seconds: i64) -> Result<i32, MetricError> {
    match i32::try_from(ttl_seconds) {
        Ok(ttl) if ttl > 0 && ttl < i32::MAX => Ok(ttl),
        _ => Err(MetricError::InvalidTtl(ttl_seconds)),
    }
}

/// A raw metric sample.
///
/// # Example
///
/// ```
/// use shared::models::{DataType, Locator, Metric};
///
/// let metric = Metric::new(
///     Locator::new("acme", "cpu.idle"),
///     42.5,
///     1_700_000_000_000,
///     86_400,
///     Some("percent".to_string()),
/// )
/// .unwrap();
///
/// assert_eq!(metric.data_type(), DataType::Double);
/// assert!(metric.is_numeric());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    locator: Locator,
    value: MetricValue,
    collection_time: i64,
    ttl_seconds: i32,
    data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

impl Metric {
    /// Creates a new raw sample.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidTtl`] unless `0 < ttl_seconds < i32::MAX`.
    pub fn new(
        locator: Locator,
        value: impl Into<MetricValue>,
        collection_time: i64,
        ttl_seconds: i64,
        unit: Option<String>,
    ) -> Result<Self, MetricError> {
        let value = value.into();
        Ok(Self {
            locator,
            data_type: value.data_type(),
            value,
            collection_time,
            ttl_seconds: validate_ttl(ttl_seconds)?,
            unit,
        })
    }

    /// The series this sample belongs to.
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The sample value.
    #[must_use]
    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Collection timestamp in epoch milliseconds.
    #[must_use]
    pub fn collection_time(&self) -> i64 {
        self.collection_time
    }

    /// TTL in seconds.
    #[must_use]
    pub fn ttl_seconds(&self) -> i32 {
        self.ttl_seconds
    }

    /// The type derived from the value at construction.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Optional unit (e.g. "bytes").
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Returns true if the value is an integer or float.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.data_type.is_numeric()
    }

    /// Returns true if the value is a string.
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.data_type.is_string()
    }

    /// Returns true if the value is a boolean.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.data_type.is_boolean()
    }

    /// Resets the TTL from a duration.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidTtl`] if the duration in whole seconds is
    /// not in `(0, i32::MAX)`. The previous TTL is kept on error.
    pub fn set_ttl(&mut self, ttl: Duration) -> Result<(), MetricError> {
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.ttl_seconds = validate_ttl(secs)?;
        Ok(())
    }

    /// Resets the TTL in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidTtl`] if `ttl_seconds` is not in
    /// `(0, i32::MAX)`. The previous TTL is kept on error.
    pub fn set_ttl_seconds(&mut self, ttl_seconds: i32) -> Result<(), MetricError> {
        self.ttl_seconds = validate_ttl(i64::from(ttl_seconds))?;
        Ok(())
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.locator,
            self.value,
            self.data_type,
            self.ttl_seconds,
            self.unit.as_deref().unwrap_or("")
        )
    }
}
