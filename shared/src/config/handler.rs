//! Rollup handler configuration.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Environment variable enabling or disabling on-read backfill.
pub const BACKFILL_ENABLED_ENV: &str = "STRATA_BACKFILL_ENABLED";

/// Environment variable setting the number of concurrent backfill fetches.
pub const BACKFILL_PARALLELISM_ENV: &str = "STRATA_BACKFILL_PARALLELISM";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue {
        /// The variable name.
        name: &'static str,
        /// The raw value.
        value: String,
    },

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Configuration of the read-time rollup handler.
///
/// Configuration values can be set via environment variables:
/// - `STRATA_BACKFILL_ENABLED`: Synthesize missing rollups on read (default: true)
/// - `STRATA_BACKFILL_PARALLELISM`: Concurrent raw fetches per gap (default: 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RollupConfig {
    /// Whether trailing coverage gaps are filled from raw data.
    pub backfill_enabled: bool,

    /// Number of sub-range fetches run at once while filling a gap.
    #[validate(range(min = 1, max = 64, message = "Backfill parallelism must be 1..=64"))]
    pub backfill_parallelism: usize,
}

impl RollupConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or if the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a configuration from variables resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`RollupConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backfill_enabled = match lookup(BACKFILL_ENABLED_ENV) {
            Some(v) => parse_bool(&v).ok_or(ConfigError::InvalidValue {
                name: BACKFILL_ENABLED_ENV,
                value: v,
            })?,
            None => defaults.backfill_enabled,
        };

        let backfill_parallelism = match lookup(BACKFILL_PARALLELISM_ENV) {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: BACKFILL_PARALLELISM_ENV,
                value: v,
            })?,
            None => defaults.backfill_parallelism,
        };

        let config = Self {
            backfill_enabled,
            backfill_parallelism,
        };
        config.validate_config()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `backfill_parallelism` is outside `1..=64`.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            backfill_enabled: true,
            backfill_parallelism: 1,
        }
    }
}
