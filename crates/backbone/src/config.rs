//! Backbone configuration.
//!
//! Settings can be deserialized (every field has a default) or read from the
//! process environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `WORDSORT_SCRATCH_POOL_LIMIT` | `scratch_pool_limit` | 4 |
//! | `WORDSORT_SCRATCH_MAX_CAPACITY` | `max_retained_capacity` | 1024 |
//! | `WORDSORT_LOG` | `log_filter` | `wordsort_backbone=info` |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const SCRATCH_POOL_LIMIT_VAR: &str = "WORDSORT_SCRATCH_POOL_LIMIT";
pub const SCRATCH_MAX_CAPACITY_VAR: &str = "WORDSORT_SCRATCH_MAX_CAPACITY";
pub const LOG_FILTER_VAR: &str = "WORDSORT_LOG";

const DEFAULT_SCRATCH_POOL_LIMIT: usize = 4;
const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024;
const DEFAULT_LOG_FILTER: &str = "wordsort_backbone=info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackboneConfig {
    /// Scratch buffers kept per message type for publish snapshots.
    /// Zero disables pooling.
    pub scratch_pool_limit: usize,

    /// Buffers that grew beyond this capacity are freed instead of pooled.
    pub max_retained_capacity: usize,

    /// Fallback `tracing` filter for binaries when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for BackboneConfig {
    fn default() -> Self {
        Self {
            scratch_pool_limit: DEFAULT_SCRATCH_POOL_LIMIT,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl BackboneConfig {
    /// Read settings from the process environment.
    ///
    /// Unset variables use their defaults. Unparseable values are logged and
    /// replaced by the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let scratch_pool_limit =
            parse_or_default(&lookup, SCRATCH_POOL_LIMIT_VAR, defaults.scratch_pool_limit);
        let max_retained_capacity = parse_or_default(
            &lookup,
            SCRATCH_MAX_CAPACITY_VAR,
            defaults.max_retained_capacity,
        );
        let log_filter = lookup(LOG_FILTER_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.log_filter);

        Self {
            scratch_pool_limit,
            max_retained_capacity,
            log_filter,
        }
    }

    /// Read settings through `lookup`, rejecting unparseable values.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            scratch_pool_limit: parse_var(&lookup, SCRATCH_POOL_LIMIT_VAR)?
                .unwrap_or(defaults.scratch_pool_limit),
            max_retained_capacity: parse_var(&lookup, SCRATCH_MAX_CAPACITY_VAR)?
                .unwrap_or(defaults.max_retained_capacity),
            log_filter: lookup(LOG_FILTER_VAR).unwrap_or(defaults.log_filter),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                reason: "must not be empty".to_string(),
            });
        }
        if self.scratch_pool_limit > 0 && self.max_retained_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "max_retained_capacity",
                reason: "must be positive while scratch pooling is enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Whether publish snapshots reuse pooled buffers.
    pub fn pooling_enabled(&self) -> bool {
        self.scratch_pool_limit > 0 && self.max_retained_capacity > 0
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}

fn parse_or_default<F, T>(lookup: &F, var: &'static str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
{
    match parse_var(lookup, var) {
        Ok(value) => value.unwrap_or(default),
        Err(e) => {
            tracing::warn!(error = %e, default = %default, "Using default setting");
            default
        }
    }
}
