//! Engine configuration.
//!
//! # Responsibility
//! - Collect per-deployment choices (key strategy, freshness policy, sweep cadence).
//! - The 30-day retention window is not configurable; see `RETENTION_WINDOW_MS`.
//! - Load them from JSON with defaults for every omitted field.
//!
//! # Invariants
//! - A config returned by `from_json_str`/`load_config` has passed `validate()`.

use crate::geocode::query::DEFAULT_ADDRESS_PREFIX;
use crate::highlight::surface::OverlayStyle;
use crate::key::normalizer::{KeyStrategy, MAX_COORDINATE_PRECISION};
use crate::repo::record_store::FreshnessPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Storage slot used by earlier web builds; kept so their data loads as-is.
pub const DEFAULT_STORAGE_KEY: &str = "machida_property_records";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage slot holding the record document.
    pub storage_key: String,
    pub key_strategy: KeyStrategy,
    pub sweep_interval_secs: u64,
    pub freshness_policy: FreshnessPolicy,
    /// Prepended to structured address searches.
    pub address_prefix: String,
    pub overlay_style: OverlayStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            key_strategy: KeyStrategy::default(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            freshness_policy: FreshnessPolicy::default(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            overlay_style: OverlayStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key cannot be empty".into()));
        }
        if let KeyStrategy::Coordinate { precision } = self.key_strategy {
            if precision > MAX_COORDINATE_PRECISION {
                return Err(ConfigError::Invalid(format!(
                    "key_strategy.precision must be <= {MAX_COORDINATE_PRECISION}, got {precision}"
                )));
            }
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Reads a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    EngineConfig::from_json_str(&text)
}
