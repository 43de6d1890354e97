//! Engine configuration.
//!
//! One flat struct with sensible defaults; embedders typically deserialize it
//! from their own config layer and call [`EngineConfig::validate`] once at
//! startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tally_common::Granularity;
use tally_math::forecast::{DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_HORIZON};
use tally_math::{HoltWinters, ANOMALY_Z_THRESHOLD};
use thiserror::Error;

/// Default whole-report budget in milliseconds.
pub const DEFAULT_BUDGET_MS: u64 = 30_000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Tunables for report computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bucket width for all series.
    pub granularity: Granularity,
    /// Number of periods each forecast extends.
    pub forecast_horizon: usize,
    /// Holt-Winters level smoothing factor, in (0, 1].
    pub alpha: f64,
    /// Holt-Winters trend smoothing factor, in [0, 1].
    pub beta: f64,
    /// |z| above which a bucket is flagged anomalous.
    pub anomaly_threshold: f64,
    /// Whole-report wall-clock budget in milliseconds.
    pub budget_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            granularity: Granularity::Day,
            forecast_horizon: DEFAULT_HORIZON,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            anomaly_threshold: ANOMALY_Z_THRESHOLD,
            budget_ms: DEFAULT_BUDGET_MS,
        }
    }
}

impl EngineConfig {
    /// Semantic validation of the tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if HoltWinters::new(self.alpha, self.beta).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "alpha/beta",
                message: format!(
                    "smoothing factors out of range: alpha={} beta={}",
                    self.alpha, self.beta
                ),
            });
        }
        if self.forecast_horizon == 0 {
            return Err(ConfigError::InvalidValue {
                field: "forecast_horizon",
                message: "horizon must be at least 1".to_string(),
            });
        }
        if !(self.anomaly_threshold > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "anomaly_threshold",
                message: format!("threshold must be positive, got {}", self.anomaly_threshold),
            });
        }
        if self.budget_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "budget_ms",
                message: "budget must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// The smoother configured by `alpha`/`beta`.
    ///
    /// Callers are expected to have validated the config; out-of-range
    /// factors fall back to the defaults.
    pub fn smoother(&self) -> HoltWinters {
        HoltWinters::new(self.alpha, self.beta).unwrap_or_default()
    }

    /// The report budget as a [`Duration`].
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}
