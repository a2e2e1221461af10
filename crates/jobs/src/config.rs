// crates/jobs/src/config.rs
//! Tracking configuration: poll schedules and estimator curves per job kind.
//!
//! Loaded from an optional TOML file; every field falls back to the
//! defaults below, so a partial file only overrides what it names:
//!
//! ```toml
//! [bulk_import.schedule]
//! interval_ms = 5000
//!
//! [clone.estimator]
//! ceiling = 85.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use gource_studio_types::JobKind;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// When a poll loop fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollSchedule {
    /// Time between status probes.
    pub interval_ms: u64,
    /// Wait before the first probe so the backend can register the job.
    pub initial_delay_ms: u64,
    /// Cadence of optimistic progress ticks while no authoritative value
    /// has arrived yet. `0` disables them.
    pub heartbeat_ms: u64,
}

impl PollSchedule {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_ms > 0).then(|| Duration::from_millis(self.heartbeat_ms))
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            initial_delay_ms: 0,
            heartbeat_ms: 500,
        }
    }
}

/// Shape of the optimistic progress curve.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// The estimate never goes above this.
    pub ceiling: f64,
    /// Per-tick random increment range (before the per-item share).
    pub min_step: f64,
    pub max_step: f64,
    /// Flat increment used when the item count is zero.
    pub fallback_step: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            ceiling: 90.0,
            min_step: 1.0,
            max_step: 5.0,
            fallback_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    pub schedule: PollSchedule,
    pub estimator: EstimatorConfig,
}

/// Per-kind tracking configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub clone: KindConfig,
    pub bulk_import: KindConfig,
    pub render: KindConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            clone: KindConfig::default(),
            bulk_import: KindConfig {
                schedule: PollSchedule {
                    interval_ms: 3000,
                    initial_delay_ms: 2000,
                    heartbeat_ms: 1000,
                },
                estimator: EstimatorConfig {
                    ceiling: 95.0,
                    min_step: 5.0,
                    max_step: 15.0,
                    fallback_step: 0.5,
                },
            },
            render: KindConfig::default(),
        }
    }
}

impl TrackingConfig {
    pub fn for_kind(&self, kind: JobKind) -> &KindConfig {
        match kind {
            JobKind::Clone => &self.clone,
            JobKind::BulkImport => &self.bulk_import,
            JobKind::Render => &self.render,
        }
    }

    /// `~/.config/gource-studio/tracking.toml` (platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gource-studio").join("tracking.toml"))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No tracking config, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Malformed { message, .. } => ConfigError::Malformed {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded tracking config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Malformed {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in JobKind::ALL {
            let KindConfig {
                schedule,
                estimator,
            } = self.for_kind(kind);
            if schedule.interval_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{kind}: interval_ms must be greater than zero"
                )));
            }
            if !(0.0..=100.0).contains(&estimator.ceiling) {
                return Err(ConfigError::Invalid(format!(
                    "{kind}: estimator ceiling must be within 0..=100"
                )));
            }
            if estimator.min_step < 0.0 || estimator.max_step < estimator.min_step {
                return Err(ConfigError::Invalid(format!(
                    "{kind}: estimator step range must satisfy 0 <= min_step <= max_step"
                )));
            }
            if estimator.fallback_step < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{kind}: fallback_step must not be negative"
                )));
            }
        }
        Ok(())
    }
}
