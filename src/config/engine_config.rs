//! Configuration types — learning parameters as operator-tunable TOML values.
//!
//! Each struct implements `Default` with the recommended values, so behavior
//! is unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("engine.dimension must be positive (got {0})")]
    InvalidDimension(usize),

    #[error("engine.step_size must be positive (got {0})")]
    InvalidStepSize(f64),

    #[error("engine.step_decay_rate must be in (0, 1] (got {0})")]
    InvalidDecayRate(f64),

    #[error("engine.min_step_size must be non-negative and ≤ step_size (got {min}, step_size {step})")]
    InvalidMinStepSize { min: f64, step: f64 },

    #[error("engine.epochs_per_rebuild must be positive")]
    InvalidEpochs,
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `SentinelConfig::load()` which searches:
/// 1. `$SENTINEL_CONFIG` env var
/// 2. `./sentinel.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// LVQ learning parameters
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SentinelConfig {
    /// Load configuration using the standard search order. Falls back to the
    /// next source (and ultimately to defaults) on any load failure.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("SENTINEL_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from SENTINEL_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SENTINEL_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SENTINEL_CONFIG points to non-existent file, falling back");
            }
        }

        let local = Path::new("sentinel.toml");
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded config from ./sentinel.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./sentinel.toml, using defaults");
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.engine.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Engine Section
// ============================================================================

/// LVQ learning parameters — the entire tunable surface of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of feature dimensions expected from input vectors.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Initial step size. Recommended: 0.5.
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// The step size multiplies by this after each epoch. Recommended: 0.99.
    #[serde(default = "default_step_decay_rate")]
    pub step_decay_rate: f64,

    /// The step size stops decreasing at this floor. Recommended: 0.10.
    #[serde(default = "default_min_step_size")]
    pub min_step_size: f64,

    /// Training epochs run per model rebuild.
    #[serde(default = "default_epochs_per_rebuild")]
    pub epochs_per_rebuild: u32,
}

fn default_dimension() -> usize {
    crate::features::FEATURE_COUNT
}

fn default_step_size() -> f64 {
    0.5
}

fn default_step_decay_rate() -> f64 {
    0.99
}

fn default_min_step_size() -> f64 {
    0.10
}

fn default_epochs_per_rebuild() -> u32 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            step_size: default_step_size(),
            step_decay_rate: default_step_decay_rate(),
            min_step_size: default_min_step_size(),
            epochs_per_rebuild: default_epochs_per_rebuild(),
        }
    }
}

impl EngineConfig {
    /// Validate every learning parameter, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }
        if !(self.step_size > 0.0) {
            return Err(ConfigError::InvalidStepSize(self.step_size));
        }
        if !(self.step_decay_rate > 0.0 && self.step_decay_rate <= 1.0) {
            return Err(ConfigError::InvalidDecayRate(self.step_decay_rate));
        }
        if !(self.min_step_size >= 0.0 && self.min_step_size <= self.step_size) {
            return Err(ConfigError::InvalidMinStepSize {
                min: self.min_step_size,
                step: self.step_size,
            });
        }
        if self.epochs_per_rebuild == 0 {
            return Err(ConfigError::InvalidEpochs);
        }
        Ok(())
    }
}
