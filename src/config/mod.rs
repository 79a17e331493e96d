//! Configuration management for parquad
//!
//! Integration parameters come from three layers, lowest priority first:
//!
//! 1. Defaults embedded at compile time from `default-config.toml`
//! 2. The config file named on the command line (`key = value` lines, `#` comments)
//! 3. `PARQUAD_<KEY>` environment variables
//!
//! The file must exist. Unknown keys and malformed values are rejected rather
//! than ignored.

use crate::integrate::IntegrationRequest;
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PARQUAD_";

/// Every key accepted in a config file
pub const KEYS: [&str; 9] = [
    "abs_err",
    "rel_err",
    "x_start",
    "x_end",
    "y_start",
    "y_end",
    "init_steps_x",
    "init_steps_y",
    "max_iter",
];

/// Integration parameters read from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Absolute error tolerance
    pub abs_err: f64,

    /// Relative error tolerance
    pub rel_err: f64,

    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,

    /// Initial grid cells along x
    #[serde(deserialize_with = "whole_number")]
    pub init_steps_x: usize,

    /// Initial grid cells along y
    #[serde(deserialize_with = "whole_number")]
    pub init_steps_y: usize,

    /// Maximum refinement depth
    #[serde(deserialize_with = "whole_number")]
    pub max_iter: usize,
}

/// Failures that map to distinct process exit codes
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to open config file {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl IntegrationConfig {
    /// Load configuration from `path`, layered over defaults and under env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_str(&contents)
            .with_context(|| format!("failed to load config file: {}", path.display()))
    }

    /// Load configuration from in-memory TOML, layered like [`IntegrationConfig::load`].
    pub fn load_from_str(contents: &str) -> Result<Self> {
        let figment = Self::base()
            .merge(Toml::string(contents))
            .merge(Env::prefixed(ENV_PREFIX).only(&KEYS));

        tracing::trace!("CONFIG LOAD: merged defaults, file and environment");

        let config = Self::from_figment(figment)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.x_start, self.x_end, self.y_start, self.y_end];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(ConfigError::Invalid("bounds must be finite".to_string()).into());
        }
        if self.x_start > self.x_end || self.y_start > self.y_end {
            return Err(ConfigError::Invalid("wrong bounds for x or y".to_string()).into());
        }
        if self.abs_err <= 0.0 || self.abs_err.is_nan() {
            return Err(ConfigError::Invalid(format!(
                "abs_err must be positive, got {}",
                self.abs_err
            ))
            .into());
        }
        if self.rel_err < 0.0 || self.rel_err.is_nan() {
            return Err(ConfigError::Invalid(format!(
                "rel_err must not be negative, got {}",
                self.rel_err
            ))
            .into());
        }
        if self.init_steps_x == 0 || self.init_steps_y == 0 {
            return Err(ConfigError::Invalid(
                "init_steps_x and init_steps_y must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Combine with the run-time counts into an engine request.
    pub fn to_request(&self, thread_count: usize, points_count: u64) -> IntegrationRequest {
        IntegrationRequest {
            thread_count,
            points_count,
            abs_err: self.abs_err,
            rel_err: self.rel_err,
            x_start: self.x_start,
            x_end: self.x_end,
            y_start: self.y_start,
            y_end: self.y_end,
            init_steps_x: self.init_steps_x,
            init_steps_y: self.init_steps_y,
            max_iter: self.max_iter,
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    fn base() -> Figment {
        Figment::new().merge(Toml::string(DEFAULT_CONFIG))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }
}

/// Accept `100` as well as `100.0` for count-like keys.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(n) => usize::try_from(n).map_err(D::Error::custom),
        Number::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => {
            Ok(f as usize)
        }
        Number::Float(f) => Err(D::Error::custom(format!(
            "expected a non-negative whole number, got {f}"
        ))),
    }
}
