//! Hierarchical configuration loading.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::ReflexConfig;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid tier_threshold: {0}. Must be positive")]
    InvalidTierThreshold(f64),

    #[error("Invalid top_n: {0}. Must be at least 1")]
    InvalidTopN(usize),

    #[error("Invalid rate limit: max_sessions must be at least 1")]
    InvalidRateLimit,

    #[error("Invalid threshold {name}: {value}. Must be within [0, 1]")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("Invalid chars_per_token: {0}. Must be positive")]
    InvalidCharsPerToken(f64),

    #[error("Invalid drift sensitivity: {0}. Must be at least 1")]
    InvalidSensitivity(u32),

    #[error("Invalid min_observations: {0}. Cannot be 0")]
    InvalidMinObservations(u64),

    #[error("Storage root_dir cannot be empty")]
    EmptyRootDir,

    #[error("Invalid retention: max_entries must be at least 1")]
    InvalidRetention,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .reflex/config.yaml (project config)
    /// 3. .reflex/local.yaml (project local overrides, optional)
    /// 4. Environment variables (REFLEX_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.reflex/) so multiple
    /// observed projects on one machine stay independent.
    pub fn load() -> Result<ReflexConfig> {
        let config: ReflexConfig = Figment::new()
            .merge(Serialized::defaults(ReflexConfig::default()))
            .merge(Yaml::file(".reflex/config.yaml"))
            .merge(Yaml::file(".reflex/local.yaml"))
            .merge(Env::prefixed("REFLEX_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<ReflexConfig> {
        let config: ReflexConfig = Figment::new()
            .merge(Serialized::defaults(ReflexConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &ReflexConfig) -> Result<(), ConfigError> {
        if config.storage.root_dir.is_empty() {
            return Err(ConfigError::EmptyRootDir);
        }
        if config.storage.retention.max_entries == 0 {
            return Err(ConfigError::InvalidRetention);
        }

        if config.observer.tier_threshold <= 0.0 {
            return Err(ConfigError::InvalidTierThreshold(
                config.observer.tier_threshold,
            ));
        }
        if config.observer.top_n == 0 {
            return Err(ConfigError::InvalidTopN(config.observer.top_n));
        }
        if config.observer.rate_limit.max_sessions == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }

        if config.detector.chars_per_token <= 0.0 {
            return Err(ConfigError::InvalidCharsPerToken(
                config.detector.chars_per_token,
            ));
        }
        Self::check_unit_interval("detector.min_determinism", config.detector.min_determinism)?;
        Self::check_unit_interval(
            "detector.confidence_threshold",
            config.detector.confidence_threshold,
        )?;

        Self::check_unit_interval(
            "gatekeeper.min_determinism",
            config.gatekeeper.min_determinism,
        )?;
        Self::check_unit_interval("gatekeeper.min_confidence", config.gatekeeper.min_confidence)?;
        if config.gatekeeper.min_observations == 0 {
            return Err(ConfigError::InvalidMinObservations(0));
        }
        for (name, threshold) in [
            ("gatekeeper.min_f1", config.gatekeeper.min_f1),
            ("gatekeeper.min_accuracy", config.gatekeeper.min_accuracy),
            ("gatekeeper.min_mcc", config.gatekeeper.min_mcc),
        ] {
            if let Some(value) = threshold {
                Self::check_unit_interval(name, value)?;
            }
        }

        if config.drift.sensitivity == 0 {
            return Err(ConfigError::InvalidSensitivity(0));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }

    fn check_unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ThresholdOutOfRange { name, value });
        }
        Ok(())
    }
}
