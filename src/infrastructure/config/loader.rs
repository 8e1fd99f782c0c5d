use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Model id for '{0}' cannot be empty")]
    EmptyModelId(&'static str),

    #[error("Invalid failure_threshold: {0}. Must be at least 1")]
    InvalidFailureThreshold(u32),

    #[error("Invalid success_threshold: {0}. Must be at least 1")]
    InvalidSuccessThreshold(u32),

    #[error("Invalid open_timeout_secs: {0}. Must be positive")]
    InvalidOpenTimeout(u64),

    #[error("Invalid max_fallback_depth: {0}. Must be at least 1")]
    InvalidFallbackDepth(u32),

    #[error("Invalid max_fallback_cost_usd: {0}. Must be positive")]
    InvalidFallbackCost(f64),

    #[error("Invalid max_steps: {0}. Must be between 1 and 50")]
    InvalidMaxSteps(u32),

    #[error("Invalid tool_call_ceiling: {0}. Must be at least 1")]
    InvalidToolCallCeiling(u32),

    #[error("Invalid correction_threshold: {0}. Must be within [0, 1]")]
    InvalidCorrectionThreshold(f64),

    #[error(
        "Invalid evidence thresholds: low ({0}) must be below high ({1}) and both within [0, 1]"
    )]
    InvalidEvidenceThresholds(f64, f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .reagent/config.yaml (project config)
    /// 3. .reagent/local.yaml (project local overrides, optional)
    /// 4. Environment variables (REAGENT_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.reagent/) so multiple
    /// deployments on one machine can carry different model stacks.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".reagent/config.yaml"))
            .merge(Yaml::file(".reagent/local.yaml"))
            .merge(Env::prefixed("REAGENT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pro", &config.models.pro),
            ("flash", &config.models.flash),
            ("fallback", &config.models.fallback),
            ("secondary", &config.models.secondary),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyModelId(field));
            }
        }

        let gateway = &config.gateway;
        if gateway.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(
                gateway.failure_threshold,
            ));
        }
        if gateway.success_threshold == 0 {
            return Err(ConfigError::InvalidSuccessThreshold(
                gateway.success_threshold,
            ));
        }
        if gateway.open_timeout_secs == 0 {
            return Err(ConfigError::InvalidOpenTimeout(gateway.open_timeout_secs));
        }
        if gateway.max_fallback_depth == 0 {
            return Err(ConfigError::InvalidFallbackDepth(gateway.max_fallback_depth));
        }
        if gateway.max_fallback_cost_usd <= 0.0 {
            return Err(ConfigError::InvalidFallbackCost(
                gateway.max_fallback_cost_usd,
            ));
        }

        let engine = &config.engine;
        if engine.max_steps == 0 || engine.max_steps > 50 {
            return Err(ConfigError::InvalidMaxSteps(engine.max_steps));
        }
        if engine.tool_call_ceiling == 0 {
            return Err(ConfigError::InvalidToolCallCeiling(engine.tool_call_ceiling));
        }
        if !(0.0..=1.0).contains(&engine.correction_threshold) {
            return Err(ConfigError::InvalidCorrectionThreshold(
                engine.correction_threshold,
            ));
        }
        let low = engine.evidence_low;
        let high = engine.evidence_high;
        if low >= high || !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) {
            return Err(ConfigError::InvalidEvidenceThresholds(low, high));
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
}
