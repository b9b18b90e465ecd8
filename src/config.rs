//! Configuration management for the provisioner
//!
//! Provides TOML-based configuration with defaults, validation and a small
//! set of environment overrides.
//! Location: ~/.provisioner/config.toml

use crate::detection::ClassifierRules;
use crate::errors::{AutomationError, Result};
use crate::retry::{ErrorCategory, RetryPolicy};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration, read-only to the core once loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeouts: TimeoutsConfig,
    pub retry: RetryConfig,
    pub fallback: FallbackConfig,
    pub classifier: ClassifierRules,
    pub verification: VerificationConfig,
    pub challenges: ChallengeConfig,
    pub batch: BatchConfig,
    pub naming: NamingConfig,
    pub paths: PathsConfig,
}

/// Per-phase timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub navigation_ms: u64,
    pub element_ms: u64,
    pub download_ms: u64,
    pub settle_ms: u64,
}

/// Retry controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Outer cap on attempts regardless of category
    pub hard_attempt_cap: u32,

    /// Per-category policy overrides
    pub policies: HashMap<ErrorCategory, RetryPolicy>,
}

/// Fallback strategy engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub max_attempts: u32,
    pub round_delay_min_ms: u64,
    pub round_delay_max_ms: u64,
    pub cooldown_min_ms: u64,
    pub cooldown_max_ms: u64,
}

/// Step verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub attempts: u32,
    pub delay_ms: u64,
    pub reload_between_attempts: bool,
}

/// How to treat challenges that the fallback engine could not clear
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Keep the session open and poll until a human resolves the challenge
    pub await_manual_resolution: bool,
    pub manual_resolution_timeout_ms: u64,
    pub manual_poll_interval_ms: u64,
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency_limit: usize,
}

/// Resource naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub prefix: String,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: String,
    pub reports_dir: String,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            element_ms: 30_000,
            download_ms: 60_000,
            settle_ms: 3_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            hard_attempt_cap: 10,
            policies: HashMap::new(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            round_delay_min_ms: 5_000,
            round_delay_max_ms: 15_000,
            cooldown_min_ms: 3_000,
            cooldown_max_ms: 10_000,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 5_000,
            reload_between_attempts: true,
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            await_manual_resolution: false,
            manual_resolution_timeout_ms: 300_000,
            manual_poll_interval_ms: 5_000,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency_limit: 3 }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            prefix: "app".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            reports_dir: "reports".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location, or built-in defaults if absent
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Config::default()),
        }
    }

    /// ~/.provisioner/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".provisioner").join("config.toml"))
    }

    /// Apply `PROVISIONER_*` overrides through the given lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cap) = lookup("PROVISIONER_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.retry.hard_attempt_cap = cap;
        }
        if let Some(limit) = lookup("PROVISIONER_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.batch.concurrency_limit = limit;
        }
        if let Some(dir) = lookup("PROVISIONER_OUTPUT_DIR") {
            self.paths.output_dir = dir;
        }
        if let Some(dir) = lookup("PROVISIONER_REPORTS_DIR") {
            self.paths.reports_dir = dir;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.batch.concurrency_limit == 0 {
            return Err(AutomationError::ConfigError(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }

        if self.retry.hard_attempt_cap == 0 {
            return Err(AutomationError::ConfigError(
                "hard_attempt_cap must be greater than 0".to_string(),
            ));
        }

        if self.fallback.round_delay_min_ms > self.fallback.round_delay_max_ms
            || self.fallback.cooldown_min_ms > self.fallback.cooldown_max_ms
        {
            return Err(AutomationError::ConfigError(
                "fallback delay ranges must have min <= max".to_string(),
            ));
        }

        if self.classifier.min_signals_on_login_page == 0 {
            return Err(AutomationError::ConfigError(
                "min_signals_on_login_page must be at least 1".to_string(),
            ));
        }

        for (category, policy) in &self.retry.policies {
            if policy.backoff_multiplier < 1.0 {
                return Err(AutomationError::ConfigError(format!(
                    "backoff_multiplier for {} must be >= 1.0",
                    category
                )));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            AutomationError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.output_dir)
    }

    pub fn reports_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.reports_dir)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.navigation_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.element_ms)
    }

    /// Config with every wait shortened to zero, for dry runs and tests
    pub fn without_delays() -> Self {
        let mut config = Config::default();
        config.timeouts.settle_ms = 0;
        config.fallback.round_delay_min_ms = 0;
        config.fallback.round_delay_max_ms = 0;
        config.fallback.cooldown_min_ms = 0;
        config.fallback.cooldown_max_ms = 0;
        config.verification.delay_ms = 0;
        config.challenges.manual_poll_interval_ms = 0;
        for category in ErrorCategory::ALL {
            let mut policy = RetryPolicy::for_category(category);
            policy.base_delay_ms = 0;
            config.retry.policies.insert(category, policy);
        }
        config
    }
}
