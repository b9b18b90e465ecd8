//! Fallback strategy engine
//!
//! Maps a [`DetectionType`] to an ordered list of recovery strategies, runs
//! them in bounded rounds and learns which ones work through an exponential
//! moving average of their outcomes.

pub mod engine;
pub mod strategies;

pub use engine::{FallbackEngine, FallbackStatistics};
pub use strategies::{
    BrowserRestart, DelayRandomization, ManualIntervention, SessionReset, StrategyAction,
    StrategyRegistry,
};

use crate::detection::DetectionType;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Recovery strategies. None of them disguise automation; the last resort
/// is always a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Randomised cool-down before trying again
    DelayRandomization,
    /// Clear cookies and storage on the active context
    SessionReset,
    /// Ask the caller to relaunch the browser
    BrowserRestart,
    /// Capture evidence and hand over to a person
    ManualIntervention,
}

impl FallbackStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackStrategy::DelayRandomization => "delay_randomization",
            FallbackStrategy::SessionReset => "session_reset",
            FallbackStrategy::BrowserRestart => "browser_restart",
            FallbackStrategy::ManualIntervention => "manual_intervention",
        }
    }

    /// Built-in candidate list, ordered by expected effectiveness
    pub fn defaults_for(detection: DetectionType) -> Vec<FallbackStrategy> {
        use FallbackStrategy::*;
        match detection {
            DetectionType::Captcha | DetectionType::Recaptcha => {
                vec![DelayRandomization, ManualIntervention]
            }
            DetectionType::BotDetection => vec![ManualIntervention],
            DetectionType::RateLimiting
            | DetectionType::SecurityCheck
            | DetectionType::UnusualActivity => vec![DelayRandomization, ManualIntervention],
            DetectionType::AccessDenied => vec![SessionReset, BrowserRestart, ManualIntervention],
            DetectionType::VerificationRequired => vec![ManualIntervention],
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one strategy execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackResult {
    pub success: bool,
    pub strategy_used: FallbackStrategy,
    pub detection_bypassed: bool,
    pub error_message: Option<String>,
    pub retry_recommended: bool,
    pub next_strategy: Option<FallbackStrategy>,
}

impl FallbackResult {
    pub fn succeeded(strategy: FallbackStrategy) -> Self {
        Self {
            success: true,
            strategy_used: strategy,
            detection_bypassed: false,
            error_message: None,
            retry_recommended: false,
            next_strategy: None,
        }
    }

    pub fn failed(strategy: FallbackStrategy, message: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy_used: strategy,
            detection_bypassed: false,
            error_message: Some(message.into()),
            retry_recommended: false,
            next_strategy: None,
        }
    }

    pub fn bypassed(mut self) -> Self {
        self.detection_bypassed = true;
        self
    }

    pub fn recommend_retry(mut self) -> Self {
        self.retry_recommended = true;
        self
    }
}

/// One strategy execution inside a detection event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: FallbackStrategy,
    pub success: bool,
    pub round: u32,
    pub error: Option<String>,
    /// Candidate tried after this one failed within the same round
    #[serde(default)]
    pub next_strategy: Option<FallbackStrategy>,
}

/// History entry for one `handle` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub timestamp: DateTime<Utc>,
    pub detection: DetectionType,
    pub url: String,
    pub title: String,
    pub attempts: Vec<StrategyAttempt>,
    pub resolved: bool,
}

/// Uniform random duration in `[min_ms, max_ms]`
pub(crate) fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_detection_has_candidates() {
        for detection in DetectionType::ALL {
            let candidates = FallbackStrategy::defaults_for(detection);
            assert!(!candidates.is_empty());
            assert_eq!(candidates.last(), Some(&FallbackStrategy::ManualIntervention));
        }
    }

    #[test]
    fn test_jitter_bounds() {
        for _ in 0..100 {
            let d = jitter(3, 10);
            assert!(d >= Duration::from_millis(3) && d <= Duration::from_millis(10));
        }
        assert_eq!(jitter(5, 5), Duration::from_millis(5));
        assert_eq!(jitter(0, 0), Duration::ZERO);
    }
}
