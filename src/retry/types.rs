//! Error categories and their retry policies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Category of a failure raised while driving the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Initialization,
    Authentication,
    Captcha,
    TwoFactor,
    EmailVerification,
    AccountBlocked,
    ResourceCreation,
    CapabilityEnable,
    ConsentSetup,
    CredentialIssuance,
    ArtifactDownload,
    Network,
    Timeout,
    RateLimited,
    BotProtection,
    SuspiciousActivity,
    Unknown,
}

/// Severity used for log levels and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 17] = [
        ErrorCategory::Initialization,
        ErrorCategory::Authentication,
        ErrorCategory::Captcha,
        ErrorCategory::TwoFactor,
        ErrorCategory::EmailVerification,
        ErrorCategory::AccountBlocked,
        ErrorCategory::ResourceCreation,
        ErrorCategory::CapabilityEnable,
        ErrorCategory::ConsentSetup,
        ErrorCategory::CredentialIssuance,
        ErrorCategory::ArtifactDownload,
        ErrorCategory::Network,
        ErrorCategory::Timeout,
        ErrorCategory::RateLimited,
        ErrorCategory::BotProtection,
        ErrorCategory::SuspiciousActivity,
        ErrorCategory::Unknown,
    ];

    /// Challenge categories need a human or a different account, never a
    /// delayed repeat of the same action.
    pub fn retryable(&self) -> bool {
        !matches!(
            self,
            ErrorCategory::Captcha
                | ErrorCategory::TwoFactor
                | ErrorCategory::EmailVerification
                | ErrorCategory::AccountBlocked
                | ErrorCategory::BotProtection
                | ErrorCategory::SuspiciousActivity
        )
    }

    pub fn is_challenge(&self) -> bool {
        !self.retryable()
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ErrorCategory::Initialization | ErrorCategory::AccountBlocked => {
                ErrorSeverity::Critical
            }
            ErrorCategory::Authentication
            | ErrorCategory::ResourceCreation
            | ErrorCategory::CredentialIssuance
            | ErrorCategory::BotProtection => ErrorSeverity::High,
            ErrorCategory::Captcha
            | ErrorCategory::TwoFactor
            | ErrorCategory::EmailVerification
            | ErrorCategory::CapabilityEnable
            | ErrorCategory::ConsentSetup
            | ErrorCategory::SuspiciousActivity
            | ErrorCategory::RateLimited => ErrorSeverity::Medium,
            ErrorCategory::ArtifactDownload
            | ErrorCategory::Network
            | ErrorCategory::Timeout
            | ErrorCategory::Unknown => ErrorSeverity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Initialization => "initialization",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Captcha => "captcha",
            ErrorCategory::TwoFactor => "two_factor",
            ErrorCategory::EmailVerification => "email_verification",
            ErrorCategory::AccountBlocked => "account_blocked",
            ErrorCategory::ResourceCreation => "resource_creation",
            ErrorCategory::CapabilityEnable => "capability_enable",
            ErrorCategory::ConsentSetup => "consent_setup",
            ErrorCategory::CredentialIssuance => "credential_issuance",
            ErrorCategory::ArtifactDownload => "artifact_download",
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::BotProtection => "bot_protection",
            ErrorCategory::SuspiciousActivity => "suspicious_activity",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry budget and backoff curve for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

impl RetryPolicy {
    const fn new(max_retries: u32, base_delay_ms: u64, backoff_multiplier: f64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            backoff_multiplier,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }

    const fn capped(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Built-in policy table
    pub fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Network => Self::new(5, 2_000, 2.0),
            ErrorCategory::Timeout => Self::new(3, 5_000, 1.5),
            ErrorCategory::Initialization => Self::new(3, 3_000, 1.0),
            ErrorCategory::Authentication => Self::new(2, 10_000, 1.0),
            ErrorCategory::ResourceCreation => Self::new(5, 8_000, 1.3).capped(30_000),
            ErrorCategory::CapabilityEnable => Self::new(4, 4_000, 1.2),
            ErrorCategory::ConsentSetup => Self::new(3, 6_000, 1.2),
            ErrorCategory::CredentialIssuance => Self::new(4, 4_000, 1.2),
            ErrorCategory::ArtifactDownload => Self::new(5, 2_000, 1.5),
            ErrorCategory::RateLimited => Self::new(3, 15_000, 2.0).capped(60_000),
            ErrorCategory::Unknown => Self::new(1, 1_000, 1.0),
            ErrorCategory::Captcha
            | ErrorCategory::TwoFactor
            | ErrorCategory::EmailVerification
            | ErrorCategory::AccountBlocked
            | ErrorCategory::BotProtection
            | ErrorCategory::SuspiciousActivity => Self::new(0, 0, 1.0),
        }
    }

    /// `base * multiplier^attempt`, capped at `max_delay_ms`
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0);
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw = self.base_delay_ms as f64 * multiplier.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}
