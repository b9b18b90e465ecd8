//! Retry controller with per-category exponential backoff
//!
//! Failures are classified by keyword rules into an [`ErrorCategory`]; each
//! category carries its own [`RetryPolicy`]. Challenge categories are never
//! retried. A hard outer cap bounds every loop regardless of category.

use crate::config::RetryConfig;
use crate::errors::{AutomationError, Result};
use crate::retry::types::{ErrorCategory, ErrorSeverity, RetryPolicy};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Which text a classification rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Message,
    Context,
}

/// One keyword rule: all `required` groups must match (any keyword per group)
struct ClassificationRule {
    scope: Scope,
    required: &'static [&'static [&'static str]],
    /// Additionally require the context to look like the login phase
    login_context: bool,
    category: ErrorCategory,
}

const LOGIN_CONTEXT: &[&str] = &["login", "signin", "sign_in", "authentication"];

/// Ordered rule table; the first match wins
const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["rate limit", "too many requests"]],
        login_context: false,
        category: ErrorCategory::RateLimited,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["automated queries", "not a robot", "bot detected", "automation detected"]],
        login_context: false,
        category: ErrorCategory::BotProtection,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["suspicious activity", "unusual activity"]],
        login_context: false,
        category: ErrorCategory::SuspiciousActivity,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["browser", "webdriver", "driver", "devtools"]],
        login_context: false,
        category: ErrorCategory::Initialization,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["network", "connection", "dns", "resolve"]],
        login_context: false,
        category: ErrorCategory::Network,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["timeout", "timed out"]],
        login_context: false,
        category: ErrorCategory::Timeout,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["captcha", "recaptcha"]],
        login_context: true,
        category: ErrorCategory::Captcha,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["verification", "verify"], &["phone", "sms", "code"]],
        login_context: true,
        category: ErrorCategory::TwoFactor,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["verification", "verify"]],
        login_context: true,
        category: ErrorCategory::EmailVerification,
    },
    ClassificationRule {
        scope: Scope::Message,
        required: &[&["blocked", "suspended", "disabled"]],
        login_context: true,
        category: ErrorCategory::AccountBlocked,
    },
    ClassificationRule {
        scope: Scope::Context,
        required: &[],
        login_context: true,
        category: ErrorCategory::Authentication,
    },
    ClassificationRule {
        scope: Scope::Context,
        required: &[&["project", "resource"]],
        login_context: false,
        category: ErrorCategory::ResourceCreation,
    },
    ClassificationRule {
        scope: Scope::Context,
        required: &[&["api", "capability"], &["enable"]],
        login_context: false,
        category: ErrorCategory::CapabilityEnable,
    },
    ClassificationRule {
        scope: Scope::Context,
        required: &[&["oauth"], &["consent"]],
        login_context: false,
        category: ErrorCategory::ConsentSetup,
    },
    ClassificationRule {
        scope: Scope::Context,
        required: &[&["credential"]],
        login_context: false,
        category: ErrorCategory::CredentialIssuance,
    },
    ClassificationRule {
        scope: Scope::Context,
        required: &[&["download", "artifact"]],
        login_context: false,
        category: ErrorCategory::ArtifactDownload,
    },
];

impl ClassificationRule {
    fn matches(&self, message: &str, context: &str) -> bool {
        if self.login_context && !LOGIN_CONTEXT.iter().any(|k| context.contains(k)) {
            return false;
        }
        let haystack = match self.scope {
            Scope::Message => message,
            Scope::Context => context,
        };
        self.required
            .iter()
            .all(|group| group.iter().any(|keyword| haystack.contains(keyword)))
    }
}

/// Outcome of consulting the controller after a failure
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then invoke again
    Retry {
        category: ErrorCategory,
        delay: Duration,
    },
    /// Surface the failure to the caller
    GiveUp { category: ErrorCategory },
}

/// Retry controller with per-category policies
#[derive(Debug, Clone)]
pub struct RetryController {
    /// Policy overrides on top of the built-in table
    policies: HashMap<ErrorCategory, RetryPolicy>,

    /// Hard cap on attempts regardless of category
    hard_attempt_cap: u32,

    telemetry: TelemetryCollector,
}

impl RetryController {
    /// Create controller from retry configuration
    pub fn new(config: &RetryConfig, telemetry: TelemetryCollector) -> Self {
        Self {
            policies: config.policies.clone(),
            hard_attempt_cap: config.hard_attempt_cap.max(1),
            telemetry,
        }
    }

    /// Policy in effect for a category
    pub fn policy(&self, category: ErrorCategory) -> RetryPolicy {
        self.policies
            .get(&category)
            .copied()
            .unwrap_or_else(|| RetryPolicy::for_category(category))
    }

    /// Classify an error message plus a caller supplied context hint
    pub fn classify(&self, message: &str, context: &str) -> ErrorCategory {
        let message = message.to_lowercase();
        let context = context.to_lowercase();

        RULES
            .iter()
            .find(|rule| rule.matches(&message, &context))
            .map(|rule| rule.category)
            .unwrap_or(ErrorCategory::Unknown)
    }

    /// Classify a typed error, preferring structural information over text
    pub fn classify_error(&self, error: &AutomationError, context: &str) -> ErrorCategory {
        if let Some(category) = error.category() {
            return category;
        }
        match error {
            AutomationError::Timeout { .. } => ErrorCategory::Timeout,
            AutomationError::Network(_) => ErrorCategory::Network,
            AutomationError::Driver(_) => ErrorCategory::Initialization,
            // Selectors and URLs in these messages are not evidence of a challenge
            AutomationError::Navigation { .. }
            | AutomationError::ElementNotFound { .. }
            | AutomationError::VerificationFailed { .. }
            | AutomationError::NameRejected { .. } => self.classify("", context),
            other => self.classify(&other.to_string(), context),
        }
    }

    /// Whether a category may be retried after `attempt` failed attempts
    /// (0-based: `attempt == 0` is the first failure)
    pub fn should_retry(&self, category: ErrorCategory, attempt: u32) -> bool {
        if !category.retryable() {
            return false;
        }
        attempt < self.policy(category).max_retries
    }

    /// Backoff delay before retrying after `attempt`
    pub fn delay_for(&self, category: ErrorCategory, attempt: u32) -> Duration {
        self.policy(category).delay(attempt)
    }

    /// Decide what to do after a failure
    pub fn decide(&self, error: &AutomationError, context: &str, attempt: u32) -> RetryDecision {
        let category = self.classify_error(error, context);

        match category.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                warn!(%category, context, attempt, error = %error, "step attempt failed")
            }
            ErrorSeverity::Medium => {
                info!(%category, context, attempt, error = %error, "step attempt failed")
            }
            ErrorSeverity::Low => {
                debug!(%category, context, attempt, error = %error, "step attempt failed")
            }
        }

        if attempt + 1 >= self.hard_attempt_cap || !self.should_retry(category, attempt) {
            return RetryDecision::GiveUp { category };
        }

        RetryDecision::Retry {
            category,
            delay: self.delay_for(category, attempt),
        }
    }

    /// Execute operation with retry logic
    ///
    /// Non-retryable or exhausted failures come back as
    /// [`AutomationError::RetriesExhausted`] carrying the category.
    pub async fn execute_with_retry<F, Fut, T>(&self, context: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => match self.decide(&e, context, attempt) {
                    RetryDecision::Retry { category, delay } => {
                        self.record_retry(context, category, attempt, delay);
                        sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp { category } => {
                        return Err(Self::exhausted(e, category, attempt + 1));
                    }
                },
            }
        }
    }

    /// Log and record a scheduled retry
    pub fn record_retry(
        &self,
        context: &str,
        category: ErrorCategory,
        attempt: u32,
        delay: Duration,
    ) {
        info!(
            context,
            %category,
            next_attempt = attempt + 2,
            delay_ms = delay.as_millis() as u64,
            "retrying"
        );
        self.telemetry.record(TelemetryEvent::RetryAttempt {
            context: context.to_string(),
            category,
            attempt: attempt + 1,
        });
    }

    /// Wrap a final failure, keeping an existing category if present
    pub fn exhausted(
        error: AutomationError,
        category: ErrorCategory,
        attempts: u32,
    ) -> AutomationError {
        match error {
            already @ AutomationError::RetriesExhausted { .. } => already,
            other => AutomationError::RetriesExhausted {
                category,
                attempts,
                last: other.to_string(),
            },
        }
    }

    pub fn hard_attempt_cap(&self) -> u32 {
        self.hard_attempt_cap
    }
}
