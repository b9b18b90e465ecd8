//! Error types for the provisioner
//!
//! Every fallible operation in the crate returns [`Result`]. Errors carry
//! enough text for the retry controller to classify them by keyword.

use crate::retry::ErrorCategory;
use thiserror::Error;

/// Main error type for the provisioning workflow
#[derive(Error, Debug)]
pub enum AutomationError {
    /// State machine transition errors
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Page driver reported a failure (browser crashed, page closed, ...)
    #[error("Browser driver error: {0}")]
    Driver(String),

    /// Navigation to a URL did not complete
    #[error("Navigation to {url} failed")]
    Navigation { url: String },

    /// None of the selector candidates matched a visible element
    #[error("Element not found in {step}: {what}")]
    ElementNotFound { step: String, what: String },

    /// Network level failure (DNS, connection reset, ...)
    #[error("Network connection error: {0}")]
    Network(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A step ran but none of its verification probes confirmed it
    #[error("Verification failed for {step}")]
    VerificationFailed { step: String },

    /// The remote UI refused the generated resource name twice
    #[error("Resource name rejected for project: {name}")]
    NameRejected { name: String },

    /// Retry budget exhausted, or the failure was not retryable
    #[error("{category} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        category: ErrorCategory,
        attempts: u32,
        last: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Automation error: {0}")]
    Generic(String),
}

impl AutomationError {
    /// Category attached by the retry wrapper, if this error went through one
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            AutomationError::RetriesExhausted { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, AutomationError>;

/// Convert anyhow errors to AutomationError
impl From<anyhow::Error> for AutomationError {
    fn from(err: anyhow::Error) -> Self {
        AutomationError::Generic(format!("{:#}", err))
    }
}

impl From<toml::de::Error> for AutomationError {
    fn from(err: toml::de::Error) -> Self {
        AutomationError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutomationError::Timeout { duration_ms: 30000 };
        assert!(err.to_string().contains("30000"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = AutomationError::InvalidTransition {
            from: "Init".to_string(),
            to: "Done".to_string(),
            reason: "Cannot skip steps".to_string(),
        };
        assert!(err.to_string().contains("Init"));
        assert!(err.to_string().contains("Done"));
    }

    #[test]
    fn test_retries_exhausted_carries_category() {
        let err = AutomationError::RetriesExhausted {
            category: ErrorCategory::ResourceCreation,
            attempts: 3,
            last: "button missing".to_string(),
        };
        assert_eq!(err.category(), Some(ErrorCategory::ResourceCreation));
        assert!(err.to_string().contains("3 attempt"));
        assert_eq!(AutomationError::Generic("x".into()).category(), None);
    }

    #[test]
    fn test_anyhow_conversion_keeps_chain() {
        let err: AutomationError = anyhow::anyhow!("inner").context("outer").into();
        let text = err.to_string();
        assert!(text.contains("outer"));
        assert!(text.contains("inner"));
    }
}
