//! Retry and backoff control
//! Classifies failures into categories and decides whether and when to retry

pub mod controller;
pub mod types;

pub use controller::{RetryController, RetryDecision};
pub use types::{ErrorCategory, ErrorSeverity, RetryPolicy};
