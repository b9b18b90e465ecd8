//! Outcome reporting
//!
//! Reporters are fire-and-forget: [`Reporter::record`] returns nothing and
//! implementations keep their own failures to themselves.

pub mod json_file;

pub use json_file::{JsonFileReporter, ReportSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Captcha,
    Verification,
    TwoFactor,
    Success,
    Error,
    Blocked,
    UnusualActivity,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 7] = [
        ReportCategory::Captcha,
        ReportCategory::Verification,
        ReportCategory::TwoFactor,
        ReportCategory::Success,
        ReportCategory::Error,
        ReportCategory::Blocked,
        ReportCategory::UnusualActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Captcha => "captcha",
            ReportCategory::Verification => "verification",
            ReportCategory::TwoFactor => "two_factor",
            ReportCategory::Success => "success",
            ReportCategory::Error => "error",
            ReportCategory::Blocked => "blocked",
            ReportCategory::UnusualActivity => "unusual_activity",
        }
    }

    /// Subdirectory used by [`JsonFileReporter`]
    pub fn dir_name(&self) -> &'static str {
        match self {
            ReportCategory::Error => "errors",
            other => other.as_str(),
        }
    }

    pub fn event(&self) -> &'static str {
        match self {
            ReportCategory::Captcha => "captcha_detected",
            ReportCategory::Verification => "email_verification_required",
            ReportCategory::TwoFactor => "two_factor_verification_required",
            ReportCategory::Success => "provisioning_completed",
            ReportCategory::Error => "error",
            ReportCategory::Blocked => "account_blocked",
            ReportCategory::UnusualActivity => "unusual_activity_detected",
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ReportCategory::Captcha => "manual_intervention_required",
            ReportCategory::Verification | ReportCategory::TwoFactor => "verification_pending",
            ReportCategory::Success => "success",
            ReportCategory::Error => "failed",
            ReportCategory::Blocked => "blocked",
            ReportCategory::UnusualActivity => "security_challenge",
        }
    }

    pub fn action_taken(&self) -> &'static str {
        match self {
            ReportCategory::Captcha => "evidence_captured_for_manual_solving",
            ReportCategory::Verification
            | ReportCategory::TwoFactor
            | ReportCategory::Blocked => "session_closed_for_this_account",
            ReportCategory::Success => "artifact_saved",
            ReportCategory::Error => "error_logged_and_reported",
            ReportCategory::UnusualActivity => "manual_intervention_required",
        }
    }

    pub fn next_action(&self) -> &'static str {
        match self {
            ReportCategory::Captcha => "wait_for_manual_captcha_solving",
            ReportCategory::UnusualActivity => "wait_for_manual_intervention",
            _ => "continue_with_next_account",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report as persisted or kept in memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub timestamp: DateTime<Utc>,
    pub account: String,
    pub category: ReportCategory,
    pub event: String,
    pub status: String,
    pub message: String,
    pub screenshot: Option<String>,
    pub action_taken: String,
    pub next_action: String,
}

impl ReportEntry {
    pub fn new(
        category: ReportCategory,
        account: &str,
        detail: &str,
        screenshot: Option<&Path>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            account: account.to_string(),
            category,
            event: category.event().to_string(),
            status: category.status().to_string(),
            message: detail.to_string(),
            screenshot: screenshot.map(|p| p.display().to_string()),
            action_taken: category.action_taken().to_string(),
            next_action: category.next_action().to_string(),
        }
    }
}

/// Sink for per-account reports
pub trait Reporter: Send + Sync {
    fn record(
        &self,
        category: ReportCategory,
        account_id: &str,
        detail: &str,
        screenshot: Option<&Path>,
    );
}

/// Writes reports to the log only
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn record(
        &self,
        category: ReportCategory,
        account_id: &str,
        detail: &str,
        screenshot: Option<&Path>,
    ) {
        info!(
            account = account_id,
            %category,
            screenshot = ?screenshot,
            "{}",
            detail
        );
    }
}

/// Keeps reports in memory; clones share the same list
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    entries: Arc<Mutex<Vec<ReportEntry>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.lock().clone()
    }

    pub fn count(&self, category: ReportCategory) -> usize {
        self.lock().iter().filter(|e| e.category == category).count()
    }

    pub fn for_account(&self, account: &str) -> Vec<ReportEntry> {
        self.lock()
            .iter()
            .filter(|e| e.account == account)
            .cloned()
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn record(
        &self,
        category: ReportCategory,
        account_id: &str,
        detail: &str,
        screenshot: Option<&Path>,
    ) {
        self.lock()
            .push(ReportEntry::new(category, account_id, detail, screenshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_shares_entries() {
        let reporter = MemoryReporter::new();
        let clone = reporter.clone();
        clone.record(ReportCategory::Captcha, "a@example.com", "captcha", None);
        clone.record(
            ReportCategory::Success,
            "b@example.com",
            "done",
            Some(Path::new("shots/b.png")),
        );

        assert_eq!(reporter.entries().len(), 2);
        assert_eq!(reporter.count(ReportCategory::Captcha), 1);
        let b = reporter.for_account("b@example.com");
        assert_eq!(b[0].screenshot.as_deref(), Some("shots/b.png"));
        assert_eq!(b[0].next_action, "continue_with_next_account");
    }

    #[test]
    fn test_entry_fields_follow_category() {
        let entry = ReportEntry::new(ReportCategory::TwoFactor, "a", "check phone", None);
        assert_eq!(entry.event, "two_factor_verification_required");
        assert_eq!(entry.status, "verification_pending");
        assert_eq!(ReportCategory::Error.dir_name(), "errors");
    }
}
