//! Per-step and per-account results
//!
//! `AccountOutcome` is the only record handed back to the caller. Its
//! `steps_completed` list always follows the canonical [`WorkflowStep`]
//! order without repeats.

use crate::errors::{AutomationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Canonical workflow steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Login,
    ResourceCreation,
    CapabilityEnable,
    ConsentSetup,
    CredentialIssuance,
    ArtifactDownload,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 6] = [
        WorkflowStep::Login,
        WorkflowStep::ResourceCreation,
        WorkflowStep::CapabilityEnable,
        WorkflowStep::ConsentSetup,
        WorkflowStep::CredentialIssuance,
        WorkflowStep::ArtifactDownload,
    ];

    /// Context string handed to the retry classifier
    pub fn context(&self) -> &'static str {
        match self {
            WorkflowStep::Login => "login",
            WorkflowStep::ResourceCreation => "project_creation",
            WorkflowStep::CapabilityEnable => "api_enable",
            WorkflowStep::ConsentSetup => "oauth_consent",
            WorkflowStep::CredentialIssuance => "credential_creation",
            WorkflowStep::ArtifactDownload => "file_download",
        }
    }

    /// Zero-based position in [`WorkflowStep::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.context())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    VerificationRequired,
    Failed,
}

/// Audit trail entry for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStepResult {
    pub step_name: String,
    pub status: StepStatus,
    pub detail: String,
}

impl WorkflowStepResult {
    pub fn completed(step: WorkflowStep, detail: impl Into<String>) -> Self {
        Self::with_status(step, StepStatus::Completed, detail)
    }

    pub fn verification_required(step: WorkflowStep, detail: impl Into<String>) -> Self {
        Self::with_status(step, StepStatus::VerificationRequired, detail)
    }

    pub fn failed(step: WorkflowStep, detail: impl Into<String>) -> Self {
        Self::with_status(step, StepStatus::Failed, detail)
    }

    fn with_status(step: WorkflowStep, status: StepStatus, detail: impl Into<String>) -> Self {
        Self {
            step_name: step.context().to_string(),
            status,
            detail: detail.into(),
        }
    }
}

/// How an account run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Succeeded,
    #[default]
    Failed,
    /// Skipped: a human has to verify the account
    VerificationRequired,
    /// Skipped: the account is blocked or suspended
    Blocked,
    /// Never started because the run was stopped
    Cancelled,
}

/// Terminal record for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOutcome {
    pub account_id: String,
    pub success: bool,
    pub steps_completed: Vec<String>,
    pub errors: Vec<String>,
    pub files_created: Vec<String>,
    pub verification_required: bool,
    pub duration_seconds: f64,
    pub disposition: Disposition,
    pub resource_name: Option<String>,
    pub step_log: Vec<WorkflowStepResult>,
}

impl AccountOutcome {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            success: false,
            steps_completed: Vec::new(),
            errors: Vec::new(),
            files_created: Vec::new(),
            verification_required: false,
            duration_seconds: 0.0,
            disposition: Disposition::Failed,
            resource_name: None,
            step_log: Vec::new(),
        }
    }

    /// Outcome for an account that never started
    pub fn cancelled(account_id: impl Into<String>) -> Self {
        let mut outcome = Self::new(account_id);
        outcome.disposition = Disposition::Cancelled;
        outcome.errors.push("Run stopped before this account started".to_string());
        outcome
    }

    /// Append `step` to `steps_completed`; it must be the next canonical step
    pub fn mark_completed(&mut self, step: WorkflowStep) -> Result<()> {
        let next = WorkflowStep::ALL.get(self.steps_completed.len()).copied();
        if next != Some(step) {
            return Err(AutomationError::InvalidTransition {
                from: self
                    .steps_completed
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "start".to_string()),
                to: step.to_string(),
                reason: match next {
                    Some(expected) => format!("expected {} next", expected),
                    None => "all steps already completed".to_string(),
                },
            });
        }
        self.steps_completed.push(step.to_string());
        Ok(())
    }

    pub fn is_completed(&self, step: WorkflowStep) -> bool {
        self.steps_completed.len() > step.index()
    }

    pub fn log(&mut self, result: WorkflowStepResult) {
        self.step_log.push(result);
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Seal the outcome with its disposition and elapsed time
    pub fn finish(&mut self, disposition: Disposition, elapsed: Duration) {
        self.disposition = disposition;
        self.success = disposition == Disposition::Succeeded;
        self.verification_required = matches!(
            disposition,
            Disposition::VerificationRequired | Disposition::Blocked
        );
        self.duration_seconds = elapsed.as_secs_f64();
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{}: {:?} ({}/{} steps, {:.1}s)",
            self.account_id,
            self.disposition,
            self.steps_completed.len(),
            WorkflowStep::ALL.len(),
            self.duration_seconds
        )
    }
}
