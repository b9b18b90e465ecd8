//! Bounded-concurrency batch runs

use crate::types::{Account, AccountOutcome, Disposition};
use crate::workflow::orchestrator::{ProcessOptions, WorkflowOrchestrator};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Stops a running batch; accounts already in progress finish normally
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs many accounts with at most `concurrency_limit` sessions open
#[derive(Debug, Clone)]
pub struct BatchRunner {
    orchestrator: Arc<WorkflowOrchestrator>,
    stop: StopHandle,
    options: ProcessOptions,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>) -> Self {
        Self {
            orchestrator,
            stop: StopHandle::new(),
            options: ProcessOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }

    /// Handle for stopping this runner from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Process every account; outcomes come back in input order
    ///
    /// A limit of 0 is treated as 1. Accounts that have not started when the
    /// stop handle fires come back as cancelled.
    pub async fn process_batch(
        &self,
        accounts: Vec<Account>,
        concurrency_limit: usize,
    ) -> Vec<AccountOutcome> {
        let limit = concurrency_limit.max(1);
        let total = accounts.len();
        info!(total, limit, "starting batch");

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut handles = Vec::with_capacity(total);

        for account in accounts {
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            let stop = self.stop.clone();
            let options = self.options.clone();
            let account_id = account.id.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return AccountOutcome::cancelled(account.id),
                };
                if stop.is_stopped() {
                    info!(account = %account.id, "batch stopped, skipping account");
                    return AccountOutcome::cancelled(account.id);
                }
                orchestrator.process(&account, &options).await
            });
            handles.push((account_id, handle));
        }

        let mut outcomes = Vec::with_capacity(total);
        for (account_id, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(account = %account_id, error = %e, "account task aborted");
                    let mut outcome = AccountOutcome::new(account_id);
                    outcome.add_error(format!("Account task aborted: {}", e));
                    outcomes.push(outcome);
                }
            }
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        if summary.failed > 0 || summary.verification > 0 {
            warn!(?summary, "batch finished with problems");
        } else {
            info!(?summary, "batch finished");
        }
        outcomes
    }
}

/// Counts over a finished batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Verification required or blocked
    pub verification: usize,
    pub cancelled: usize,
    pub success_rate: f64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[AccountOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.disposition {
                Disposition::Succeeded => summary.succeeded += 1,
                Disposition::Failed => summary.failed += 1,
                Disposition::VerificationRequired | Disposition::Blocked => {
                    summary.verification += 1
                }
                Disposition::Cancelled => summary.cancelled += 1,
            }
        }
        if summary.total > 0 {
            summary.success_rate = summary.succeeded as f64 / summary.total as f64;
        }
        summary
    }
}
