//! Per-account workflow orchestration
//!
//! One [`WorkflowOrchestrator::process`] call drives one account through the
//! six canonical steps on its own browser session. Each step runs inside the
//! retry controller; challenge pages are handed to the fallback engine and,
//! when nothing clears them, end the account as verification-required or
//! blocked. Every exit path closes the session and returns an outcome.

use crate::context::RunContext;
use crate::detection::{Challenge, SignalClassifier};
use crate::driver::{DriverFactory, ElementAction, PageDriver};
use crate::errors::{AutomationError, Result};
use crate::fallback::FallbackEngine;
use crate::report::{json_file::safe_account, ReportCategory};
use crate::retry::{ErrorCategory, RetryController, RetryDecision};
use crate::telemetry::TelemetryEvent;
use crate::types::{Account, AccountOutcome, Disposition, WorkflowStep, WorkflowStepResult};
use crate::workflow::naming;
use crate::workflow::plan::{ActionPlan, StepPlan, ValueSource, WorkflowPlan};
use crate::workflow::state::{WorkflowEvent, WorkflowState};
use crate::workflow::verification::{self, any_visible};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Interstitial pages acknowledged in a row before giving up on them
const MAX_ACKNOWLEDGEMENTS: usize = 3;

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Seconds since the epoch used in the resource name; now when unset
    pub timestamp: Option<u64>,

    /// Overrides `challenges.await_manual_resolution`
    pub await_manual_resolution: Option<bool>,
}

/// Why an account stopped short of `Done`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    pub disposition: Disposition,
    pub report: ReportCategory,
    pub detail: String,
}

impl Halt {
    fn new(disposition: Disposition, report: ReportCategory, detail: &str) -> Self {
        Self {
            disposition,
            report,
            detail: detail.to_string(),
        }
    }

    pub fn for_challenge(challenge: Challenge) -> Option<Self> {
        use Disposition::{Blocked, VerificationRequired};

        let halt = match challenge {
            Challenge::Captcha { .. } => Self::new(
                VerificationRequired,
                ReportCategory::Captcha,
                "CAPTCHA challenge needs to be solved manually",
            ),
            Challenge::TwoFactor => Self::new(
                VerificationRequired,
                ReportCategory::TwoFactor,
                "Two-factor verification needs to be completed manually",
            ),
            Challenge::EmailVerification => Self::new(
                VerificationRequired,
                ReportCategory::Verification,
                "Email verification needs to be completed manually",
            ),
            Challenge::AccountBlocked => Self::new(
                Blocked,
                ReportCategory::Blocked,
                "Account appears to be blocked, suspended or restricted",
            ),
            Challenge::UnusualActivity => Self::new(
                VerificationRequired,
                ReportCategory::UnusualActivity,
                "Unusual activity check needs to be cleared manually",
            ),
            Challenge::Interstitial => return None,
        };
        Some(halt)
    }

    /// Halt for a failure whose category is a challenge
    pub fn for_category(category: ErrorCategory) -> Option<Self> {
        let challenge = match category {
            ErrorCategory::Captcha => Challenge::Captcha { recaptcha: false },
            ErrorCategory::TwoFactor => Challenge::TwoFactor,
            ErrorCategory::EmailVerification => Challenge::EmailVerification,
            ErrorCategory::AccountBlocked => Challenge::AccountBlocked,
            ErrorCategory::BotProtection | ErrorCategory::SuspiciousActivity => {
                Challenge::UnusualActivity
            }
            _ => return None,
        };
        Self::for_challenge(challenge)
    }
}

/// Result of one step that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed { detail: String },
    Halted(Halt),
}

impl StepOutcome {
    fn completed(detail: impl Into<String>) -> Self {
        StepOutcome::Completed {
            detail: detail.into(),
        }
    }
}

/// Drives accounts through the workflow
pub struct WorkflowOrchestrator {
    ctx: RunContext,
    plan: Arc<WorkflowPlan>,
    factory: Arc<dyn DriverFactory>,
}

impl WorkflowOrchestrator {
    pub fn new(ctx: RunContext, plan: WorkflowPlan, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            ctx,
            plan: Arc::new(plan),
            factory,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn plan(&self) -> &WorkflowPlan {
        &self.plan
    }

    /// Run the whole workflow for one account; never fails, the outcome
    /// carries every error
    pub async fn process(&self, account: &Account, options: &ProcessOptions) -> AccountOutcome {
        let started = Instant::now();
        let mut outcome = AccountOutcome::new(account.id.clone());
        info!(account = %account.id, "processing account");

        let retry = self.ctx.retry_controller();
        let driver = match retry
            .execute_with_retry("browser initialization", || self.factory.create())
            .await
        {
            Ok(driver) => driver,
            Err(e) => {
                error!(account = %account.id, error = %e, "could not start browser session");
                let message = format!("Browser session could not start: {}", e);
                outcome.add_error(message.clone());
                self.ctx
                    .reporter
                    .record(ReportCategory::Error, &account.id, &message, None);
                return self.finish(outcome, Disposition::Failed, started);
            }
        };

        let disposition = {
            let mut session = Session::new(self, account, options, driver.as_ref(), &mut outcome);
            session.run().await
        };

        if let Err(e) = driver.close().await {
            warn!(account = %account.id, error = %e, "failed to close browser session");
        }

        self.finish(outcome, disposition, started)
    }

    fn finish(
        &self,
        mut outcome: AccountOutcome,
        disposition: Disposition,
        started: Instant,
    ) -> AccountOutcome {
        outcome.finish(disposition, started.elapsed());
        self.ctx.telemetry.record(TelemetryEvent::AccountFinished {
            account: outcome.account_id.clone(),
            success: outcome.success,
        });
        info!(account = %outcome.account_id, ?disposition, "{}", outcome.summary());
        outcome
    }
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("ctx", &self.ctx)
            .finish()
    }
}

/// State for one account on one browser session
struct Session<'a> {
    ctx: &'a RunContext,
    plan: &'a WorkflowPlan,
    account: &'a Account,
    driver: &'a dyn PageDriver,
    outcome: &'a mut AccountOutcome,
    classifier: SignalClassifier,
    retry: RetryController,
    engine: FallbackEngine,
    state: WorkflowState,
    timestamp: u64,
    await_manual: bool,
}

impl<'a> Session<'a> {
    fn new(
        orchestrator: &'a WorkflowOrchestrator,
        account: &'a Account,
        options: &ProcessOptions,
        driver: &'a dyn PageDriver,
        outcome: &'a mut AccountOutcome,
    ) -> Self {
        let ctx = &orchestrator.ctx;
        Self {
            ctx,
            plan: orchestrator.plan.as_ref(),
            account,
            driver,
            outcome,
            classifier: ctx.classifier(),
            retry: ctx.retry_controller(),
            engine: ctx.fallback_engine(),
            state: WorkflowState::Init,
            timestamp: options
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64),
            await_manual: options
                .await_manual_resolution
                .unwrap_or(ctx.config.challenges.await_manual_resolution),
        }
    }

    async fn run(&mut self) -> Disposition {
        for step in WorkflowStep::ALL {
            let started = Instant::now();
            match self.run_with_retry(step).await {
                Ok(StepOutcome::Completed { detail }) => {
                    if let Err(e) = self.complete(step, detail, started) {
                        return self.fail(step, e).await;
                    }
                }
                Ok(StepOutcome::Halted(halt)) => return self.halt(step, halt).await,
                Err(e) => {
                    if let Some(halt) = e.category().and_then(Halt::for_category) {
                        return self.halt(step, halt).await;
                    }
                    return self.fail(step, e).await;
                }
            }
        }

        match self.state.transition(WorkflowEvent::Finish) {
            Ok(next) => self.state = next,
            Err(e) => return self.fail(WorkflowStep::ArtifactDownload, e).await,
        }

        let detail = match &self.outcome.resource_name {
            Some(name) => format!("Provisioning completed for resource {}", name),
            None => "Provisioning completed".to_string(),
        };
        self.ctx
            .reporter
            .record(ReportCategory::Success, &self.account.id, &detail, None);
        Disposition::Succeeded
    }

    async fn run_with_retry(&mut self, step: WorkflowStep) -> Result<StepOutcome> {
        let context = step.context();
        let mut attempt = 0;

        loop {
            match self.run_step(step).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => match self.retry.decide(&e, context, attempt) {
                    RetryDecision::Retry { category, delay } => {
                        self.retry.record_retry(context, category, attempt, delay);
                        sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp { category } => {
                        return Err(RetryController::exhausted(e, category, attempt + 1));
                    }
                },
            }
        }
    }

    async fn run_step(&mut self, step: WorkflowStep) -> Result<StepOutcome> {
        let plan = self.plan;
        match step {
            WorkflowStep::Login => self.login().await,
            WorkflowStep::ResourceCreation => self.create_resource().await,
            WorkflowStep::CapabilityEnable => self.generic_step(step, &plan.capability).await,
            WorkflowStep::ConsentSetup => self.generic_step(step, &plan.consent).await,
            WorkflowStep::CredentialIssuance => self.generic_step(step, &plan.credential).await,
            WorkflowStep::ArtifactDownload => self.download().await,
        }
    }

    fn complete(&mut self, step: WorkflowStep, detail: String, started: Instant) -> Result<()> {
        self.state = self.state.transition(WorkflowEvent::StepCompleted(step))?;
        self.outcome.mark_completed(step)?;

        info!(account = %self.account.id, %step, %detail, "step completed");
        self.outcome.log(WorkflowStepResult::completed(step, detail));
        self.ctx.telemetry.record(TelemetryEvent::StepCompleted {
            account: self.account.id.clone(),
            step: step.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(())
    }

    async fn halt(&mut self, step: WorkflowStep, halt: Halt) -> Disposition {
        let event = match halt.disposition {
            Disposition::Blocked => WorkflowEvent::AccountBlocked,
            _ => WorkflowEvent::VerificationNeeded,
        };
        if let Ok(next) = self.state.transition(event) {
            self.state = next;
        }

        warn!(account = %self.account.id, %step, category = %halt.report, "{}", halt.detail);
        let shot = format!("{}_{}", halt.report, safe_account(&self.account.id));
        let screenshot = self.capture(&shot).await;

        self.outcome
            .log(WorkflowStepResult::verification_required(step, halt.detail.clone()));
        self.ctx.reporter.record(
            halt.report,
            &self.account.id,
            &halt.detail,
            screenshot.as_deref(),
        );
        halt.disposition
    }

    async fn fail(&mut self, step: WorkflowStep, error: AutomationError) -> Disposition {
        error!(account = %self.account.id, %step, error = %error, "step failed");
        let message = format!("{} failed: {}", step, error);
        self.outcome.add_error(message.clone());
        self.outcome.log(WorkflowStepResult::failed(step, error.to_string()));

        let shot = format!("error_{}_{}", safe_account(&self.account.id), step.context());
        let screenshot = self.capture(&shot).await;
        self.ctx.reporter.record(
            ReportCategory::Error,
            &self.account.id,
            &message,
            screenshot.as_deref(),
        );
        Disposition::Failed
    }

    async fn capture(&self, name: &str) -> Option<PathBuf> {
        match self.driver.screenshot(name).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(name, error = %e, "screenshot failed");
                None
            }
        }
    }

    // Steps

    async fn login(&mut self) -> Result<StepOutcome> {
        let step = WorkflowStep::Login;
        let plans = self.plan;
        let plan = &plans.login;

        self.enter(&plan.step).await?;
        if self.already_done(&plan.step).await {
            return Ok(StepOutcome::completed("session already signed in"));
        }
        if let Some(halt) = self.handle_challenges().await? {
            return Ok(StepOutcome::Halted(halt));
        }
        if let Some(halt) = self.run_actions(step, &plan.step.actions).await? {
            return Ok(StepOutcome::Halted(halt));
        }
        if let Some(halt) = self.handle_challenges().await? {
            return Ok(StepOutcome::Halted(halt));
        }
        self.verify(step, &plan.step).await
    }

    async fn create_resource(&mut self) -> Result<StepOutcome> {
        let step = WorkflowStep::ResourceCreation;
        let plans = self.plan;
        let plan = &plans.resource;

        let name = naming::resource_name(
            &self.ctx.config.naming.prefix,
            &self.account.id,
            self.timestamp,
        );
        self.outcome.resource_name = Some(name.clone());

        self.enter(&plan.step).await?;
        if self.already_done(&plan.step).await {
            return Ok(StepOutcome::completed("resource already exists"));
        }

        let existing = plans.existing_resource_selectors(&name);
        if let Some(selector) = self.first_visible(&existing).await {
            let hit = self
                .driver
                .locate_and(&ElementAction::Click, &[selector], self.ctx.config.element_timeout())
                .await?;
            if hit.is_some() {
                info!(account = %self.account.id, resource = %name, "selected existing resource");
                self.settle().await;
                return Ok(match self.verify(step, &plan.step).await? {
                    StepOutcome::Completed { detail } => StepOutcome::completed(format!(
                        "selected existing resource {}; {}",
                        name, detail
                    )),
                    halted => halted,
                });
            }
        }

        if !plan.name_field.is_empty() {
            self.fill_resource_name(&name).await?;
        }
        if let Some(halt) = self.run_actions(step, &plan.step.actions).await? {
            return Ok(StepOutcome::Halted(halt));
        }
        if !plan.submit.is_empty() {
            self.click_required(step, &plan.submit).await?;
            self.settle().await;
        }
        self.verify(step, &plan.step).await
    }

    /// Fill the name; on rejection try one shorter fallback name
    async fn fill_resource_name(&mut self, name: &str) -> Result<()> {
        let step = WorkflowStep::ResourceCreation;
        let plans = self.plan;
        let field = &plans.resource.name_field;

        self.fill(step, field, name).await?;
        if !self.name_rejected().await {
            return Ok(());
        }

        let Some(shorter) = naming::fallback_name(name) else {
            return Err(AutomationError::NameRejected {
                name: name.to_string(),
            });
        };
        warn!(
            rejected = %name,
            fallback = %shorter,
            "resource name rejected, trying a shorter one"
        );

        self.fill(step, field, &shorter).await?;
        if self.name_rejected().await {
            return Err(AutomationError::NameRejected { name: shorter });
        }
        self.outcome.resource_name = Some(shorter);
        Ok(())
    }

    async fn name_rejected(&self) -> bool {
        let plan = &self.plan.resource;
        if any_visible(self.driver, &plan.name_errors).await {
            return true;
        }
        for selector in &plan.submit {
            if matches!(self.driver.is_visible(selector).await, Ok(true))
                && matches!(self.driver.is_enabled(selector).await, Ok(false))
            {
                return true;
            }
        }
        false
    }

    async fn generic_step(&mut self, step: WorkflowStep, plan: &StepPlan) -> Result<StepOutcome> {
        self.enter(plan).await?;
        if self.already_done(plan).await {
            return Ok(StepOutcome::completed("already configured"));
        }
        if let Some(halt) = self.run_actions(step, &plan.actions).await? {
            return Ok(StepOutcome::Halted(halt));
        }
        self.verify(step, plan).await
    }

    async fn download(&mut self) -> Result<StepOutcome> {
        let step = WorkflowStep::ArtifactDownload;
        let plans = self.plan;
        let plan = &plans.download;

        self.enter(&plan.step).await?;
        if let Some(halt) = self.run_actions(step, &plan.step.actions).await? {
            return Ok(StepOutcome::Halted(halt));
        }

        let timeout = Duration::from_millis(self.ctx.config.timeouts.download_ms);
        let Some(path) = self.driver.wait_for_download(&plan.triggers, timeout).await? else {
            return Err(AutomationError::Generic(
                "Artifact download did not start".to_string(),
            ));
        };

        let stored = self.store_artifact(&path).await;
        let detail = format!("artifact saved to {}", stored.display());
        self.outcome.files_created.push(stored.display().to_string());
        Ok(StepOutcome::completed(detail))
    }

    /// Move the artifact to `<output_dir>/<account>.json`; keeps the
    /// original location when the move fails
    async fn store_artifact(&self, path: &Path) -> PathBuf {
        let target = self
            .ctx
            .config
            .output_dir()
            .join(format!("{}.json", safe_account(&self.account.id)));

        match move_file(path, &target).await {
            Ok(()) => {
                info!(account = %self.account.id, path = %target.display(), "artifact stored");
                target
            }
            Err(e) => {
                warn!(
                    account = %self.account.id,
                    error = %e,
                    kept = %path.display(),
                    "could not move artifact"
                );
                path.to_path_buf()
            }
        }
    }

    // Building blocks

    async fn enter(&self, plan: &StepPlan) -> Result<()> {
        if let Some(url) = &plan.entry_url {
            let loaded = self
                .driver
                .navigate(url, plan.wait, self.ctx.config.navigation_timeout())
                .await?;
            if !loaded {
                return Err(AutomationError::Navigation { url: url.clone() });
            }
        }
        self.settle().await;
        Ok(())
    }

    async fn settle(&self) {
        let settle = self.ctx.config.timeouts.settle_ms;
        if settle > 0 {
            sleep(Duration::from_millis(settle)).await;
        }
    }

    async fn already_done(&self, plan: &StepPlan) -> bool {
        !plan.already_done.is_empty() && any_visible(self.driver, &plan.already_done).await
    }

    async fn first_visible(&self, selectors: &[String]) -> Option<String> {
        for selector in selectors {
            if matches!(self.driver.is_visible(selector).await, Ok(true)) {
                return Some(selector.clone());
            }
        }
        None
    }

    fn resolve(&self, source: &ValueSource) -> String {
        match source {
            ValueSource::AccountId => self.account.id.clone(),
            ValueSource::Secret => self.account.secret.clone(),
            ValueSource::ResourceName => self.outcome.resource_name.clone().unwrap_or_default(),
            ValueSource::Literal(value) => value.clone(),
        }
    }

    async fn run_actions(
        &mut self,
        step: WorkflowStep,
        actions: &[ActionPlan],
    ) -> Result<Option<Halt>> {
        for action in actions {
            let element_action = action.to_element_action(|source| self.resolve(source));
            let hit = self
                .driver
                .locate_and(&element_action, &action.selectors, self.ctx.config.element_timeout())
                .await?;

            match hit {
                Some(hit) => debug!(%step, selector = %hit.selector, "action applied"),
                None if action.optional => debug!(%step, "optional element absent"),
                None => {
                    return Err(AutomationError::ElementNotFound {
                        step: step.to_string(),
                        what: action.selectors.join(", "),
                    })
                }
            }

            if action.check_challenges {
                if let Some(halt) = self.handle_challenges().await? {
                    return Ok(Some(halt));
                }
            }
        }
        Ok(None)
    }

    async fn fill(&self, step: WorkflowStep, selectors: &[String], value: &str) -> Result<()> {
        let hit = self
            .driver
            .locate_and(
                &ElementAction::Fill(value.to_string()),
                selectors,
                self.ctx.config.element_timeout(),
            )
            .await?;
        match hit {
            Some(_) => Ok(()),
            None => Err(AutomationError::ElementNotFound {
                step: step.to_string(),
                what: selectors.join(", "),
            }),
        }
    }

    async fn click_required(&self, step: WorkflowStep, selectors: &[String]) -> Result<()> {
        let hit = self
            .driver
            .locate_and(&ElementAction::Click, selectors, self.ctx.config.element_timeout())
            .await?;
        match hit {
            Some(_) => Ok(()),
            None => Err(AutomationError::ElementNotFound {
                step: step.to_string(),
                what: selectors.join(", "),
            }),
        }
    }

    async fn verify(&self, step: WorkflowStep, plan: &StepPlan) -> Result<StepOutcome> {
        if plan.verification.is_empty() {
            return Ok(StepOutcome::completed("completed without verification probes"));
        }

        let confirmed = verification::verify(
            self.driver,
            &plan.verification,
            &self.ctx.config.verification,
            self.ctx.config.navigation_timeout(),
        )
        .await;

        match confirmed {
            Some(probe) => Ok(StepOutcome::completed(format!("verified by {}", probe))),
            None if plan.optimistic => {
                warn!(account = %self.account.id, %step, "completion unclear, continuing");
                Ok(StepOutcome::completed("verification unclear, continuing"))
            }
            None => Err(AutomationError::VerificationFailed {
                step: step.to_string(),
            }),
        }
    }

    // Challenges

    /// Classify the current page and deal with what is found; `Some` when
    /// the account has to stop
    async fn handle_challenges(&mut self) -> Result<Option<Halt>> {
        let mut acknowledged = 0;

        loop {
            let challenges = self.classifier.observe(self.driver).await;
            let Some(challenge) = challenges.challenge() else {
                return Ok(None);
            };

            if challenge == Challenge::Interstitial {
                if acknowledged >= MAX_ACKNOWLEDGEMENTS || !self.acknowledge().await? {
                    return Ok(None);
                }
                acknowledged += 1;
                continue;
            }

            let Some(detection) = challenges.winner() else {
                return Ok(None);
            };
            warn!(account = %self.account.id, %detection, "challenge detected");
            self.ctx.telemetry.record(TelemetryEvent::ChallengeDetected {
                account: self.account.id.clone(),
                detection,
            });

            let max_attempts = self.ctx.config.fallback.max_attempts;
            let result = self.engine.handle(detection, self.driver, max_attempts).await;
            if result.success {
                if let Err(e) = self.driver.reload().await {
                    debug!(error = %e, "reload after fallback failed");
                }
                if self.classifier.observe(self.driver).await.winner().is_none() {
                    info!(
                        account = %self.account.id,
                        strategy = %result.strategy_used,
                        "challenge cleared"
                    );
                    return Ok(None);
                }
            }

            if matches!(challenge, Challenge::Captcha { .. })
                && self.await_manual
                && self.await_manual_resolution().await
            {
                return Ok(None);
            }

            return Ok(Halt::for_challenge(challenge));
        }
    }

    async fn acknowledge(&self) -> Result<bool> {
        let selectors = &self.plan.login.acknowledge_selectors;
        if selectors.is_empty() {
            return Ok(false);
        }
        let hit = self
            .driver
            .locate_and(&ElementAction::Click, selectors, self.ctx.config.element_timeout())
            .await?;
        if let Some(hit) = &hit {
            info!(
                account = %self.account.id,
                selector = %hit.selector,
                "acknowledged interstitial page"
            );
            self.settle().await;
        }
        Ok(hit.is_some())
    }

    /// Poll until the page is clear or the configured wait runs out
    async fn await_manual_resolution(&self) -> bool {
        let config = &self.ctx.config.challenges;
        let timeout = Duration::from_millis(config.manual_resolution_timeout_ms);
        let poll = Duration::from_millis(config.manual_poll_interval_ms.max(1));
        let started = Instant::now();

        warn!(
            account = %self.account.id,
            timeout_secs = timeout.as_secs(),
            "waiting for the challenge to be resolved in the browser"
        );
        while started.elapsed() < timeout {
            sleep(poll).await;
            if self.classifier.observe(self.driver).await.winner().is_none() {
                info!(account = %self.account.id, "challenge resolved manually");
                return true;
            }
        }

        warn!(account = %self.account.id, "manual resolution timed out");
        false
    }
}

async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halts_for_challenges() {
        let blocked = Halt::for_challenge(Challenge::AccountBlocked).unwrap();
        assert_eq!(blocked.disposition, Disposition::Blocked);
        assert_eq!(blocked.report, ReportCategory::Blocked);

        let captcha = Halt::for_challenge(Challenge::Captcha { recaptcha: true }).unwrap();
        assert_eq!(captcha.disposition, Disposition::VerificationRequired);
        assert_eq!(captcha.report, ReportCategory::Captcha);

        assert!(Halt::for_challenge(Challenge::Interstitial).is_none());
    }

    #[test]
    fn test_halts_for_categories() {
        assert_eq!(
            Halt::for_category(ErrorCategory::BotProtection).map(|h| h.report),
            Some(ReportCategory::UnusualActivity)
        );
        assert_eq!(
            Halt::for_category(ErrorCategory::EmailVerification).map(|h| h.report),
            Some(ReportCategory::Verification)
        );
        assert!(Halt::for_category(ErrorCategory::Network).is_none());
        assert!(Halt::for_category(ErrorCategory::ResourceCreation).is_none());
    }

    #[tokio::test]
    async fn test_move_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("download.json");
        tokio::fs::write(&from, b"{}").await.unwrap();
        let to = dir.path().join("out").join("a.json");

        move_file(&from, &to).await.unwrap();
        assert!(to.exists());
        assert!(!from.exists());
    }
}
