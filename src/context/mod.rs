//! Run context shared by every component of one provisioning run
//!
//! Built once by the caller and passed to constructors. Nothing in the
//! crate reads configuration or reporters from global state.

use crate::config::Config;
use crate::detection::SignalClassifier;
use crate::fallback::FallbackEngine;
use crate::report::{LogReporter, Reporter};
use crate::retry::RetryController;
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;

#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub reporter: Arc<dyn Reporter>,
    pub telemetry: TelemetryCollector,
}

impl RunContext {
    pub fn new(config: Config, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config: Arc::new(config),
            reporter,
            telemetry: TelemetryCollector::new(),
        }
    }

    /// Context that only logs its reports
    pub fn with_config(config: Config) -> Self {
        Self::new(config, Arc::new(LogReporter))
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn classifier(&self) -> SignalClassifier {
        SignalClassifier::new(self.config.classifier.clone())
    }

    pub fn retry_controller(&self) -> RetryController {
        RetryController::new(&self.config.retry, self.telemetry.clone())
    }

    /// Fresh engine with its own success rates, for one session
    pub fn fallback_engine(&self) -> FallbackEngine {
        FallbackEngine::new(&self.config.fallback, self.telemetry.clone())
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("telemetry", &self.telemetry.get_stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackStrategy;
    use crate::report::MemoryReporter;

    #[test]
    fn test_engines_do_not_share_rates() {
        let ctx = RunContext::new(Config::without_delays(), Arc::new(MemoryReporter::new()));
        let mut first = ctx.fallback_engine();
        let second = ctx.fallback_engine();

        first.record_outcome(FallbackStrategy::SessionReset, true);
        assert!(first.success_rate(FallbackStrategy::SessionReset) > 0.5);
        assert_eq!(second.success_rate(FallbackStrategy::SessionReset), 0.5);
    }

    #[test]
    fn test_components_follow_config() {
        let ctx = RunContext::with_config(Config::default());
        let clone = ctx.clone();
        assert_eq!(clone.retry_controller().hard_attempt_cap(), 10);
        assert_eq!(
            clone.classifier().rules().min_signals_on_login_page,
            ctx.config.classifier.min_signals_on_login_page
        );
    }
}
