//! Per-session fallback engine with success-rate learning

use crate::config::FallbackConfig;
use crate::detection::DetectionType;
use crate::driver::PageDriver;
use crate::fallback::strategies::{StrategyAction, StrategyRegistry};
use crate::fallback::{jitter, DetectionEvent, FallbackResult, FallbackStrategy, StrategyAttempt};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Rate assumed for a strategy that has never run
pub const SEED_RATE: f64 = 0.5;

const EMA_OLD_WEIGHT: f64 = 0.8;
const EMA_NEW_WEIGHT: f64 = 0.2;
const RECENT_EVENTS: usize = 10;

/// Snapshot returned by [`FallbackEngine::statistics`]
#[derive(Debug, Clone, Serialize)]
pub struct FallbackStatistics {
    pub total_detections: usize,
    pub success_rates: HashMap<FallbackStrategy, f64>,
    pub recent_detections: Vec<DetectionEvent>,
}

/// Fallback engine. One instance per session; rates are never shared.
#[derive(Debug)]
pub struct FallbackEngine {
    config: FallbackConfig,
    registry: StrategyRegistry,
    candidates: HashMap<DetectionType, Vec<FallbackStrategy>>,
    rates: HashMap<FallbackStrategy, f64>,
    history: Vec<DetectionEvent>,
    telemetry: TelemetryCollector,
}

impl FallbackEngine {
    pub fn new(config: &FallbackConfig, telemetry: TelemetryCollector) -> Self {
        Self {
            config: config.clone(),
            registry: StrategyRegistry::with_defaults(config),
            candidates: HashMap::new(),
            rates: HashMap::new(),
            history: Vec::new(),
            telemetry,
        }
    }

    /// Add or replace a strategy implementation
    pub fn register(&mut self, action: Arc<dyn StrategyAction>) {
        self.registry.register(action);
    }

    /// Override the candidate list for one detection type
    pub fn set_candidates(&mut self, detection: DetectionType, strategies: Vec<FallbackStrategy>) {
        self.candidates.insert(detection, strategies);
    }

    /// Ordered candidates for a detection type
    pub fn candidates(&self, detection: DetectionType) -> Vec<FallbackStrategy> {
        self.candidates
            .get(&detection)
            .cloned()
            .unwrap_or_else(|| FallbackStrategy::defaults_for(detection))
    }

    /// Run candidate strategies for up to `max_attempts` rounds
    pub async fn handle(
        &mut self,
        detection: DetectionType,
        driver: &dyn PageDriver,
        max_attempts: u32,
    ) -> FallbackResult {
        warn!(%detection, max_attempts, "challenge routed to fallback engine");

        let mut event = DetectionEvent {
            timestamp: chrono::Utc::now(),
            detection,
            url: driver.current_url().await.unwrap_or_default(),
            title: driver.title().await.unwrap_or_default(),
            attempts: Vec::new(),
            resolved: false,
        };
        let strategies = self.candidates(detection);

        for round in 1..=max_attempts {
            info!(%detection, round, max_attempts, "fallback round");

            for (index, strategy) in strategies.iter().copied().enumerate() {
                let result = self.execute(strategy, detection, driver).await;
                self.record_outcome(strategy, result.success);
                let next_strategy = if result.success {
                    None
                } else {
                    strategies.get(index + 1).copied()
                };
                event.attempts.push(StrategyAttempt {
                    strategy,
                    success: result.success,
                    round,
                    error: result.error_message.clone(),
                    next_strategy,
                });

                if result.success {
                    info!(%detection, %strategy, round, "fallback strategy succeeded");
                    event.resolved = true;
                    self.history.push(event);
                    return result;
                }

                warn!(
                    %detection,
                    %strategy,
                    round,
                    error = result.error_message.as_deref().unwrap_or(""),
                    "fallback strategy failed"
                );
            }

            if round < max_attempts {
                let wait = jitter(self.config.round_delay_min_ms, self.config.round_delay_max_ms);
                info!(wait_ms = wait.as_millis() as u64, "waiting before next fallback round");
                sleep(wait).await;
            }
        }

        let tried: Vec<_> = event.attempts.iter().map(|a| a.strategy.as_str()).collect();
        error!(%detection, ?tried, url = %event.url, "all fallback strategies failed");
        self.history.push(event);

        let mut result = FallbackResult::failed(
            FallbackStrategy::ManualIntervention,
            "All automated fallback strategies failed",
        )
        .recommend_retry();
        result.next_strategy = Some(self.recommended_strategy(detection));
        result
    }

    async fn execute(
        &self,
        strategy: FallbackStrategy,
        detection: DetectionType,
        driver: &dyn PageDriver,
    ) -> FallbackResult {
        let result = match self.registry.get(strategy) {
            Some(action) => match action.execute(detection, driver).await {
                Ok(result) => result,
                Err(e) => FallbackResult::failed(strategy, e.to_string()),
            },
            None => FallbackResult::failed(strategy, format!("{} is not registered", strategy)),
        };

        self.telemetry.record(TelemetryEvent::StrategyExecuted {
            strategy,
            success: result.success,
        });
        result
    }

    /// Fold one execution into the moving average
    pub fn record_outcome(&mut self, strategy: FallbackStrategy, success: bool) {
        let rate = self.rates.entry(strategy).or_insert(SEED_RATE);
        let observed = if success { 1.0 } else { 0.0 };
        *rate = *rate * EMA_OLD_WEIGHT + observed * EMA_NEW_WEIGHT;
    }

    pub fn success_rate(&self, strategy: FallbackStrategy) -> f64 {
        self.rates.get(&strategy).copied().unwrap_or(SEED_RATE)
    }

    /// Highest-rated candidate; ties go to list order
    pub fn recommended_strategy(&self, detection: DetectionType) -> FallbackStrategy {
        let mut best: Option<(FallbackStrategy, f64)> = None;
        for strategy in self.candidates(detection) {
            let rate = self.success_rate(strategy);
            if best.map_or(true, |(_, best_rate)| rate > best_rate) {
                best = Some((strategy, rate));
            }
        }
        best.map(|(strategy, _)| strategy)
            .unwrap_or(FallbackStrategy::ManualIntervention)
    }

    pub fn statistics(&self) -> FallbackStatistics {
        let start = self.history.len().saturating_sub(RECENT_EVENTS);
        FallbackStatistics {
            total_detections: self.history.len(),
            success_rates: self.rates.clone(),
            recent_detections: self.history[start..].to_vec(),
        }
    }

    pub fn history(&self) -> &[DetectionEvent] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ScriptedDriver;
    use crate::errors::{AutomationError, Result};
    use async_trait::async_trait;
    use quickcheck_macros::quickcheck;

    fn engine() -> FallbackEngine {
        let config = FallbackConfig {
            round_delay_min_ms: 0,
            round_delay_max_ms: 0,
            cooldown_min_ms: 0,
            cooldown_max_ms: 0,
            ..FallbackConfig::default()
        };
        FallbackEngine::new(&config, TelemetryCollector::new())
    }

    struct Failing(FallbackStrategy);

    #[async_trait]
    impl StrategyAction for Failing {
        fn strategy(&self) -> FallbackStrategy {
            self.0
        }

        async fn execute(&self, _: DetectionType, _: &dyn PageDriver) -> Result<FallbackResult> {
            Err(AutomationError::Driver("page crashed".into()))
        }
    }

    #[tokio::test]
    async fn test_third_candidate_succeeds() {
        let mut engine = engine();
        engine.register(Arc::new(Failing(FallbackStrategy::SessionReset)));
        engine.register(Arc::new(Failing(FallbackStrategy::BrowserRestart)));
        engine.set_candidates(
            DetectionType::Captcha,
            vec![
                FallbackStrategy::SessionReset,
                FallbackStrategy::BrowserRestart,
                FallbackStrategy::DelayRandomization,
            ],
        );

        let driver = ScriptedDriver::new();
        let result = engine.handle(DetectionType::Captcha, &driver, 3).await;

        assert!(result.success);
        assert_eq!(result.strategy_used, FallbackStrategy::DelayRandomization);
        let event = &engine.history()[0];
        assert!(event.resolved);
        assert_eq!(event.attempts.len(), 3);
        let next: Vec<_> = event.attempts.iter().map(|a| a.next_strategy).collect();
        assert_eq!(
            next,
            vec![
                Some(FallbackStrategy::BrowserRestart),
                Some(FallbackStrategy::DelayRandomization),
                None,
            ]
        );
        assert!(engine.success_rate(FallbackStrategy::SessionReset) < SEED_RATE);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_manual_intervention() {
        let mut engine = engine();
        let driver = ScriptedDriver::new();
        let result = engine.handle(DetectionType::VerificationRequired, &driver, 2).await;

        assert!(!result.success);
        assert!(result.retry_recommended);
        assert_eq!(result.strategy_used, FallbackStrategy::ManualIntervention);
        assert_eq!(
            result.next_strategy,
            Some(engine.recommended_strategy(DetectionType::VerificationRequired))
        );
        assert_eq!(engine.history()[0].attempts.len(), 2);
        assert_eq!(driver.screenshots().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_context_falls_through_to_restart() {
        let mut engine = engine();
        let driver = ScriptedDriver::new().without_context();
        let result = engine.handle(DetectionType::AccessDenied, &driver, 1).await;

        assert!(result.success);
        assert_eq!(result.strategy_used, FallbackStrategy::BrowserRestart);
    }

    #[test]
    fn test_recommended_prefers_rate_then_order() {
        let mut engine = engine();
        assert_eq!(
            engine.recommended_strategy(DetectionType::AccessDenied),
            FallbackStrategy::SessionReset
        );

        engine.record_outcome(FallbackStrategy::SessionReset, false);
        engine.record_outcome(FallbackStrategy::BrowserRestart, true);
        assert_eq!(
            engine.recommended_strategy(DetectionType::AccessDenied),
            FallbackStrategy::BrowserRestart
        );
    }

    #[test]
    fn test_ema_update() {
        let mut engine = engine();
        engine.record_outcome(FallbackStrategy::SessionReset, true);
        assert!((engine.success_rate(FallbackStrategy::SessionReset) - 0.6).abs() < 1e-12);
        engine.record_outcome(FallbackStrategy::SessionReset, false);
        assert!((engine.success_rate(FallbackStrategy::SessionReset) - 0.48).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_statistics_keep_last_ten() {
        let mut engine = engine();
        let driver = ScriptedDriver::new();
        for _ in 0..12 {
            engine.handle(DetectionType::RateLimiting, &driver, 1).await;
        }
        let stats = engine.statistics();
        assert_eq!(stats.total_detections, 12);
        assert_eq!(stats.recent_detections.len(), 10);
        assert!(stats.success_rates.contains_key(&FallbackStrategy::DelayRandomization));
    }

    #[quickcheck]
    fn prop_rates_stay_in_unit_interval(outcomes: Vec<bool>) -> bool {
        let mut engine = engine();
        outcomes.iter().all(|success| {
            engine.record_outcome(FallbackStrategy::DelayRandomization, *success);
            let rate = engine.success_rate(FallbackStrategy::DelayRandomization);
            (0.0..=1.0).contains(&rate)
        })
    }

    #[quickcheck]
    fn prop_successes_increase_but_never_reach_one(n: u8) -> bool {
        let mut engine = engine();
        let mut previous = engine.success_rate(FallbackStrategy::SessionReset);
        for _ in 0..(n % 60) {
            engine.record_outcome(FallbackStrategy::SessionReset, true);
            let rate = engine.success_rate(FallbackStrategy::SessionReset);
            if rate <= previous || rate >= 1.0 {
                return false;
            }
            previous = rate;
        }
        true
    }
}
