//! Classifier, fallback and retry behaviour through the public API

use async_trait::async_trait;
use provisioner::config::{Config, FallbackConfig};
use provisioner::driver::{PageDriver, ScriptedDriver, ScriptedPage};
use provisioner::fallback::StrategyAction;
use provisioner::{
    Challenge, DetectionType, FallbackEngine, FallbackResult, FallbackStrategy, RunContext,
    TelemetryCollector,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn classifier() -> provisioner::SignalClassifier {
    RunContext::with_config(Config::without_delays()).classifier()
}

#[tokio::test]
async fn test_weak_hint_on_password_page_is_ignored() {
    let driver = ScriptedDriver::new().with_page(
        ScriptedPage::new("https://id.test/signin/password")
            .text("Enter your password. Verify you are human if asked."),
    );
    assert!(classifier().observe(&driver).await.is_clear());
}

#[tokio::test]
async fn test_widget_and_phrase_on_login_page_is_recaptcha() {
    let driver = ScriptedDriver::new().with_page(
        ScriptedPage::new("https://id.test/signin")
            .text("Complete the reCAPTCHA to continue")
            .show(".g-recaptcha"),
    );
    let challenges = classifier().observe(&driver).await;
    assert_eq!(challenges.challenge(), Some(Challenge::Captcha { recaptcha: true }));
    assert_eq!(challenges.winner(), Some(DetectionType::Recaptcha));
}

#[tokio::test]
async fn test_second_factor_url_wins_over_blocked_text() {
    let driver = ScriptedDriver::new().with_page(
        ScriptedPage::new("https://id.test/challenge/totp")
            .text("Access denied until you enter the code"),
    );
    let challenges = classifier().observe(&driver).await;
    assert_eq!(challenges.challenge(), Some(Challenge::TwoFactor));
    assert_eq!(challenges.flag_count(), 1);
}

/// Strategy that fails and counts its calls
struct Refusing {
    strategy: FallbackStrategy,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StrategyAction for Refusing {
    fn strategy(&self) -> FallbackStrategy {
        self.strategy
    }

    async fn execute(
        &self,
        _detection: DetectionType,
        _driver: &dyn PageDriver,
    ) -> provisioner::Result<FallbackResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FallbackResult::failed(self.strategy, "refused"))
    }
}

#[tokio::test]
async fn test_engine_moves_on_until_a_strategy_works() {
    let config = FallbackConfig {
        round_delay_min_ms: 0,
        round_delay_max_ms: 0,
        cooldown_min_ms: 0,
        cooldown_max_ms: 0,
        ..Default::default()
    };
    let telemetry = TelemetryCollector::new();
    let mut engine = FallbackEngine::new(&config, telemetry.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    for strategy in [FallbackStrategy::DelayRandomization, FallbackStrategy::SessionReset] {
        engine.register(Arc::new(Refusing {
            strategy,
            calls: calls.clone(),
        }));
    }
    engine.set_candidates(
        DetectionType::SecurityCheck,
        vec![
            FallbackStrategy::DelayRandomization,
            FallbackStrategy::SessionReset,
            FallbackStrategy::BrowserRestart,
        ],
    );

    let driver = ScriptedDriver::new().with_page(ScriptedPage::new("https://x.test/check"));
    let result = engine.handle(DetectionType::SecurityCheck, &driver, 3).await;

    assert!(result.success);
    assert_eq!(result.strategy_used, FallbackStrategy::BrowserRestart);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(engine.success_rate(FallbackStrategy::SessionReset) < 0.5);
    assert!(engine.success_rate(FallbackStrategy::BrowserRestart) > 0.5);
    assert_eq!(
        engine.recommended_strategy(DetectionType::SecurityCheck),
        FallbackStrategy::BrowserRestart
    );
    assert_eq!(telemetry.get_stats().strategies_executed, 3);
}
