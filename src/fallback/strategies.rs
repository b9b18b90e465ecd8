//! Strategy implementations and their registry

use crate::config::FallbackConfig;
use crate::detection::DetectionType;
use crate::driver::PageDriver;
use crate::errors::Result;
use crate::fallback::{jitter, FallbackResult, FallbackStrategy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

/// One recovery capability. Implementations must be safe to call repeatedly.
#[async_trait]
pub trait StrategyAction: Send + Sync {
    /// Registry slot this implementation fills
    fn strategy(&self) -> FallbackStrategy;

    async fn execute(
        &self,
        detection: DetectionType,
        driver: &dyn PageDriver,
    ) -> Result<FallbackResult>;
}

/// Randomised cool-down. Cannot fail.
#[derive(Debug, Clone)]
pub struct DelayRandomization {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[async_trait]
impl StrategyAction for DelayRandomization {
    fn strategy(&self) -> FallbackStrategy {
        FallbackStrategy::DelayRandomization
    }

    async fn execute(
        &self,
        _detection: DetectionType,
        _driver: &dyn PageDriver,
    ) -> Result<FallbackResult> {
        let delay = jitter(self.min_ms, self.max_ms);
        info!(delay_ms = delay.as_millis() as u64, "cooling down before retry");
        sleep(delay).await;
        Ok(FallbackResult::succeeded(self.strategy()).recommend_retry())
    }
}

/// Clear cookies and storage, then let the page settle
#[derive(Debug, Clone)]
pub struct SessionReset {
    pub settle_min_ms: u64,
    pub settle_max_ms: u64,
}

#[async_trait]
impl StrategyAction for SessionReset {
    fn strategy(&self) -> FallbackStrategy {
        FallbackStrategy::SessionReset
    }

    async fn execute(
        &self,
        _detection: DetectionType,
        driver: &dyn PageDriver,
    ) -> Result<FallbackResult> {
        if !driver.clear_session().await? {
            return Ok(FallbackResult::failed(
                self.strategy(),
                "No browser context available",
            ));
        }
        info!("browser session cleared");
        let settle = jitter(self.settle_min_ms, self.settle_max_ms);
        sleep(settle).await;
        Ok(FallbackResult::succeeded(self.strategy()).bypassed())
    }
}

/// Signals that a full relaunch is advisable; the caller owns the browser
#[derive(Debug, Clone, Default)]
pub struct BrowserRestart;

#[async_trait]
impl StrategyAction for BrowserRestart {
    fn strategy(&self) -> FallbackStrategy {
        FallbackStrategy::BrowserRestart
    }

    async fn execute(
        &self,
        detection: DetectionType,
        _driver: &dyn PageDriver,
    ) -> Result<FallbackResult> {
        info!(%detection, "browser restart requested");
        Ok(FallbackResult::succeeded(self.strategy()).recommend_retry())
    }
}

/// Capture URL, title and a screenshot for a human. Always unsuccessful.
#[derive(Debug, Clone, Default)]
pub struct ManualIntervention;

#[async_trait]
impl StrategyAction for ManualIntervention {
    fn strategy(&self) -> FallbackStrategy {
        FallbackStrategy::ManualIntervention
    }

    async fn execute(
        &self,
        detection: DetectionType,
        driver: &dyn PageDriver,
    ) -> Result<FallbackResult> {
        let url = driver.current_url().await.unwrap_or_default();
        let title = driver.title().await.unwrap_or_default();
        let name = format!(
            "manual_intervention_{}_{}",
            detection,
            chrono::Utc::now().timestamp()
        );
        let screenshot = driver.screenshot(&name).await.ok();

        warn!(
            %detection,
            url = %url,
            title = %title,
            screenshot = ?screenshot,
            "manual intervention required"
        );

        Ok(FallbackResult::failed(
            self.strategy(),
            format!("Manual intervention required for {}", detection),
        ))
    }
}

/// Strategy implementations keyed by [`FallbackStrategy`]
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    actions: HashMap<FallbackStrategy, Arc<dyn StrategyAction>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy
    pub fn with_defaults(config: &FallbackConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DelayRandomization {
            min_ms: config.cooldown_min_ms,
            max_ms: config.cooldown_max_ms,
        }));
        registry.register(Arc::new(SessionReset {
            settle_min_ms: config.cooldown_min_ms,
            settle_max_ms: config.cooldown_max_ms,
        }));
        registry.register(Arc::new(BrowserRestart));
        registry.register(Arc::new(ManualIntervention));
        registry
    }

    /// Add or replace the implementation for `action.strategy()`
    pub fn register(&mut self, action: Arc<dyn StrategyAction>) {
        self.actions.insert(action.strategy(), action);
    }

    pub fn get(&self, strategy: FallbackStrategy) -> Option<Arc<dyn StrategyAction>> {
        self.actions.get(&strategy).cloned()
    }

    pub fn contains(&self, strategy: FallbackStrategy) -> bool {
        self.actions.contains_key(&strategy)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.actions.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        f.debug_struct("StrategyRegistry").field("strategies", &keys).finish()
    }
}
