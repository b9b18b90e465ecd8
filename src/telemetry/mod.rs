//! Telemetry for provisioning runs
//!
//! Collects run events into shared statistics and installs the tracing
//! subscriber used for structured logs.

use crate::detection::DetectionType;
use crate::fallback::FallbackStrategy;
use crate::retry::ErrorCategory;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    ChallengeDetected {
        account: String,
        detection: DetectionType,
    },
    StrategyExecuted {
        strategy: FallbackStrategy,
        success: bool,
    },
    RetryAttempt {
        context: String,
        category: ErrorCategory,
        attempt: u32,
    },
    StepCompleted {
        account: String,
        step: String,
        duration_ms: u64,
    },
    AccountFinished {
        account: String,
        success: bool,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub challenges_detected: usize,
    pub strategies_executed: usize,
    pub strategies_succeeded: usize,
    pub retry_attempts: usize,
    pub steps_completed: usize,
    pub accounts_succeeded: usize,
    pub accounts_failed: usize,
}

/// Telemetry collector, cheap to clone and shared across sessions
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::ChallengeDetected { .. } => stats.challenges_detected += 1,
                TelemetryEvent::StrategyExecuted { success, .. } => {
                    stats.strategies_executed += 1;
                    if *success {
                        stats.strategies_succeeded += 1;
                    }
                }
                TelemetryEvent::RetryAttempt { .. } => stats.retry_attempts += 1,
                TelemetryEvent::StepCompleted { .. } => stats.steps_completed += 1,
                TelemetryEvent::AccountFinished { success, .. } => {
                    if *success {
                        stats.accounts_succeeded += 1;
                    } else {
                        stats.accounts_failed += 1;
                    }
                }
            }
        }

        lock(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Fraction of fallback executions that succeeded
    pub fn strategy_success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.strategies_executed == 0 {
            1.0
        } else {
            stats.strategies_succeeded as f64 / stats.strategies_executed as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
