//! Provisioner v0.5.0 - Browser Workflow Automation Core
//!
//! Drives accounts through a multi-step web provisioning workflow on top of
//! an abstract page driver, with challenge detection, strategy fallback,
//! categorised retries and structured reporting.
//!
//! # Architecture
//!
//! - **Core**: state machine, orchestrator, batch runner
//! - **Resilience**: challenge classifier, fallback engine, retry controller
//! - **Surroundings**: page driver capability, reports, telemetry, config

pub mod config;
pub mod context;
pub mod detection;
pub mod driver;
pub mod errors;
pub mod fallback;
pub mod report;
pub mod retry;
pub mod telemetry;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use context::RunContext;
pub use detection::{Challenge, Challenges, DetectionType, SignalClassifier};
pub use driver::{DriverFactory, PageDriver};
pub use errors::{AutomationError, Result};
pub use fallback::{FallbackEngine, FallbackResult, FallbackStrategy};
pub use report::{JsonFileReporter, MemoryReporter, ReportCategory, Reporter};
pub use retry::{ErrorCategory, RetryController};
pub use telemetry::TelemetryCollector;
pub use types::{Account, AccountOutcome, Disposition, WorkflowStep};
pub use workflow::{BatchRunner, ProcessOptions, WorkflowOrchestrator, WorkflowPlan};
