//! Account provisioning workflow
//!
//! - `state`: validated step-by-step state machine
//! - `plan`: caller-supplied URLs and selectors
//! - `naming`: resource name generation
//! - `verification`: multi-probe completion checks
//! - `orchestrator`: drives one account end to end
//! - `batch`: many accounts under a concurrency limit

pub mod batch;
pub mod naming;
pub mod orchestrator;
pub mod plan;
pub mod state;
pub mod verification;

pub use batch::{BatchRunner, BatchSummary, StopHandle};
pub use orchestrator::{Halt, ProcessOptions, StepOutcome, WorkflowOrchestrator};
pub use plan::{
    ActionKind, ActionPlan, DownloadPlan, LoginPlan, ResourcePlan, StepPlan, ValueSource,
    VerificationPlan, WorkflowPlan,
};
pub use state::{WorkflowEvent, WorkflowState};
pub use verification::Probe;
