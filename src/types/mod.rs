//! Type definitions module
//!
//! Accounts going in, per-account outcomes coming out.

pub mod account;
pub mod outcome;

pub use account::Account;
pub use outcome::{AccountOutcome, Disposition, StepStatus, WorkflowStep, WorkflowStepResult};
