//! Workflow state machine
//!
//! Forward edges follow the canonical step order:
//!
//! ```text
//! Init -> LoggedIn -> ResourceReady -> CapabilityEnabled -> ConsentConfigured
//!      -> CredentialIssued -> ArtifactCollected -> Done
//! ```
//!
//! Any non-terminal state may instead move to `VerificationRequired` or
//! `Blocked`. `Done`, `VerificationRequired` and `Blocked` accept no events.

use crate::errors::{AutomationError, Result};
use crate::types::WorkflowStep;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    Init,
    LoggedIn,
    ResourceReady,
    CapabilityEnabled,
    ConsentConfigured,
    CredentialIssued,
    ArtifactCollected,
    Done,
    VerificationRequired,
    Blocked,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A step was executed and verified
    StepCompleted(WorkflowStep),

    /// All steps are done
    Finish,

    /// A human has to verify the account
    VerificationNeeded,

    /// The account is blocked or suspended
    AccountBlocked,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Done | WorkflowState::VerificationRequired | WorkflowState::Blocked
        )
    }

    /// Step whose completion leaves this state
    pub fn next_step(&self) -> Option<WorkflowStep> {
        use WorkflowState::*;
        match self {
            Init => Some(WorkflowStep::Login),
            LoggedIn => Some(WorkflowStep::ResourceCreation),
            ResourceReady => Some(WorkflowStep::CapabilityEnable),
            CapabilityEnabled => Some(WorkflowStep::ConsentSetup),
            ConsentConfigured => Some(WorkflowStep::CredentialIssuance),
            CredentialIssued => Some(WorkflowStep::ArtifactDownload),
            ArtifactCollected | Done | VerificationRequired | Blocked => None,
        }
    }

    /// Validated transition
    pub fn transition(&self, event: WorkflowEvent) -> Result<WorkflowState> {
        use WorkflowEvent::*;
        use WorkflowState::*;

        if self.is_terminal() {
            return Err(self.invalid(event, "state is terminal"));
        }

        let next = match (self, event) {
            (_, VerificationNeeded) => VerificationRequired,
            (_, AccountBlocked) => Blocked,
            (ArtifactCollected, Finish) => Done,
            (state, StepCompleted(step)) if state.next_step() == Some(step) => match step {
                WorkflowStep::Login => LoggedIn,
                WorkflowStep::ResourceCreation => ResourceReady,
                WorkflowStep::CapabilityEnable => CapabilityEnabled,
                WorkflowStep::ConsentSetup => ConsentConfigured,
                WorkflowStep::CredentialIssuance => CredentialIssued,
                WorkflowStep::ArtifactDownload => ArtifactCollected,
            },
            (state, event) => {
                let reason = match state.next_step() {
                    Some(step) => format!("expected {} to complete first", step),
                    None => "only Finish is accepted".to_string(),
                };
                return Err(self.invalid(event, &reason));
            }
        };

        Ok(next)
    }

    fn invalid(&self, event: WorkflowEvent, reason: &str) -> AutomationError {
        AutomationError::InvalidTransition {
            from: format!("{:?}", self),
            to: format!("(via {:?})", event),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_forward_path() {
        let mut state = WorkflowState::Init;
        for step in WorkflowStep::ALL {
            state = state.transition(WorkflowEvent::StepCompleted(step)).unwrap();
        }
        assert_eq!(state, WorkflowState::ArtifactCollected);
        assert_eq!(state.transition(WorkflowEvent::Finish).unwrap(), WorkflowState::Done);
    }

    #[test]
    fn test_skipping_a_step_rejected() {
        let result = WorkflowState::LoggedIn
            .transition(WorkflowEvent::StepCompleted(WorkflowStep::ConsentSetup));
        assert!(matches!(result, Err(AutomationError::InvalidTransition { .. })));
        assert!(WorkflowState::Init.transition(WorkflowEvent::Finish).is_err());
    }

    #[test]
    fn test_challenge_exits_from_any_running_state() {
        for state in [
            WorkflowState::Init,
            WorkflowState::ResourceReady,
            WorkflowState::ArtifactCollected,
        ] {
            assert_eq!(
                state.transition(WorkflowEvent::VerificationNeeded).unwrap(),
                WorkflowState::VerificationRequired
            );
            assert_eq!(
                state.transition(WorkflowEvent::AccountBlocked).unwrap(),
                WorkflowState::Blocked
            );
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for state in [
            WorkflowState::Done,
            WorkflowState::VerificationRequired,
            WorkflowState::Blocked,
        ] {
            assert!(state.is_terminal());
            assert!(state.transition(WorkflowEvent::VerificationNeeded).is_err());
            assert!(state.transition(WorkflowEvent::Finish).is_err());
        }
    }
}
