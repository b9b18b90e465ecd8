//! Caller-supplied workflow plan
//!
//! The plan carries every URL and selector the orchestrator uses. Nothing
//! vendor-specific is compiled in; plans are built in code or loaded from
//! TOML.

use crate::driver::{ElementAction, WaitPolicy};
use crate::errors::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a fill action takes its value from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    AccountId,
    Secret,
    ResourceName,
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Fill,
}

/// One UI action against the first visible candidate selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub action: ActionKind,
    pub selectors: Vec<String>,
    #[serde(default)]
    pub value: Option<ValueSource>,
    /// Missing element is not an error
    #[serde(default)]
    pub optional: bool,
    /// Run the challenge classifier after this action
    #[serde(default)]
    pub check_challenges: bool,
}

impl ActionPlan {
    pub fn click(selectors: &[&str]) -> Self {
        Self {
            action: ActionKind::Click,
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            value: None,
            optional: false,
            check_challenges: false,
        }
    }

    pub fn fill(selectors: &[&str], value: ValueSource) -> Self {
        Self {
            action: ActionKind::Fill,
            value: Some(value),
            ..Self::click(selectors)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn then_check_challenges(mut self) -> Self {
        self.check_challenges = true;
        self
    }

    /// Driver action with the value resolved
    pub fn to_element_action(&self, resolve: impl Fn(&ValueSource) -> String) -> ElementAction {
        match (self.action, &self.value) {
            (ActionKind::Click, _) => ElementAction::Click,
            (ActionKind::Fill, Some(source)) => ElementAction::Fill(resolve(source)),
            (ActionKind::Fill, None) => ElementAction::Fill(String::new()),
        }
    }
}

/// Probes that can confirm a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationPlan {
    pub url_patterns: Vec<String>,
    pub success_selectors: Vec<String>,
    pub content_markers: Vec<String>,
    /// Post-success navigation chrome
    pub navigation_selectors: Vec<String>,
    /// Page that only loads once the step is done
    pub direct_url: Option<String>,
    /// Any of these visible after `direct_url` confirms; empty means loading is enough
    pub direct_markers: Vec<String>,
}

impl VerificationPlan {
    pub fn is_empty(&self) -> bool {
        self.url_patterns.is_empty()
            && self.success_selectors.is_empty()
            && self.content_markers.is_empty()
            && self.navigation_selectors.is_empty()
            && self.direct_url.is_none()
    }
}

/// Generic step: navigate, act, verify
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepPlan {
    pub entry_url: Option<String>,
    pub wait: WaitPolicy,
    /// Visible when the step was already done on an earlier run
    pub already_done: Vec<String>,
    pub actions: Vec<ActionPlan>,
    pub verification: VerificationPlan,
    /// Continue with an "unclear" result when no probe confirms
    pub optimistic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginPlan {
    #[serde(flatten)]
    pub step: StepPlan,
    /// Buttons on acknowledge-and-continue pages
    pub acknowledge_selectors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePlan {
    #[serde(flatten)]
    pub step: StepPlan,
    pub name_field: Vec<String>,
    /// Validation messages shown for a rejected name
    pub name_errors: Vec<String>,
    pub submit: Vec<String>,
    /// Selector templates; `{name}` is replaced with the resource name
    pub existing_resource: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadPlan {
    #[serde(flatten)]
    pub step: StepPlan,
    pub triggers: Vec<String>,
}

/// Everything the orchestrator needs to drive one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPlan {
    pub login: LoginPlan,
    pub resource: ResourcePlan,
    pub capability: StepPlan,
    pub consent: StepPlan,
    pub credential: StepPlan,
    pub download: DownloadPlan,
}

impl WorkflowPlan {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow plan {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    /// Selectors for `{name}` templates
    pub fn existing_resource_selectors(&self, name: &str) -> Vec<String> {
        self.resource
            .existing_resource
            .iter()
            .map(|template| template.replace("{name}", name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const PLAN: &str = r##"
        [login]
        entry_url = "https://id.example.com/signin"
        acknowledge_selectors = ["#ack"]

        [[login.actions]]
        action = "fill"
        selectors = ["#user"]
        value = "account_id"

        [[login.actions]]
        action = "fill"
        selectors = ["#pass"]
        value = { literal = "fixed" }
        check_challenges = true

        [login.verification]
        url_patterns = ["/home"]

        [resource]
        entry_url = "https://console.example.com/new"
        name_field = ["#name"]
        existing_resource = ["[data-name='{name}']"]

        [download]
        triggers = ["#download"]
        optimistic = true
    "##;

    #[test]
    fn test_plan_from_toml() {
        let plan = assert_ok!(WorkflowPlan::from_toml_str(PLAN));
        assert_eq!(plan.login.step.actions.len(), 2);
        assert_eq!(plan.login.step.actions[0].value, Some(ValueSource::AccountId));
        assert_eq!(
            plan.login.step.actions[1].value,
            Some(ValueSource::Literal("fixed".into()))
        );
        assert!(plan.login.step.actions[1].check_challenges);
        assert_eq!(plan.login.acknowledge_selectors, vec!["#ack"]);
        assert!(plan.download.step.optimistic);
        assert!(plan.capability.verification.is_empty());
        assert_eq!(
            plan.existing_resource_selectors("app-x-000001"),
            vec!["[data-name='app-x-000001']"]
        );
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = assert_err!(WorkflowPlan::load(Path::new("/definitely/not/here.toml")));
        assert!(err.to_string().contains("Failed to read workflow plan"));
    }

    #[test]
    fn test_action_resolution() {
        let fill = ActionPlan::fill(&["#name"], ValueSource::ResourceName);
        let action = fill.to_element_action(|source| match source {
            ValueSource::ResourceName => "app-1".to_string(),
            _ => String::new(),
        });
        assert_eq!(action, ElementAction::Fill("app-1".into()));
        assert_eq!(
            ActionPlan::click(&["#go"]).to_element_action(|_| String::new()),
            ElementAction::Click
        );
    }
}
