//! Page driver capability consumed by the core
//!
//! The core never touches a browser directly. Everything it needs from the
//! remote UI goes through [`PageDriver`]; selector candidate lists come from
//! the caller's workflow plan.

pub mod scripted;

pub use scripted::{ScriptedDriver, ScriptedDriverFactory, ScriptedPage};

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// Action performed on the first visible element matching a candidate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    Fill(String),
    ReadText,
    /// Only check visibility
    Probe,
}

/// The element an action was applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMatch {
    /// Candidate selector that matched
    pub selector: String,

    /// Element text for [`ElementAction::ReadText`]
    pub text: Option<String>,
}

/// Browser page capability
///
/// Methods take `&self` so verification probes can run concurrently against
/// one page; implementations synchronise internally.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait according to `wait`; `Ok(false)` when the page did
    /// not settle in time
    async fn navigate(&self, url: &str, wait: WaitPolicy, timeout: Duration) -> Result<bool>;

    /// Apply `action` to the first visible element among `selectors`;
    /// `Ok(None)` when none matched within `timeout`
    async fn locate_and(
        &self,
        action: &ElementAction,
        selectors: &[String],
        timeout: Duration,
    ) -> Result<Option<ElementMatch>>;

    /// Whether an element is present and visible right now
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Whether a visible element accepts input
    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        self.is_visible(selector).await
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn screenshot(&self, name: &str) -> Result<PathBuf>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Visible text content of the page
    async fn page_text(&self) -> Result<String>;

    /// Clear cookies plus local and session storage; `Ok(false)` when there
    /// is no active browser context
    async fn clear_session(&self) -> Result<bool>;

    async fn reload(&self) -> Result<()>;

    /// Click the first visible trigger and wait for the resulting download
    async fn wait_for_download(
        &self,
        triggers: &[String],
        timeout: Duration,
    ) -> Result<Option<PathBuf>>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Creates one independent driver per session
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn PageDriver>>;
}
