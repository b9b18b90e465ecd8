//! In-memory page driver for dry runs and tests
//!
//! Pages are keyed by URL. Clicking a selector may move to another URL,
//! filling a field may toggle a validation error, and page content can be
//! swapped after a number of reads to model a human resolving a prompt.

use crate::driver::{DriverFactory, ElementAction, ElementMatch, PageDriver, WaitPolicy};
use crate::errors::{AutomationError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One scripted page
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub url: String,
    pub title: String,
    pub text: String,
    pub visible: HashSet<String>,
    pub disabled: HashSet<String>,
}

impl ScriptedPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn show(mut self, selector: impl Into<String>) -> Self {
        self.visible.insert(selector.into());
        self
    }

    pub fn disable(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        self.visible.insert(selector.clone());
        self.disabled.insert(selector);
        self
    }
}

/// Validation rule: values longer than `max_len` make `error_selector` visible
#[derive(Debug, Clone)]
struct FillRule {
    max_len: usize,
    error_selector: String,
}

#[derive(Default)]
struct ScriptState {
    pages: HashMap<String, ScriptedPage>,
    current: String,
    click_targets: HashMap<String, String>,
    fill_rules: HashMap<String, FillRule>,
    scheduled: Vec<(usize, ScriptedPage)>,
    navigation_failures: VecDeque<String>,
    click_failures: HashMap<String, VecDeque<String>>,
    download: Option<PathBuf>,
    no_context: bool,
    text_reads: usize,

    navigations: Vec<String>,
    clicked: Vec<String>,
    filled: Vec<(String, String)>,
    screenshots: Vec<String>,
    session_resets: usize,
    reloads: usize,
    closed: bool,
}

impl ScriptState {
    fn page(&self) -> Option<&ScriptedPage> {
        self.pages.get(&self.current)
    }

    fn page_mut(&mut self) -> &mut ScriptedPage {
        let url = self.current.clone();
        self.pages
            .entry(url.clone())
            .or_insert_with(|| ScriptedPage::new(url))
    }

    fn visible(&self, selector: &str) -> bool {
        self.page().map(|p| p.visible.contains(selector)).unwrap_or(false)
    }

    fn go(&mut self, url: &str) {
        self.current = url.to_string();
    }
}

type CloseHook = Arc<dyn Fn() + Send + Sync>;

/// Scripted driver; clones share state so tests can inspect after a run
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    state: Arc<Mutex<ScriptState>>,
    close_hook: Option<CloseHook>,
}

impl std::fmt::Debug for ScriptedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedDriver")
            .field("current", &self.lock().current)
            .finish()
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a page; the first page registered becomes current
    pub fn with_page(self, page: ScriptedPage) -> Self {
        {
            let mut state = self.lock();
            if state.current.is_empty() {
                state.current = page.url.clone();
            }
            state.pages.insert(page.url.clone(), page);
        }
        self
    }

    /// Clicking `selector` moves to `url`
    pub fn on_click(self, selector: impl Into<String>, url: impl Into<String>) -> Self {
        self.lock().click_targets.insert(selector.into(), url.into());
        self
    }

    /// Filling `selector` with more than `max_len` chars shows `error_selector`
    pub fn reject_long_fill(
        self,
        selector: impl Into<String>,
        max_len: usize,
        error_selector: impl Into<String>,
    ) -> Self {
        self.lock().fill_rules.insert(
            selector.into(),
            FillRule {
                max_len,
                error_selector: error_selector.into(),
            },
        );
        self
    }

    /// After `reads` page text reads, replace the page at `page.url` and move there
    pub fn after_reads(self, reads: usize, page: ScriptedPage) -> Self {
        self.lock().scheduled.push((reads, page));
        self
    }

    /// The next `times` navigations fail with `message`
    pub fn fail_navigation(self, times: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        {
            let mut state = self.lock();
            for _ in 0..times {
                state.navigation_failures.push_back(message.clone());
            }
        }
        self
    }

    /// The next `times` clicks on `selector` fail with `message`
    pub fn fail_click(
        self,
        selector: impl Into<String>,
        times: usize,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        {
            let mut state = self.lock();
            let queue = state.click_failures.entry(selector.into()).or_default();
            for _ in 0..times {
                queue.push_back(message.clone());
            }
        }
        self
    }

    pub fn with_download(self, path: impl Into<PathBuf>) -> Self {
        self.lock().download = Some(path.into());
        self
    }

    /// Simulate a driver whose browser context is gone
    pub fn without_context(self) -> Self {
        self.lock().no_context = true;
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.lock().clicked.clone()
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        self.lock().filled.clone()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.lock().screenshots.clone()
    }

    pub fn session_resets(&self) -> usize {
        self.lock().session_resets
    }

    pub fn reloads(&self) -> usize {
        self.lock().reloads
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn current(&self) -> String {
        self.lock().current.clone()
    }

    fn with_close_hook(mut self, hook: CloseHook) -> Self {
        self.close_hook = Some(hook);
        self
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&self, url: &str, _wait: WaitPolicy, _timeout: Duration) -> Result<bool> {
        let mut state = self.lock();
        if let Some(message) = state.navigation_failures.pop_front() {
            return Err(AutomationError::Generic(message));
        }
        state.navigations.push(url.to_string());
        state.go(url);
        Ok(true)
    }

    async fn locate_and(
        &self,
        action: &ElementAction,
        selectors: &[String],
        _timeout: Duration,
    ) -> Result<Option<ElementMatch>> {
        let mut state = self.lock();
        let Some(selector) = selectors.iter().find(|s| state.visible(s)).cloned() else {
            return Ok(None);
        };

        match action {
            ElementAction::Click => {
                if let Some(message) = state
                    .click_failures
                    .get_mut(&selector)
                    .and_then(|queue| queue.pop_front())
                {
                    return Err(AutomationError::Generic(message));
                }
                if state.page().map(|p| p.disabled.contains(&selector)).unwrap_or(false) {
                    return Ok(None);
                }
                state.clicked.push(selector.clone());
                if let Some(target) = state.click_targets.get(&selector).cloned() {
                    state.go(&target);
                }
                Ok(Some(ElementMatch { selector, text: None }))
            }
            ElementAction::Fill(value) => {
                state.filled.push((selector.clone(), value.clone()));
                if let Some(rule) = state.fill_rules.get(&selector).cloned() {
                    let page = state.page_mut();
                    if value.chars().count() > rule.max_len {
                        page.visible.insert(rule.error_selector);
                    } else {
                        page.visible.remove(&rule.error_selector);
                    }
                }
                Ok(Some(ElementMatch { selector, text: None }))
            }
            ElementAction::ReadText => {
                let text = state.page().map(|p| p.text.clone());
                Ok(Some(ElementMatch { selector, text }))
            }
            ElementAction::Probe => Ok(Some(ElementMatch { selector, text: None })),
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.lock().visible(selector))
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        let state = self.lock();
        Ok(state
            .page()
            .map(|p| p.visible.contains(selector) && !p.disabled.contains(selector))
            .unwrap_or(false))
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn screenshot(&self, name: &str) -> Result<PathBuf> {
        self.lock().screenshots.push(name.to_string());
        Ok(PathBuf::from("screenshots").join(format!("{}.png", name)))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.lock().current.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.lock().page().map(|p| p.title.clone()).unwrap_or_default())
    }

    async fn page_text(&self) -> Result<String> {
        let mut state = self.lock();
        state.text_reads += 1;
        let reads = state.text_reads;
        if let Some(index) = state.scheduled.iter().position(|(after, _)| reads > *after) {
            let (_, page) = state.scheduled.remove(index);
            state.current = page.url.clone();
            state.pages.insert(page.url.clone(), page);
        }
        Ok(state.page().map(|p| p.text.clone()).unwrap_or_default())
    }

    async fn clear_session(&self) -> Result<bool> {
        let mut state = self.lock();
        if state.no_context {
            return Ok(false);
        }
        state.session_resets += 1;
        Ok(true)
    }

    async fn reload(&self) -> Result<()> {
        self.lock().reloads += 1;
        Ok(())
    }

    async fn wait_for_download(
        &self,
        triggers: &[String],
        _timeout: Duration,
    ) -> Result<Option<PathBuf>> {
        let mut state = self.lock();
        let Some(selector) = triggers.iter().find(|s| state.visible(s)).cloned() else {
            return Ok(None);
        };
        state.clicked.push(selector);
        Ok(state.download.clone())
    }

    async fn close(&self) -> Result<()> {
        let first_close = {
            let mut state = self.lock();
            let first = !state.closed;
            state.closed = true;
            first
        };
        if first_close {
            if let Some(hook) = &self.close_hook {
                hook();
            }
        }
        Ok(())
    }
}

type Template = Arc<dyn Fn(usize) -> ScriptedDriver + Send + Sync>;

/// Factory producing scripted drivers and tracking how many are open
#[derive(Clone)]
pub struct ScriptedDriverFactory {
    template: Template,
    created: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedDriverFactory {
    /// `template` receives the 0-based creation index
    pub fn new<F>(template: F) -> Self
    where
        F: Fn(usize) -> ScriptedDriver + Send + Sync + 'static,
    {
        Self {
            template: Arc::new(template),
            created: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Highest number of drivers open at the same time
    pub fn peak_active(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverFactory for ScriptedDriverFactory {
    async fn create(&self) -> Result<Box<dyn PageDriver>> {
        let index = self.created.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        let active = self.active.clone();
        let driver = (self.template)(index).with_close_hook(Arc::new(move || {
            active.fetch_sub(1, Ordering::SeqCst);
        }));
        Ok(Box::new(driver))
    }
}
