//! Priority-ordered challenge classifier

use crate::detection::rules::{find_any, ClassifierRules};
use crate::detection::{Challenge, Challenges};
use crate::driver::PageDriver;
use futures_util::future::join_all;
use std::collections::HashSet;
use tracing::debug;

/// Snapshot of a page as seen by the classifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    pub url: String,
    pub title: String,
    /// Lower-cased visible text
    pub text: String,
}

impl PageSignals {
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: &str) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            text: text.to_lowercase(),
        }
    }
}

/// Answers whether a selector is present and visible
pub trait ElementProbe {
    fn is_visible(&self, selector: &str) -> bool;
}

impl<F> ElementProbe for F
where
    F: Fn(&str) -> bool,
{
    fn is_visible(&self, selector: &str) -> bool {
        self(selector)
    }
}

/// Selectors found visible during [`SignalClassifier::collect`]
#[derive(Debug, Clone, Default)]
pub struct VisibleSet(pub HashSet<String>);

impl ElementProbe for VisibleSet {
    fn is_visible(&self, selector: &str) -> bool {
        self.0.contains(selector)
    }
}

type Check = fn(&SignalClassifier, &Inputs<'_>) -> Option<Challenge>;

/// Evaluation order; the first hit wins and later checks never run
const PRIORITY: &[Check] = &[
    SignalClassifier::check_captcha,
    SignalClassifier::check_two_factor,
    SignalClassifier::check_email_verification,
    SignalClassifier::check_blocked,
    SignalClassifier::check_unusual_activity,
    SignalClassifier::check_interstitial,
];

struct Inputs<'a> {
    url: String,
    text: &'a str,
    probe: &'a dyn ElementProbe,
}

/// Challenge classifier over a replaceable rule table
#[derive(Debug, Clone, Default)]
pub struct SignalClassifier {
    rules: ClassifierRules,
}

impl SignalClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Classify one page snapshot
    pub fn classify(&self, signals: &PageSignals, probe: &dyn ElementProbe) -> Challenges {
        let inputs = Inputs {
            url: signals.url.to_lowercase(),
            text: &signals.text,
            probe,
        };

        PRIORITY
            .iter()
            .find_map(|check| check(self, &inputs))
            .map(Challenges::only)
            .unwrap_or_default()
    }

    /// Read URL, title, text and widget visibility from the driver.
    /// Driver failures read as empty or not visible.
    pub async fn collect(&self, driver: &dyn PageDriver) -> (PageSignals, VisibleSet) {
        let url = driver.current_url().await.unwrap_or_default();
        let title = driver.title().await.unwrap_or_default();
        let text = driver.page_text().await.unwrap_or_default();

        let probes = self
            .rules
            .captcha_element_selectors
            .iter()
            .map(|selector| async move {
                match driver.is_visible(selector).await {
                    Ok(true) => Some(selector.clone()),
                    _ => None,
                }
            });
        let visible = join_all(probes).await.into_iter().flatten().collect();

        (PageSignals::new(url, title, &text), VisibleSet(visible))
    }

    /// Classify the driver's current page; never fails
    pub async fn observe(&self, driver: &dyn PageDriver) -> Challenges {
        let (signals, visible) = self.collect(driver).await;
        let challenges = self.classify(&signals, &visible);
        debug!(url = %signals.url, ?challenges, "page classified");
        challenges
    }

    fn check_captcha(&self, inputs: &Inputs<'_>) -> Option<Challenge> {
        let rules = &self.rules;
        let strong = find_any(inputs.text, &rules.captcha_strong_phrases);
        let weak = find_any(inputs.text, &rules.captcha_weak_phrases);
        let url = find_any(&inputs.url, &rules.captcha_url_patterns);
        let element = rules
            .captcha_element_selectors
            .iter()
            .find(|selector| inputs.probe.is_visible(selector));

        let detected = if rules.is_login_url(&inputs.url) {
            let sources = [strong.is_some(), url.is_some(), element.is_some()]
                .iter()
                .filter(|hit| **hit)
                .count();
            sources >= rules.min_signals_on_login_page
        } else {
            strong.is_some() || weak.is_some() || url.is_some() || element.is_some()
        };
        if !detected {
            return None;
        }

        let markers = &rules.recaptcha_markers;
        let recaptcha = (strong.is_some() && find_any(inputs.text, markers).is_some())
            || (url.is_some() && find_any(&inputs.url, markers).is_some())
            || element
                .map_or(false, |selector| find_any(&selector.to_lowercase(), markers).is_some());

        Some(Challenge::Captcha { recaptcha })
    }

    fn check_two_factor(&self, inputs: &Inputs<'_>) -> Option<Challenge> {
        let text = find_any(inputs.text, &self.rules.two_factor_phrases);
        let url = find_any(&inputs.url, &self.rules.two_factor_url_patterns);
        (text.is_some() || url.is_some()).then_some(Challenge::TwoFactor)
    }

    fn check_email_verification(&self, inputs: &Inputs<'_>) -> Option<Challenge> {
        find_any(inputs.text, &self.rules.email_verification_phrases)
            .map(|_| Challenge::EmailVerification)
    }

    fn check_blocked(&self, inputs: &Inputs<'_>) -> Option<Challenge> {
        find_any(inputs.text, &self.rules.blocked_phrases).map(|_| Challenge::AccountBlocked)
    }

    fn check_unusual_activity(&self, inputs: &Inputs<'_>) -> Option<Challenge> {
        if self.rules.is_success_url(&inputs.url) {
            return None;
        }
        find_any(inputs.text, &self.rules.unusual_activity_phrases)
            .map(|_| Challenge::UnusualActivity)
    }

    fn check_interstitial(&self, inputs: &Inputs<'_>) -> Option<Challenge> {
        let url = find_any(&inputs.url, &self.rules.interstitial_url_patterns);
        let text = find_any(inputs.text, &self.rules.interstitial_phrases);
        (url.is_some() || text.is_some()).then_some(Challenge::Interstitial)
    }
}
