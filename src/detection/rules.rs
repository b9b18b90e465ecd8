//! Phrase, URL and selector tables for the signal classifier
//!
//! All matching is case-insensitive substring matching. Every table can be
//! replaced from the `[classifier]` section of the config file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Text that alone proves a CAPTCHA
    pub captcha_strong_phrases: Vec<String>,

    /// Text that hints at a CAPTCHA; ignored on credential-entry pages
    pub captcha_weak_phrases: Vec<String>,

    pub captcha_url_patterns: Vec<String>,

    /// Widget, iframe and checkbox selectors
    pub captcha_element_selectors: Vec<String>,

    /// Evidence containing one of these marks the CAPTCHA as reCAPTCHA
    pub recaptcha_markers: Vec<String>,

    /// Normal credential-entry pages
    pub login_url_patterns: Vec<String>,

    /// Independent evidence sources needed on a credential-entry page
    pub min_signals_on_login_page: usize,

    pub two_factor_phrases: Vec<String>,
    pub two_factor_url_patterns: Vec<String>,
    pub email_verification_phrases: Vec<String>,
    pub blocked_phrases: Vec<String>,
    pub unusual_activity_phrases: Vec<String>,

    /// Destinations reached after a successful login
    pub success_url_patterns: Vec<String>,

    pub interstitial_url_patterns: Vec<String>,

    /// Acknowledge texts; defaults cover English and Indonesian
    pub interstitial_phrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            captcha_strong_phrases: strings(&["captcha", "recaptcha"]),
            captcha_weak_phrases: strings(&[
                "verify you're human",
                "verify you are human",
                "prove you're human",
                "i'm not a robot",
            ]),
            captcha_url_patterns: strings(&["captcha", "/challenge/recaptcha"]),
            captcha_element_selectors: strings(&[
                "iframe[src*='recaptcha']",
                "iframe[title*='captcha']",
                ".g-recaptcha",
                "#captcha",
                "[data-sitekey]",
                "#recaptcha-anchor",
            ]),
            recaptcha_markers: strings(&["recaptcha", "sitekey"]),
            login_url_patterns: strings(&[
                "/signin",
                "/login",
                "/identifier",
                "/password",
                "/challenge/pwd",
            ]),
            min_signals_on_login_page: 2,
            two_factor_phrases: strings(&[
                "2-step verification",
                "two-step verification",
                "two-factor",
                "check your phone",
                "verify it's you",
                "enter the code",
                "verification code",
                "authenticator app",
            ]),
            two_factor_url_patterns: strings(&[
                "/challenge/totp",
                "/challenge/ipp",
                "/challenge/sk",
                "/challenge/az",
                "/challenge/dp",
                "/2sv",
            ]),
            email_verification_phrases: strings(&[
                "verify your email",
                "check your email",
                "confirmation email",
                "email verification",
            ]),
            blocked_phrases: strings(&[
                "account suspended",
                "account disabled",
                "account locked",
                "access denied",
                "temporarily blocked",
            ]),
            unusual_activity_phrases: strings(&[
                "unusual activity",
                "suspicious activity",
                "security alert",
            ]),
            success_url_patterns: strings(&["/myaccount", "/dashboard", "/console", "/home"]),
            interstitial_url_patterns: strings(&["/speedbump", "/interstitial"]),
            interstitial_phrases: strings(&[
                "i understand",
                "welcome to your new account",
                "saya mengerti",
                "selamat datang di akun baru",
            ]),
        }
    }
}

impl ClassifierRules {
    pub fn is_login_url(&self, url: &str) -> bool {
        contains_any(url, &self.login_url_patterns)
    }

    pub fn is_success_url(&self, url: &str) -> bool {
        contains_any(url, &self.success_url_patterns)
    }
}

/// First pattern found in `haystack` (already lower-cased)
pub(crate) fn find_any<'a>(haystack: &str, patterns: &'a [String]) -> Option<&'a str> {
    patterns
        .iter()
        .map(String::as_str)
        .find(|p| !p.is_empty() && haystack.contains(&p.to_lowercase()))
}

pub(crate) fn contains_any(haystack: &str, patterns: &[String]) -> bool {
    find_any(&haystack.to_lowercase(), patterns).is_some()
}
