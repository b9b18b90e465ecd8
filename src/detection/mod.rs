//! Signal classification for challenge pages
//!
//! Turns page text, URL and element visibility into a [`Challenges`] record
//! with at most one flag set. Rules live in [`ClassifierRules`] and are
//! evaluated in strict priority order.

pub mod classifier;
pub mod rules;

pub use classifier::{ElementProbe, PageSignals, SignalClassifier, VisibleSet};
pub use rules::ClassifierRules;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Obstacle kinds the fallback engine knows how to respond to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    Captcha,
    Recaptcha,
    BotDetection,
    RateLimiting,
    SecurityCheck,
    UnusualActivity,
    AccessDenied,
    VerificationRequired,
}

impl DetectionType {
    pub const ALL: [DetectionType; 8] = [
        DetectionType::Captcha,
        DetectionType::Recaptcha,
        DetectionType::BotDetection,
        DetectionType::RateLimiting,
        DetectionType::SecurityCheck,
        DetectionType::UnusualActivity,
        DetectionType::AccessDenied,
        DetectionType::VerificationRequired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::Captcha => "captcha",
            DetectionType::Recaptcha => "recaptcha",
            DetectionType::BotDetection => "bot_detection",
            DetectionType::RateLimiting => "rate_limiting",
            DetectionType::SecurityCheck => "security_check",
            DetectionType::UnusualActivity => "unusual_activity",
            DetectionType::AccessDenied => "access_denied",
            DetectionType::VerificationRequired => "verification_required",
        }
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single highest-priority finding on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    Captcha { recaptcha: bool },
    TwoFactor,
    EmailVerification,
    AccountBlocked,
    UnusualActivity,
    /// Acknowledge-and-continue page; not an obstacle
    Interstitial,
}

/// Classifier output: one flag per check, at most one set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenges {
    pub captcha: bool,
    pub recaptcha: bool,
    pub two_factor: bool,
    pub email_verification: bool,
    pub account_blocked: bool,
    pub unusual_activity: bool,
    pub interstitial: bool,
}

impl Challenges {
    /// Record with exactly the flags for `challenge`
    pub fn only(challenge: Challenge) -> Self {
        let mut record = Self::default();
        match challenge {
            Challenge::Captcha { recaptcha } => {
                record.captcha = true;
                record.recaptcha = recaptcha;
            }
            Challenge::TwoFactor => record.two_factor = true,
            Challenge::EmailVerification => record.email_verification = true,
            Challenge::AccountBlocked => record.account_blocked = true,
            Challenge::UnusualActivity => record.unusual_activity = true,
            Challenge::Interstitial => record.interstitial = true,
        }
        record
    }

    /// The finding this record holds, if any
    pub fn challenge(&self) -> Option<Challenge> {
        if self.captcha {
            Some(Challenge::Captcha {
                recaptcha: self.recaptcha,
            })
        } else if self.two_factor {
            Some(Challenge::TwoFactor)
        } else if self.email_verification {
            Some(Challenge::EmailVerification)
        } else if self.account_blocked {
            Some(Challenge::AccountBlocked)
        } else if self.unusual_activity {
            Some(Challenge::UnusualActivity)
        } else if self.interstitial {
            Some(Challenge::Interstitial)
        } else {
            None
        }
    }

    /// Detection type to hand to the fallback engine; interstitials have none
    pub fn winner(&self) -> Option<DetectionType> {
        match self.challenge()? {
            Challenge::Captcha { recaptcha: true } => Some(DetectionType::Recaptcha),
            Challenge::Captcha { recaptcha: false } => Some(DetectionType::Captcha),
            Challenge::TwoFactor | Challenge::EmailVerification => {
                Some(DetectionType::VerificationRequired)
            }
            Challenge::AccountBlocked => Some(DetectionType::AccessDenied),
            Challenge::UnusualActivity => Some(DetectionType::UnusualActivity),
            Challenge::Interstitial => None,
        }
    }

    /// True when nothing blocks the workflow
    pub fn is_clear(&self) -> bool {
        self.winner().is_none()
    }

    /// Number of findings set; `recaptcha` only refines `captcha`
    pub fn flag_count(&self) -> usize {
        [
            self.captcha,
            self.two_factor,
            self.email_verification,
            self.account_blocked,
            self.unusual_activity,
            self.interstitial,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}
