//! Step verification probes
//!
//! The remote UI has no authoritative completion signal, so several
//! unrelated probes are tried. The passive ones only read the page and race
//! each other; the first to confirm wins and the rest are dropped. The
//! direct-navigation probe changes the page, so it runs alone afterwards.
//! Probe failures count as "not confirmed".

use crate::config::VerificationConfig;
use crate::detection::rules::contains_any;
use crate::driver::{PageDriver, WaitPolicy};
use crate::workflow::plan::VerificationPlan;
use futures_util::future::{select_ok, BoxFuture, FutureExt};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    UrlPattern,
    SuccessElement,
    ContentMarker,
    NavigationChrome,
    DirectNavigation,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Probe::UrlPattern => "url pattern",
            Probe::SuccessElement => "success element",
            Probe::ContentMarker => "content marker",
            Probe::NavigationChrome => "navigation chrome",
            Probe::DirectNavigation => "direct navigation",
        };
        f.write_str(name)
    }
}

type ProbeFuture<'a> = BoxFuture<'a, Result<Probe, ()>>;

pub(crate) async fn any_visible(driver: &dyn PageDriver, selectors: &[String]) -> bool {
    for selector in selectors {
        if matches!(driver.is_visible(selector).await, Ok(true)) {
            return true;
        }
    }
    false
}

/// Read-only probes configured in `plan`
fn passive_probes<'a>(
    driver: &'a dyn PageDriver,
    plan: &'a VerificationPlan,
) -> Vec<ProbeFuture<'a>> {
    let mut probes: Vec<ProbeFuture<'a>> = Vec::new();

    if !plan.url_patterns.is_empty() {
        probes.push(
            async move {
                match driver.current_url().await {
                    Ok(url) if contains_any(&url, &plan.url_patterns) => Ok(Probe::UrlPattern),
                    _ => Err(()),
                }
            }
            .boxed(),
        );
    }

    if !plan.success_selectors.is_empty() {
        probes.push(
            async move {
                if any_visible(driver, &plan.success_selectors).await {
                    Ok(Probe::SuccessElement)
                } else {
                    Err(())
                }
            }
            .boxed(),
        );
    }

    if !plan.content_markers.is_empty() {
        probes.push(
            async move {
                match driver.page_text().await {
                    Ok(text) if contains_any(&text, &plan.content_markers) => {
                        Ok(Probe::ContentMarker)
                    }
                    _ => Err(()),
                }
            }
            .boxed(),
        );
    }

    if !plan.navigation_selectors.is_empty() {
        probes.push(
            async move {
                if any_visible(driver, &plan.navigation_selectors).await {
                    Ok(Probe::NavigationChrome)
                } else {
                    Err(())
                }
            }
            .boxed(),
        );
    }

    probes
}

async fn direct_probe(
    driver: &dyn PageDriver,
    plan: &VerificationPlan,
    timeout: Duration,
) -> Option<Probe> {
    let url = plan.direct_url.as_deref()?;
    match driver.navigate(url, WaitPolicy::Load, timeout).await {
        Ok(true) => {}
        _ => return None,
    }
    if plan.direct_markers.is_empty() || any_visible(driver, &plan.direct_markers).await {
        Some(Probe::DirectNavigation)
    } else {
        None
    }
}

/// Try every probe up to `config.attempts` rounds; `None` when nothing
/// confirmed
pub async fn verify(
    driver: &dyn PageDriver,
    plan: &VerificationPlan,
    config: &VerificationConfig,
    navigation_timeout: Duration,
) -> Option<Probe> {
    let attempts = config.attempts.max(1);

    for attempt in 1..=attempts {
        let probes = passive_probes(driver, plan);
        if !probes.is_empty() {
            if let Ok((probe, _losers)) = select_ok(probes).await {
                debug!(%probe, attempt, "step verified");
                return Some(probe);
            }
        }

        if let Some(probe) = direct_probe(driver, plan, navigation_timeout).await {
            debug!(%probe, attempt, "step verified");
            return Some(probe);
        }

        if attempt < attempts {
            sleep(Duration::from_millis(config.delay_ms)).await;
            if config.reload_between_attempts {
                let _ = driver.reload().await;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ScriptedDriver, ScriptedPage};

    fn config(attempts: u32) -> VerificationConfig {
        VerificationConfig {
            attempts,
            delay_ms: 0,
            reload_between_attempts: true,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_url_probe_confirms() {
        let driver = ScriptedDriver::new().with_page(ScriptedPage::new("https://x/home"));
        let plan = VerificationPlan {
            url_patterns: strings(&["/home"]),
            success_selectors: strings(&["#never"]),
            ..Default::default()
        };
        assert_eq!(
            verify(&driver, &plan, &config(1), Duration::ZERO).await,
            Some(Probe::UrlPattern)
        );
    }

    #[tokio::test]
    async fn test_content_marker_is_case_insensitive() {
        let driver = ScriptedDriver::new()
            .with_page(ScriptedPage::new("https://x/a").text("Project CREATED"));
        let plan = VerificationPlan {
            content_markers: strings(&["project created"]),
            ..Default::default()
        };
        assert_eq!(
            verify(&driver, &plan, &config(1), Duration::ZERO).await,
            Some(Probe::ContentMarker)
        );
    }

    #[tokio::test]
    async fn test_direct_probe_alone_confirms() {
        let driver = ScriptedDriver::new()
            .with_page(ScriptedPage::new("https://x/form"))
            .with_page(ScriptedPage::new("https://x/resource/settings").show("#settings"));
        let plan = VerificationPlan {
            url_patterns: strings(&["/done"]),
            success_selectors: strings(&["#ok"]),
            content_markers: strings(&["success"]),
            navigation_selectors: strings(&["nav.main"]),
            direct_url: Some("https://x/resource/settings".into()),
            direct_markers: strings(&["#settings"]),
        };

        assert_eq!(
            verify(&driver, &plan, &config(3), Duration::ZERO).await,
            Some(Probe::DirectNavigation)
        );
        assert_eq!(driver.navigations(), vec!["https://x/resource/settings"]);
    }

    #[tokio::test]
    async fn test_unconfirmed_after_bounded_rounds() {
        let driver = ScriptedDriver::new().with_page(ScriptedPage::new("https://x/form"));
        let plan = VerificationPlan {
            success_selectors: strings(&["#ok"]),
            ..Default::default()
        };
        assert_eq!(verify(&driver, &plan, &config(3), Duration::ZERO).await, None);
        assert_eq!(driver.reloads(), 2);
    }

    #[tokio::test]
    async fn test_probe_errors_are_not_confirmations() {
        let driver = ScriptedDriver::new().fail_navigation(5, "net::ERR_ABORTED");
        let plan = VerificationPlan {
            direct_url: Some("https://x/settings".into()),
            ..Default::default()
        };
        assert_eq!(verify(&driver, &plan, &config(2), Duration::ZERO).await, None);
    }
}
