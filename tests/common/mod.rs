//! Shared fixtures: a scripted console site and a plan that walks it

#![allow(dead_code)]

use provisioner::driver::{ScriptedDriver, ScriptedPage};
use provisioner::report::MemoryReporter;
use provisioner::workflow::plan::{
    ActionPlan, DownloadPlan, LoginPlan, ResourcePlan, StepPlan, ValueSource, VerificationPlan,
};
use provisioner::{Account, Config, RunContext, WorkflowPlan};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SIGNIN: &str = "https://id.test/signin";
pub const PASSWORD: &str = "https://id.test/password";
pub const HOME: &str = "https://console.test/home";

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn account(id: &str) -> Account {
    Account::new(id, "hunter2")
}

pub fn plan() -> WorkflowPlan {
    WorkflowPlan {
        login: LoginPlan {
            step: StepPlan {
                entry_url: Some(SIGNIN.into()),
                actions: vec![
                    ActionPlan::fill(&["#identifier"], ValueSource::AccountId),
                    ActionPlan::click(&["#next"]),
                    ActionPlan::fill(&["#password"], ValueSource::Secret),
                    ActionPlan::click(&["#submit"]).then_check_challenges(),
                ],
                verification: VerificationPlan {
                    url_patterns: strings(&["/home"]),
                    ..Default::default()
                },
                ..Default::default()
            },
            acknowledge_selectors: strings(&["#ack"]),
        },
        resource: ResourcePlan {
            step: StepPlan {
                entry_url: Some("https://console.test/projects/new".into()),
                verification: VerificationPlan {
                    content_markers: strings(&["project created"]),
                    ..Default::default()
                },
                ..Default::default()
            },
            name_field: strings(&["#project-name"]),
            name_errors: strings(&[".name-error"]),
            submit: strings(&["#create"]),
            existing_resource: strings(&["[data-project='{name}']"]),
        },
        capability: StepPlan {
            entry_url: Some("https://console.test/apis/library".into()),
            already_done: strings(&["#manage"]),
            actions: vec![ActionPlan::click(&["#enable"])],
            verification: VerificationPlan {
                success_selectors: strings(&["#manage"]),
                ..Default::default()
            },
            ..Default::default()
        },
        consent: StepPlan {
            entry_url: Some("https://console.test/consent".into()),
            actions: vec![
                ActionPlan::fill(&["#app-name"], ValueSource::ResourceName),
                ActionPlan::click(&["#save"]),
            ],
            verification: VerificationPlan {
                url_patterns: strings(&["/consent/saved"]),
                ..Default::default()
            },
            ..Default::default()
        },
        credential: StepPlan {
            entry_url: Some("https://console.test/credentials".into()),
            actions: vec![ActionPlan::click(&["#create-credential"])],
            verification: VerificationPlan {
                success_selectors: strings(&["#never-shown"]),
                direct_url: Some("https://console.test/credentials/list".into()),
                direct_markers: strings(&["#credential-row"]),
                ..Default::default()
            },
            ..Default::default()
        },
        download: DownloadPlan {
            step: StepPlan {
                entry_url: Some("https://console.test/credentials/list".into()),
                ..Default::default()
            },
            triggers: strings(&["#download-json"]),
        },
    }
}

/// Driver whose pages let every step succeed
pub fn console_driver(download: &Path) -> ScriptedDriver {
    ScriptedDriver::new()
        .with_page(
            ScriptedPage::new(SIGNIN)
                .title("Sign in")
                .text("Sign in to continue")
                .show("#identifier")
                .show("#next"),
        )
        .with_page(
            ScriptedPage::new(PASSWORD)
                .text("Enter your password")
                .show("#password")
                .show("#submit"),
        )
        .with_page(ScriptedPage::new(HOME).text("Welcome back").show("nav.main"))
        .with_page(
            ScriptedPage::new("https://console.test/projects/new")
                .show("#project-name")
                .show("#create"),
        )
        .with_page(
            ScriptedPage::new("https://console.test/projects/created").text("Project created"),
        )
        .with_page(ScriptedPage::new("https://console.test/apis/library").show("#enable"))
        .with_page(ScriptedPage::new("https://console.test/apis/enabled").show("#manage"))
        .with_page(
            ScriptedPage::new("https://console.test/consent")
                .show("#app-name")
                .show("#save"),
        )
        .with_page(ScriptedPage::new("https://console.test/consent/saved"))
        .with_page(ScriptedPage::new("https://console.test/credentials").show("#create-credential"))
        .with_page(
            ScriptedPage::new("https://console.test/credentials/list")
                .show("#credential-row")
                .show("#download-json"),
        )
        .on_click("#next", PASSWORD)
        .on_click("#submit", HOME)
        .on_click("#create", "https://console.test/projects/created")
        .on_click("#enable", "https://console.test/apis/enabled")
        .on_click("#save", "https://console.test/consent/saved")
        .on_click("#create-credential", "https://console.test/credentials/created")
        .with_download(download)
}

/// Write a fake downloaded credential file
pub fn download_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, br#"{"installed":{"client_id":"abc"}}"#).unwrap();
    path
}

pub fn config(output: &Path) -> Config {
    let mut config = Config::without_delays();
    config.paths.output_dir = output.display().to_string();
    config
}

pub fn context(config: Config) -> (RunContext, MemoryReporter) {
    let reporter = MemoryReporter::new();
    let ctx = RunContext::new(config, Arc::new(reporter.clone()));
    (ctx, reporter)
}
