//! JSON report files, one per report, grouped by category

use crate::errors::Result;
use crate::report::{ReportCategory, ReportEntry, Reporter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{error, info};

const LATEST_REPORTS: usize = 10;

/// Counts over everything under the reports directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    pub total_reports: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    /// Newest first
    pub latest: Vec<ReportEntry>,
}

/// Writes `<base>/<category>/<category>_report_<account>_<time>_<id>.json`
///
/// Files are written with blocking `std::fs` calls. Inside a multi-threaded
/// tokio runtime `record` runs them under `block_in_place`, so other tasks
/// move off the worker first. A current-thread runtime has no spare worker
/// and writes inline; a report is one small file.
#[derive(Debug, Clone)]
pub struct JsonFileReporter {
    base_dir: PathBuf,
}

impl JsonFileReporter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create the per-category subdirectories
    pub fn ensure_dirs(&self) -> Result<()> {
        for category in ReportCategory::ALL {
            fs::create_dir_all(self.category_dir(category))?;
        }
        Ok(())
    }

    pub fn category_dir(&self, category: ReportCategory) -> PathBuf {
        self.base_dir.join(category.dir_name())
    }

    /// Persist one entry and return its path
    pub fn write(&self, entry: &ReportEntry) -> Result<PathBuf> {
        let dir = self.category_dir(entry.category);
        fs::create_dir_all(&dir)?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}_report_{}_{}_{}.json",
            entry.category,
            safe_account(&entry.account),
            entry.timestamp.format("%Y%m%d_%H%M%S"),
            &id[..8]
        );
        let path = dir.join(filename);
        fs::write(&path, serde_json::to_string_pretty(entry)?)?;
        Ok(path)
    }

    /// Read every report back and count it
    pub fn report_summary(&self) -> Result<ReportSummary> {
        let mut summary = ReportSummary::default();
        let mut entries = Vec::new();

        for category in ReportCategory::ALL {
            let dir = self.category_dir(category);
            if !dir.exists() {
                continue;
            }
            let mut count = 0;
            for file in fs::read_dir(&dir)? {
                let path = file?.path();
                if path.extension().map_or(true, |ext| ext != "json") {
                    continue;
                }
                count += 1;
                // Unreadable files still count toward the category total
                if let Ok(entry) = read_entry(&path) {
                    entries.push(entry);
                }
            }
            summary.total_reports += count;
            summary.by_category.insert(category.as_str().to_string(), count);
        }

        for entry in &entries {
            *summary.by_status.entry(entry.status.clone()).or_default() += 1;
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(LATEST_REPORTS);
        summary.latest = entries;

        Ok(summary)
    }
}

fn read_entry(path: &Path) -> Result<ReportEntry> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Account id reduced to filename-safe characters
pub fn safe_account(account: &str) -> String {
    account
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

impl Reporter for JsonFileReporter {
    fn record(
        &self,
        category: ReportCategory,
        account_id: &str,
        detail: &str,
        screenshot: Option<&Path>,
    ) {
        let entry = ReportEntry::new(category, account_id, detail, screenshot);
        let multi_thread = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        let written = if multi_thread {
            tokio::task::block_in_place(|| self.write(&entry))
        } else {
            self.write(&entry)
        };
        match written {
            Ok(path) => {
                info!(account = account_id, %category, path = %path.display(), "report saved")
            }
            Err(e) => error!(account = account_id, %category, error = %e, "failed to save report"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_writes_into_category_dir() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonFileReporter::new(dir.path());
        reporter.record(ReportCategory::Error, "a.b@example.com", "boom", None);

        let files: Vec<_> = fs::read_dir(dir.path().join("errors")).unwrap().collect();
        assert_eq!(files.len(), 1);
        let name = files[0].as_ref().unwrap().file_name().into_string().unwrap();
        assert!(name.starts_with("error_report_a_b_example_com_"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_record_inside_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonFileReporter::new(dir.path());
        reporter.record(ReportCategory::Success, "a@example.com", "ok", None);
        reporter.record(ReportCategory::Captcha, "a@example.com", "captcha", None);

        let summary = reporter.report_summary().unwrap();
        assert_eq!(summary.total_reports, 2);
        assert_eq!(summary.by_category["success"], 1);
        assert_eq!(summary.by_category["captcha"], 1);
    }

    #[tokio::test]
    async fn test_record_inside_current_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonFileReporter::new(dir.path());
        reporter.record(ReportCategory::Error, "a@example.com", "boom", None);

        let files: Vec<_> = fs::read_dir(dir.path().join("errors")).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_summary_counts_by_category_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonFileReporter::new(dir.path());
        reporter.ensure_dirs().unwrap();
        reporter.record(ReportCategory::Success, "a@example.com", "ok", None);
        reporter.record(ReportCategory::Success, "b@example.com", "ok", None);
        reporter.record(ReportCategory::Blocked, "c@example.com", "blocked", None);
        fs::write(dir.path().join("success").join("notes.txt"), "ignored").unwrap();

        let summary = reporter.report_summary().unwrap();
        assert_eq!(summary.total_reports, 3);
        assert_eq!(summary.by_category["success"], 2);
        assert_eq!(summary.by_category["captcha"], 0);
        assert_eq!(summary.by_status["blocked"], 1);
        assert_eq!(summary.latest.len(), 3);
    }

    #[test]
    fn test_unwritable_base_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let reporter = JsonFileReporter::new(&blocker);
        reporter.record(ReportCategory::Captcha, "a", "x", None);
        let entry = ReportEntry::new(ReportCategory::Captcha, "a", "x", None);
        assert!(reporter.write(&entry).is_err());
    }

    #[test]
    fn test_safe_account() {
        assert_eq!(safe_account("john.doe+x@mail.com"), "john_doe_x_mail_com");
    }
}
