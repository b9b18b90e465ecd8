//! Batch runs: concurrency bound, ordering, cancellation

mod common;

use common::*;
use provisioner::driver::{ScriptedDriver, ScriptedDriverFactory};
use provisioner::workflow::{BatchRunner, BatchSummary};
use provisioner::{Disposition, WorkflowOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;

const BROKEN: usize = 2;

fn accounts(n: usize) -> Vec<provisioner::Account> {
    (0..n).map(|i| account(&format!("user{}@example.com", i))).collect()
}

/// Every driver gets its own download file; the `BROKEN`th driver created
/// has no pages at all
fn factory(dir: PathBuf) -> ScriptedDriverFactory {
    ScriptedDriverFactory::new(move |index| {
        if index == BROKEN {
            return ScriptedDriver::new();
        }
        let download = download_file(&dir, &format!("download_{}.json", index));
        console_driver(&download)
    })
}

#[tokio::test]
async fn test_batch_respects_limit_and_order() {
    let temp = tempfile::tempdir().unwrap();
    let (ctx, _reporter) = context(config(&temp.path().join("out")));
    let factory = factory(temp.path().to_path_buf());
    let orchestrator = WorkflowOrchestrator::new(ctx, plan(), Arc::new(factory.clone()));
    let runner = BatchRunner::new(Arc::new(orchestrator));

    let input = accounts(5);
    let outcomes = runner.process_batch(input.clone(), 2).await;

    assert_eq!(outcomes.len(), 5);
    for (account, outcome) in input.iter().zip(&outcomes) {
        assert_eq!(account.id, outcome.account_id);
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert!((summary.success_rate - 0.8).abs() < 1e-9);

    assert_eq!(factory.created(), 5);
    assert!(factory.peak_active() <= 2);
    assert!(factory.peak_active() >= 1);
    assert_eq!(factory.active(), 0);
}

#[tokio::test]
async fn test_zero_limit_runs_sequentially() {
    let temp = tempfile::tempdir().unwrap();
    let (ctx, _reporter) = context(config(&temp.path().join("out")));
    let factory = factory(temp.path().to_path_buf());
    let orchestrator = WorkflowOrchestrator::new(ctx, plan(), Arc::new(factory.clone()));
    let runner = BatchRunner::new(Arc::new(orchestrator));

    let outcomes = runner.process_batch(accounts(2), 0).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(factory.peak_active(), 1);
}

#[tokio::test]
async fn test_stopped_batch_cancels_pending_accounts() {
    let temp = tempfile::tempdir().unwrap();
    let (ctx, _reporter) = context(config(&temp.path().join("out")));
    let factory = factory(temp.path().to_path_buf());
    let orchestrator = WorkflowOrchestrator::new(ctx, plan(), Arc::new(factory.clone()));
    let runner = BatchRunner::new(Arc::new(orchestrator));

    runner.stop_handle().stop();
    let outcomes = runner.process_batch(accounts(3), 2).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|outcome| outcome.disposition == Disposition::Cancelled));
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_empty_batch() {
    let temp = tempfile::tempdir().unwrap();
    let (ctx, _reporter) = context(config(temp.path()));
    let factory = factory(temp.path().to_path_buf());
    let orchestrator = WorkflowOrchestrator::new(ctx, plan(), Arc::new(factory));
    let runner = BatchRunner::new(Arc::new(orchestrator));

    assert!(runner.process_batch(Vec::new(), 3).await.is_empty());
}
