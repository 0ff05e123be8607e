// tests/build_runner.rs

mod common;
use crate::common::{FakeExecutor, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use assetdag::dag::TaskGraph;
use assetdag::engine::{BuildRunner, TaskStatus};
use assetdag::errors::AssetdagError;
use assetdag::task::Task;

type TestResult = Result<(), Box<dyn Error>>;

fn deps(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// clean -> {vendor, styles, images}, styles -> site
fn site_graph() -> Arc<TaskGraph> {
    Arc::new(
        TaskGraph::new(vec![
            Task::new("clean", vec![]),
            Task::new("vendor", deps(&["clean"])),
            Task::new("styles", deps(&["clean"])),
            Task::new("images", deps(&["clean"])),
            Task::new("site", deps(&["styles"])),
        ])
        .unwrap(),
    )
}

#[tokio::test]
async fn test_full_build_runs_batches_in_order() -> TestResult {
    init_tracing();
    let executor = FakeExecutor::new();
    let runner = BuildRunner::new(site_graph(), Arc::clone(&executor));

    let run = with_timeout(runner.run_full()).await;

    assert!(run.is_success());
    let executed = executor.executed();
    assert_eq!(executed.len(), 5);
    assert_eq!(executed[0], "clean");
    assert_eq!(executed[4], "site");
    for name in ["clean", "vendor", "styles", "images", "site"] {
        assert_eq!(run.status(name), Some(TaskStatus::Succeeded));
        assert!(run.report(name).is_some());
    }
    Ok(())
}

#[tokio::test]
async fn test_tasks_within_a_batch_run_concurrently() -> TestResult {
    let executor = FakeExecutor::new();
    for name in ["vendor", "styles", "images"] {
        executor.delay(name, Duration::from_millis(100));
    }
    let runner = BuildRunner::new(site_graph(), Arc::clone(&executor));

    let run = with_timeout(runner.run_full()).await;

    assert!(run.is_success());
    assert_eq!(executor.max_concurrency(), 3);
    Ok(())
}

#[tokio::test]
async fn test_failure_finishes_siblings_and_skips_later_batches() -> TestResult {
    init_tracing();
    let executor = FakeExecutor::new();
    executor.fail("styles");
    executor.delay("images", Duration::from_millis(50));
    let runner = BuildRunner::new(site_graph(), Arc::clone(&executor));

    let run = with_timeout(runner.run_full()).await;

    assert!(!run.is_success());
    assert_eq!(run.status("styles"), Some(TaskStatus::Failed));
    // Independent siblings still complete.
    assert_eq!(run.status("images"), Some(TaskStatus::Succeeded));
    assert_eq!(run.status("vendor"), Some(TaskStatus::Succeeded));
    // Later batches never start.
    assert_eq!(run.status("site"), Some(TaskStatus::Skipped));
    assert_eq!(executor.run_count("site"), 0);

    let failures = run.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].task, "styles");
    assert_eq!(failures[0].error.task_name(), Some("styles"));
    assert!(failures[0].error.to_string().contains("fake failure"));
    Ok(())
}

#[tokio::test]
async fn test_run_single_skips_dependencies() -> TestResult {
    let executor = FakeExecutor::new();
    let runner = BuildRunner::new(site_graph(), Arc::clone(&executor));

    let run = with_timeout(runner.run_single("site")).await?;

    assert!(run.is_success());
    assert_eq!(executor.executed(), vec!["site".to_string()]);
    assert_eq!(run.statuses().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_single_unknown_task_is_an_error() {
    let executor = FakeExecutor::new();
    let runner = BuildRunner::new(site_graph(), Arc::clone(&executor));

    match runner.run_single("fonts").await {
        Err(AssetdagError::UnknownTask(name)) => assert_eq!(name, "fonts"),
        other => panic!("expected UnknownTask, got {:?}", other.map(|r| r.is_success())),
    }
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_failed_single_run_reports_outcome() -> TestResult {
    let executor = FakeExecutor::new();
    executor.fail("styles");
    let runner = BuildRunner::new(site_graph(), Arc::clone(&executor));

    let run = runner.run_single("styles").await?;
    let outcome = run.outcome("styles").expect("styles finished");
    assert!(!outcome.is_success());
    Ok(())
}

#[tokio::test]
#[should_panic(expected = "did not finish within")]
async fn test_hung_future_fails_the_test_instead_of_hanging() {
    with_timeout(std::future::pending::<()>()).await;
}
