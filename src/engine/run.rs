// src/engine/run.rs

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;
use tracing::{error, info, warn};

use super::{TaskName, TaskOutcome, TaskStatus};
use crate::errors::AssetdagError;
use crate::task::TaskReport;

/// A failed task and why.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: TaskName,
    pub error: AssetdagError,
}

/// Record of one full build or one incremental re-run.
#[derive(Debug)]
pub struct BuildRun {
    started_at: SystemTime,
    started: Instant,
    elapsed: Option<Duration>,
    statuses: BTreeMap<TaskName, TaskStatus>,
    reports: BTreeMap<TaskName, TaskReport>,
    failures: Vec<TaskFailure>,
}

impl BuildRun {
    /// Start a run with every named task pending.
    pub fn new<'a>(tasks: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            started_at: SystemTime::now(),
            started: Instant::now(),
            elapsed: None,
            statuses: tasks
                .into_iter()
                .map(|t| (t.to_string(), TaskStatus::Pending))
                .collect(),
            reports: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Wall time from start to [`finish`](Self::finish), or so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn status(&self, task: &str) -> Option<TaskStatus> {
        self.statuses.get(task).copied()
    }

    pub fn statuses(&self) -> &BTreeMap<TaskName, TaskStatus> {
        &self.statuses
    }

    pub fn report(&self, task: &str) -> Option<&TaskReport> {
        self.reports.get(task)
    }

    pub fn reports(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.values()
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
            && self
                .statuses
                .values()
                .all(|s| *s == TaskStatus::Succeeded)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub(crate) fn mark(&mut self, task: &str, status: TaskStatus) {
        self.statuses.insert(task.to_string(), status);
    }

    pub(crate) fn record_success(&mut self, report: TaskReport) {
        self.mark(&report.task, TaskStatus::Succeeded);
        self.reports.insert(report.task.clone(), report);
    }

    pub(crate) fn record_failure(&mut self, task: &str, error: AssetdagError) {
        error!(task, error = %error, "task failed");
        self.mark(task, TaskStatus::Failed);
        self.failures.push(TaskFailure {
            task: task.to_string(),
            error,
        });
    }

    pub(crate) fn finish(&mut self) {
        self.elapsed = Some(self.started.elapsed());
    }

    /// Outcome of a single task in this run, if it finished.
    pub fn outcome(&self, task: &str) -> Option<TaskOutcome> {
        if let Some(report) = self.reports.get(task) {
            return Some(TaskOutcome::Succeeded(report.clone()));
        }
        self.failures
            .iter()
            .find(|f| f.task == task)
            .map(|f| TaskOutcome::Failed(f.error.to_string()))
    }

    /// Log one line for the whole run.
    pub fn log_summary(&self) {
        let count = |wanted: TaskStatus| self.statuses.values().filter(|s| **s == wanted).count();
        let elapsed_ms = self.elapsed().as_millis() as u64;

        if self.is_success() {
            info!(tasks = self.statuses.len(), elapsed_ms, "build finished");
        } else {
            let failed: Vec<&str> = self.failures.iter().map(|f| f.task.as_str()).collect();
            warn!(
                succeeded = count(TaskStatus::Succeeded),
                failed = ?failed,
                skipped = count(TaskStatus::Skipped),
                elapsed_ms,
                "build finished with failures"
            );
        }
    }
}
