// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - [`run`]: the per-invocation record of task statuses and failures
//! - [`runner`]: full builds (batch by batch) and single-task runs
//! - [`queue`]: at most one in-flight run per task, with dirty re-runs
//! - [`runtime`]: the event loop reacting to file-watch triggers and
//!   shutdown signals

use crate::task::TaskReport;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Per-task status inside a [`BuildRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Not started because an earlier batch failed.
    Skipped,
}

/// Result of a single task run, as seen by reload sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded(TaskReport),
    /// Rendered error, cause chain included.
    Failed(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded(_))
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial full build at startup.
    Initial,
    /// Triggered due to a filesystem event.
    FileWatch,
    /// Re-run because the task was triggered again while running.
    Dirty,
}

/// Events flowing into the runtime from the watcher and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be re-run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Completed incremental run, handed to a [`ReloadSink`].
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    pub task: TaskName,
    pub outcome: TaskOutcome,
}

/// Receiver of incremental run results (the dev server in `serve`).
pub trait ReloadSink: Send + Sync {
    fn notify(&self, event: &ReloadEvent);
}

/// Sink that only logs, used by `watch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReloadSink for LogSink {
    fn notify(&self, event: &ReloadEvent) {
        if let TaskOutcome::Failed(error) = &event.outcome {
            tracing::error!(task = %event.task, %error, "incremental run failed");
        }
    }
}

pub mod queue;
pub mod run;
pub mod runner;
pub mod runtime;

pub use queue::{Admission, RerunQueue};
pub use run::{BuildRun, TaskFailure};
pub use runner::BuildRunner;
pub use runtime::Runtime;
