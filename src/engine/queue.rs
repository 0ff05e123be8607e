// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::TaskName;

/// Result of asking to run a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Nothing in flight for this task; start it now.
    Start,
    /// Already running; it has been marked dirty and will re-run once.
    Coalesced,
}

/// Tracks which tasks are running and which were triggered meanwhile.
///
/// Semantics:
/// - at most one run per task is in flight
/// - any number of triggers during a run collapse into a single dirty flag
/// - when the run finishes, a dirty task is restarted exactly once
#[derive(Debug, Default)]
pub struct RerunQueue {
    running: BTreeSet<TaskName>,
    dirty: BTreeSet<TaskName>,
}

impl RerunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, task: &str) -> Admission {
        if self.running.contains(task) {
            let first = self.dirty.insert(task.to_string());
            debug!(task, first, "task already running; marked dirty");
            Admission::Coalesced
        } else {
            self.running.insert(task.to_string());
            Admission::Start
        }
    }

    /// Mark the in-flight run of `task` as done.
    ///
    /// Returns `true` if the task was dirty; it then stays marked running and
    /// the caller must start the follow-up run.
    pub fn finish(&mut self, task: &str) -> bool {
        if self.dirty.remove(task) {
            true
        } else {
            self.running.remove(task);
            false
        }
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.running.contains(task)
    }

    pub fn is_dirty(&self, task: &str) -> bool {
        self.dirty.contains(task)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    /// Drop all pending re-runs. In-flight runs stay tracked.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}
