// src/watch/debounce.rs

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::TaskName;

/// Per-task trailing-edge debouncer.
///
/// Each recorded change pushes the task's deadline to `now + window`; a task
/// is due once its deadline passes without further changes.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: BTreeMap<TaskName, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn record(&mut self, task: &str, now: Instant) {
        self.pending.insert(task.to_string(), now + self.window);
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every task whose deadline is at or before `now`,
    /// sorted by name.
    pub fn take_due(&mut self, now: Instant) -> Vec<TaskName> {
        let due: Vec<TaskName> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(task, _)| task.clone())
            .collect();
        for task in &due {
            self.pending.remove(task);
        }
        due
    }

    pub fn is_pending(&self, task: &str) -> bool {
        self.pending.contains_key(task)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending trigger.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rapid_changes_extend_the_deadline() {
        let start = Instant::now();
        let window = Duration::from_millis(100);
        let mut d = Debouncer::new(window);

        d.record("styles", start);
        d.record("styles", start + Duration::from_millis(60));

        assert!(d.take_due(start + Duration::from_millis(120)).is_empty());
        assert_eq!(
            d.take_due(start + Duration::from_millis(160)),
            vec!["styles".to_string()]
        );
        assert!(d.is_empty());
    }

    #[test]
    fn tasks_are_debounced_independently() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));

        d.record("styles", start);
        d.record("images", start + Duration::from_millis(50));
        assert_eq!(d.next_deadline(), Some(start + Duration::from_millis(100)));

        assert_eq!(
            d.take_due(start + Duration::from_millis(100)),
            vec!["styles".to_string()]
        );
        assert!(d.is_pending("images"));

        d.clear();
        assert_eq!(d.next_deadline(), None);
    }
}
