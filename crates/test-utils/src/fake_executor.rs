use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::errors::{AssetdagError, Result};
use assetdag::exec::TaskExecutor;
use assetdag::task::{Task, TaskReport};
use assetdag::types::ReloadKind;

/// A fake executor that:
/// - records which tasks were "run", in start order
/// - fails tasks listed via [`FakeExecutor::fail`]
/// - sleeps for per-task delays
/// - tracks how many tasks ran at the same time
#[derive(Debug, Default)]
pub struct FakeExecutor {
    executed: Mutex<Vec<String>>,
    failing: Mutex<BTreeSet<String>>,
    delays: Mutex<BTreeMap<String, Duration>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, task: &str) {
        self.failing.lock().unwrap().insert(task.to_string());
    }

    pub fn delay(&self, task: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(task.to_string(), delay);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn run_count(&self, task: &str) -> usize {
        self.executed().iter().filter(|t| *t == task).count()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

impl TaskExecutor for FakeExecutor {
    fn execute(
        &self,
        task: Arc<Task>,
    ) -> Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + '_>> {
        Box::pin(async move {
            let name = task.name().to_string();
            self.executed.lock().unwrap().push(name.clone());

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.lock().unwrap().get(&name).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.running.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().unwrap().contains(&name) {
                return Err(AssetdagError::task(
                    &name,
                    anyhow::anyhow!("fake failure"),
                ));
            }

            Ok(TaskReport {
                task: name,
                written: 0,
                unchanged: 0,
                outputs: Vec::new(),
                digest: String::new(),
                reload: ReloadKind::Full,
                elapsed: Duration::ZERO,
            })
        })
    }
}
