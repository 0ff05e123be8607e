// src/engine/runner.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{BuildRun, TaskName, TaskStatus};
use crate::dag::TaskGraph;
use crate::errors::{AssetdagError, Result};
use crate::exec::TaskExecutor;
use crate::task::TaskReport;

/// Runs tasks from a [`TaskGraph`] through a [`TaskExecutor`].
#[derive(Debug)]
pub struct BuildRunner<E: TaskExecutor> {
    graph: Arc<TaskGraph>,
    executor: Arc<E>,
}

impl<E: TaskExecutor> Clone for BuildRunner<E> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: TaskExecutor> BuildRunner<E> {
    pub fn new(graph: Arc<TaskGraph>, executor: Arc<E>) -> Self {
        Self { graph, executor }
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    /// Run every batch in order.
    ///
    /// Tasks inside a batch run concurrently. Once a task fails, the rest of
    /// its batch still finishes but every later batch is skipped.
    pub async fn run_full(&self) -> BuildRun {
        let mut run = BuildRun::new(self.graph.tasks().map(|t| t.name()));

        for (index, batch) in self.graph.batches().iter().enumerate() {
            if run.has_failures() {
                for name in batch {
                    run.mark(name, TaskStatus::Skipped);
                }
                warn!(batch = index, tasks = ?batch, "skipping batch after earlier failure");
                continue;
            }

            info!(batch = index, tasks = ?batch, "starting batch");
            self.run_batch(batch, &mut run).await;
        }

        run.finish();
        run
    }

    /// Run exactly one task, without its dependencies.
    pub async fn run_single(&self, name: &str) -> Result<BuildRun> {
        if !self.graph.contains(name) {
            return Err(AssetdagError::UnknownTask(name.to_string()));
        }

        let mut run = BuildRun::new([name]);
        self.run_batch(&[name.to_string()], &mut run).await;
        run.finish();
        Ok(run)
    }

    async fn run_batch(&self, batch: &[TaskName], run: &mut BuildRun) {
        let mut set: JoinSet<(TaskName, Result<TaskReport>)> = JoinSet::new();
        let mut running: BTreeSet<TaskName> = BTreeSet::new();

        for name in batch {
            let Some(task) = self.graph.task(name) else {
                run.record_failure(name, AssetdagError::UnknownTask(name.clone()));
                continue;
            };

            debug!(task = %name, "spawning task");
            run.mark(name, TaskStatus::Running);
            running.insert(name.clone());

            let task = Arc::clone(task);
            let executor = Arc::clone(&self.executor);
            set.spawn(async move {
                let name = task.name().to_string();
                let result = executor.execute(task).await;
                (name, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(report))) => {
                    running.remove(&name);
                    run.record_success(report);
                }
                Ok((name, Err(e))) => {
                    running.remove(&name);
                    run.record_failure(&name, e);
                }
                Err(join_err) => {
                    error!(error = %join_err, "task panicked or was cancelled");
                }
            }
        }

        // Whatever is still marked running never reported back.
        for name in running {
            run.record_failure(
                &name,
                AssetdagError::task(&name, anyhow::anyhow!("task panicked")),
            );
        }
    }
}
