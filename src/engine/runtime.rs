// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::{
    Admission, BuildRun, BuildRunner, ReloadEvent, ReloadSink, RerunQueue, RuntimeEvent, TaskName,
    TaskOutcome, TriggerReason,
};
use crate::errors::Result;
use crate::exec::TaskExecutor;

/// Spawned single-task runs, keyed by tokio task id so a run that panics
/// can still be traced back to its task.
struct InFlight {
    set: JoinSet<Result<BuildRun>>,
    names: HashMap<Id, TaskName>,
}

impl InFlight {
    fn new() -> Self {
        Self {
            set: JoinSet::new(),
            names: HashMap::new(),
        }
    }

    fn spawn<F>(&mut self, task: TaskName, run: F)
    where
        F: Future<Output = Result<BuildRun>> + Send + 'static,
    {
        let handle = self.set.spawn(run);
        self.names.insert(handle.id(), task);
    }

    fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    fn len(&self) -> usize {
        self.set.len()
    }

    /// Next finished run with its task name, whether it returned or panicked.
    async fn join_next(&mut self) -> Option<(TaskName, std::result::Result<Result<BuildRun>, JoinError>)> {
        let (id, result) = match self.set.join_next_with_id().await? {
            Ok((id, result)) => (id, Ok(result)),
            Err(join_err) => (join_err.id(), Err(join_err)),
        };
        // Every id was recorded by `spawn`.
        let task = self.names.remove(&id).unwrap_or_default();
        Some((task, result))
    }
}

/// Reacts to [`RuntimeEvent`]s by re-running single tasks.
///
/// - different tasks run concurrently
/// - a task triggered while running is re-run once afterwards
/// - every finished run is reported to the [`ReloadSink`]
/// - on shutdown, in-flight runs are awaited, pending re-runs dropped
pub struct Runtime<E: TaskExecutor> {
    runner: BuildRunner<E>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    sink: Arc<dyn ReloadSink>,
    queue: RerunQueue,
}

impl<E: TaskExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor> Runtime<E> {
    pub fn new(
        runner: BuildRunner<E>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        sink: Arc<dyn ReloadSink>,
    ) -> Self {
        Self {
            runner,
            event_rx,
            sink,
            queue: RerunQueue::new(),
        }
    }

    /// Main event loop. Returns once shutdown was requested (or every
    /// sender is gone) and all in-flight runs have finished.
    pub async fn run(mut self) -> Result<()> {
        info!("runtime started");
        let mut in_flight = InFlight::new();

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(RuntimeEvent::TaskTriggered { task, reason }) => {
                        self.on_trigger(task, reason, &mut in_flight);
                    }
                    Some(RuntimeEvent::ShutdownRequested) => {
                        info!("shutdown requested");
                        break;
                    }
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                Some((task, joined)) = in_flight.join_next(), if !in_flight.is_empty() => {
                    self.on_completed(&task, joined);
                    if self.queue.finish(&task) {
                        debug!(task = %task, "re-running dirty task");
                        self.spawn_run(task, TriggerReason::Dirty, &mut in_flight);
                    }
                }
            }
        }

        self.queue.clear_dirty();
        if !in_flight.is_empty() {
            info!(runs = in_flight.len(), "waiting for in-flight runs");
        }
        while let Some((task, joined)) = in_flight.join_next().await {
            self.on_completed(&task, joined);
            self.queue.finish(&task);
        }

        info!("runtime exiting");
        Ok(())
    }

    fn on_trigger(&mut self, task: TaskName, reason: TriggerReason, in_flight: &mut InFlight) {
        if !self.runner.graph().contains(&task) {
            warn!(task = %task, "ignoring trigger for unknown task");
            return;
        }

        match self.queue.request(&task) {
            Admission::Start => self.spawn_run(task, reason, in_flight),
            Admission::Coalesced => {}
        }
    }

    fn spawn_run(&self, task: TaskName, reason: TriggerReason, in_flight: &mut InFlight) {
        info!(task = %task, ?reason, "running task");
        let runner = self.runner.clone();
        let name = task.clone();
        in_flight.spawn(task, async move { runner.run_single(&name).await });
    }

    /// Report a finished run to the sink. A panicked run counts as failed.
    fn on_completed(&self, task: &str, joined: std::result::Result<Result<BuildRun>, JoinError>) {
        let outcome = match joined {
            Ok(Ok(run)) => run.outcome(task).unwrap_or_else(|| {
                TaskOutcome::Failed(format!("task '{task}' produced no result"))
            }),
            Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
            Err(join_err) => {
                error!(task, error = %join_err, "task run panicked");
                TaskOutcome::Failed(format!("task '{task}' panicked: {join_err}"))
            }
        };

        self.sink.notify(&ReloadEvent {
            task: task.to_string(),
            outcome,
        });
    }
}
