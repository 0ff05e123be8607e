// src/watch/watcher.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::errors::AssetdagError;
use crate::paths::{glob_base, relative_str, spans_directories};
use crate::watch::debounce::Debouncer;
use crate::watch::patterns::WatchTable;

/// Lifecycle of a watcher session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Watching,
    /// At least one task has a pending debounced trigger.
    Debouncing,
    /// Sending due triggers to the runtime.
    Triggering,
    Stopped,
}

/// Handle for a running watcher session.
///
/// Dropping the handle stops the session as well; [`stop`](Self::stop)
/// additionally waits until every watch has been released.
pub struct WatcherHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    state_rx: watch::Receiver<WatcherState>,
    registration_errors: Vec<AssetdagError>,
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("state", &self.state())
            .field("registration_errors", &self.registration_errors.len())
            .finish()
    }
}

impl WatcherHandle {
    pub fn state(&self) -> WatcherState {
        *self.state_rx.borrow()
    }

    /// Patterns whose watch could not be registered.
    pub fn registration_errors(&self) -> &[AssetdagError] {
        &self.registration_errors
    }

    /// Cancel pending debounced triggers and release all watches.
    ///
    /// Idempotent. Task runs already handed to the runtime keep going.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(error = %e, "watcher loop ended abnormally");
            }
        }
    }
}

/// Start watching every registration's base directory and forward
/// debounced `RuntimeEvent::TaskTriggered` events for the most specific
/// matching task.
///
/// A base directory is watched recursively when any pattern rooted there
/// spans directories. A watch that cannot be registered is logged and
/// recorded as [`AssetdagError::Watch`] for each of its patterns; the other
/// registrations stay active.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    table: WatchTable,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or(root);

    let (state_tx, state_rx) = watch::channel(WatcherState::Idle);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Only fails once the loop is gone, at which point nobody cares.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;

    let mut registration_errors = Vec::new();
    for (dir, (mode, patterns)) in watch_targets(&root, &table) {
        match watcher.watch(&dir, mode) {
            Ok(()) => debug!(dir = %dir.display(), ?mode, "watching directory"),
            Err(e) => {
                let reason = e.to_string();
                for pattern in patterns {
                    error!(pattern = %pattern, error = %reason, "cannot watch pattern");
                    registration_errors.push(AssetdagError::Watch {
                        pattern,
                        source: notify::Error::generic(&reason).add_path(dir.clone()),
                    });
                }
            }
        }
    }

    state_tx.send_replace(WatcherState::Watching);
    info!(root = %root.display(), patterns = table.registrations().len(), "file watcher started");

    let (stop_tx, stop_rx) = oneshot::channel();
    let session = Session {
        root,
        table,
        debouncer: Debouncer::new(debounce),
        state_tx,
        runtime_tx,
    };
    let join = tokio::spawn(session.run(watcher, event_rx, stop_rx));

    Ok(WatcherHandle {
        stop_tx: Some(stop_tx),
        join: Some(join),
        state_rx,
        registration_errors,
    })
}

/// Base directories to watch, with the patterns rooted in each.
fn watch_targets(root: &Path, table: &WatchTable) -> BTreeMap<PathBuf, (RecursiveMode, Vec<String>)> {
    let mut targets: BTreeMap<PathBuf, (RecursiveMode, Vec<String>)> = BTreeMap::new();
    for reg in table.registrations() {
        let dir = root.join(glob_base(reg.pattern()));
        let mode = if spans_directories(reg.pattern()) {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        let entry = targets
            .entry(dir)
            .or_insert((RecursiveMode::NonRecursive, Vec::new()));
        if mode == RecursiveMode::Recursive {
            entry.0 = RecursiveMode::Recursive;
        }
        entry.1.push(reg.pattern().to_string());
    }
    targets
}

struct Session {
    root: PathBuf,
    table: WatchTable,
    debouncer: Debouncer,
    state_tx: watch::Sender<WatcherState>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl Session {
    async fn run(
        mut self,
        watcher: RecommendedWatcher,
        mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        loop {
            let deadline = self.debouncer.next_deadline();
            tokio::select! {
                _ = &mut stop_rx => break,
                event = event_rx.recv() => match event {
                    Some(Ok(event)) => self.on_event(event),
                    Some(Err(e)) => warn!(error = %e, "file watch error"),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if !self.fire_due().await {
                        break;
                    }
                }
            }
        }

        let dropped = !self.debouncer.is_empty();
        self.debouncer.clear();
        drop(watcher);
        self.state_tx.send_replace(WatcherState::Stopped);
        info!(dropped_pending = dropped, "file watcher stopped");
    }

    fn on_event(&mut self, event: Event) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }

        let now = Instant::now();
        for path in &event.paths {
            let Some(rel) = relative_str(&self.root, path) else {
                debug!(path = %path.display(), "event outside project root");
                continue;
            };
            let Some(reg) = self.table.resolve(&rel) else {
                continue;
            };

            debug!(path = %rel, task = reg.task(), pattern = reg.pattern(), "change matched");
            self.debouncer.record(reg.task(), now);
        }

        if !self.debouncer.is_empty() {
            self.state_tx.send_replace(WatcherState::Debouncing);
        }
    }

    /// Send every due trigger. Returns `false` once the runtime is gone.
    async fn fire_due(&mut self) -> bool {
        self.state_tx.send_replace(WatcherState::Triggering);
        for task in self.debouncer.take_due(Instant::now()) {
            info!(task = %task, "change detected; triggering task");
            let event = RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            };
            if self.runtime_tx.send(event).await.is_err() {
                warn!("runtime channel closed; stopping watcher");
                return false;
            }
        }

        let next = if self.debouncer.is_empty() {
            WatcherState::Watching
        } else {
            WatcherState::Debouncing
        };
        self.state_tx.send_replace(next);
        true
    }
}
