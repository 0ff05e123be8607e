// src/server/mod.rs

//! Development server: static files from the destination directory plus a
//! live-reload channel.
//!
//! - [`routes`] builds the axum router (static files, event stream, client
//!   script, HTML injection).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::{ReloadEvent, ReloadSink, TaskName, TaskOutcome};
use crate::types::ReloadKind;

pub mod routes;

pub use routes::{CLIENT_PATH, EVENTS_PATH, inject_snippet};

/// Message pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSignal {
    pub kind: ReloadKind,
    pub task: TaskName,
}

/// Static file server with live reload.
#[derive(Debug, Clone)]
pub struct DevServer {
    root: PathBuf,
    signals: broadcast::Sender<ReloadSignal>,
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (signals, _) = broadcast::channel(64);
        Self {
            root: root.into(),
            signals,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// New receiver of reload signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.signals.subscribe()
    }

    pub fn router(&self) -> axum::Router {
        routes::router(self.root.clone(), self.signals.clone())
    }

    /// Bind `addr` and serve in the background.
    pub async fn spawn(&self, addr: SocketAddr) -> Result<ServerHandle> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding dev server to {addr}"))?;
        let local_addr = listener.local_addr()?;
        let app = self.router();

        let join = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "dev server stopped with an error");
            }
        });

        info!(url = %format!("http://{local_addr}"), root = %self.root.display(), "dev server listening");
        Ok(ServerHandle { local_addr, join })
    }
}

impl ReloadSink for DevServer {
    fn notify(&self, event: &ReloadEvent) {
        match &event.outcome {
            TaskOutcome::Succeeded(report) => {
                let signal = ReloadSignal {
                    kind: report.reload,
                    task: event.task.clone(),
                };
                // No receivers just means no browser is connected.
                let clients = self.signals.send(signal).unwrap_or(0);
                debug!(task = %event.task, kind = report.reload.event_name(), clients, "sent reload signal");
            }
            TaskOutcome::Failed(cause) => {
                error!(task = %event.task, error = %cause, "task failed; not reloading");
            }
        }
    }
}

/// Running dev server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    join: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and drop open event streams.
    pub fn shutdown(self) {
        self.join.abort();
    }
}
