// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The build runner talks to a [`TaskExecutor`] instead of calling
//! [`Task::run`] directly, so tests can swap in a fake that records calls,
//! injects failures or delays.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::task::{Task, TaskReport};

/// Trait abstracting how a single task is executed.
pub trait TaskExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        task: Arc<Task>,
    ) -> Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + '_>>;
}

/// Production executor: runs the task's pipeline against a [`FileSystem`].
#[derive(Clone)]
pub struct PipelineExecutor {
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("fs", &self.fs)
            .finish()
    }
}

impl PipelineExecutor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl TaskExecutor for PipelineExecutor {
    fn execute(
        &self,
        task: Arc<Task>,
    ) -> Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + '_>> {
        let fs = Arc::clone(&self.fs);
        Box::pin(async move { task.run(fs).await })
    }
}
