// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::engine::TaskName;

/// Boxed cause carried by task-time errors.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("dependency cycle between tasks: {}", .members.join(", "))]
    Cycle { members: Vec<TaskName> },

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),

    #[error("task '{task}': transform '{transform}' failed: {source}")]
    Transform {
        task: TaskName,
        transform: String,
        #[source]
        source: Cause,
    },

    #[error("task '{task}' failed: {source}")]
    Task {
        task: TaskName,
        #[source]
        source: Cause,
    },

    #[error("cannot watch pattern '{pattern}': {source}")]
    Watch {
        pattern: String,
        #[source]
        source: notify::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetdagError {
    /// Wrap a non-transform failure of `task`.
    pub fn task(task: impl Into<TaskName>, source: impl Into<Cause>) -> Self {
        AssetdagError::Task {
            task: task.into(),
            source: source.into(),
        }
    }

    /// Name of the task this error belongs to, if it is a task-time error.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            AssetdagError::Transform { task, .. }
            | AssetdagError::Task { task, .. }
            | AssetdagError::UnknownTask(task) => Some(task.as_str()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
