// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling task watch / exclude patterns into a [`WatchTable`].
//! - Debouncing bursts of changes per task.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does not run tasks; it only turns filesystem changes into task-level
//! triggers for the runtime.

pub mod debounce;
pub mod patterns;
pub mod watcher;

pub use debounce::Debouncer;
pub use patterns::{WatchRegistration, WatchTable};
pub use watcher::{WatcherHandle, WatcherState, spawn_watcher};
