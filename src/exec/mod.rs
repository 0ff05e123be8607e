// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the [`TaskExecutor`] trait and the production
//!   [`PipelineExecutor`], which tests replace with a fake.

pub mod backend;

pub use backend::{PipelineExecutor, TaskExecutor};
