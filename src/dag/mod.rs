// src/dag/mod.rs

//! Task dependency graph.
//!
//! - [`graph`] resolves declared dependencies into ordered batches and holds
//!   the immutable [`TaskGraph`] the engine runs against.

pub mod graph;

pub use graph::{Batch, TaskGraph, resolve_order};
