// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::task::Task;
use crate::transform::TransformRegistry;

/// Task names with no dependency between them, sorted.
pub type Batch = Vec<TaskName>;

/// Resolve `(task, dependencies)` pairs into topological batches.
///
/// Every dependency of a task lands in a strictly earlier batch; a task sits
/// in the batch right after its deepest dependency.
///
/// Fails with [`AssetdagError::UnknownDependency`] for a dependency that is
/// not itself a task and with [`AssetdagError::Cycle`] naming every task
/// that takes part in a cycle.
pub fn resolve_order<'a, I, D>(nodes: I) -> Result<Vec<Batch>>
where
    I: IntoIterator<Item = (&'a str, D)>,
    D: AsRef<[TaskName]>,
{
    let nodes: BTreeMap<&'a str, D> = nodes.into_iter().collect();

    for (name, deps) in nodes.iter() {
        for dep in deps.as_ref() {
            if !nodes.contains_key(dep.as_str()) {
                return Err(AssetdagError::UnknownDependency {
                    task: name.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in nodes.keys() {
        graph.add_node(*name);
    }
    for (name, deps) in nodes.iter() {
        for dep in deps.as_ref() {
            graph.add_edge(dep.as_str(), *name, ());
        }
    }

    let mut members: BTreeSet<&str> = BTreeSet::new();
    for scc in tarjan_scc(&graph) {
        if scc.len() > 1 {
            members.extend(scc);
        } else if let Some(&node) = scc.first() {
            if graph.contains_edge(node, node) {
                members.insert(node);
            }
        }
    }
    if !members.is_empty() {
        return Err(AssetdagError::Cycle {
            members: members.into_iter().map(str::to_string).collect(),
        });
    }

    let order = toposort(&graph, None).map_err(|cycle| AssetdagError::Cycle {
        members: vec![cycle.node_id().to_string()],
    })?;

    let mut levels: BTreeMap<&str, usize> = BTreeMap::new();
    for node in order {
        let level = nodes[node]
            .as_ref()
            .iter()
            .filter_map(|dep| levels.get(dep.as_str()))
            .map(|l| l + 1)
            .max()
            .unwrap_or(0);
        levels.insert(node, level);
    }

    let depth = levels.values().copied().max().map_or(0, |max| max + 1);
    let mut batches: Vec<Batch> = vec![Vec::new(); depth];
    for (name, level) in levels {
        batches[level].push(name.to_string());
    }
    for batch in batches.iter_mut() {
        batch.sort();
    }

    Ok(batches)
}

/// Immutable graph of resolved tasks plus their batch order.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, Arc<Task>>,
    batches: Vec<Batch>,
}

impl TaskGraph {
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        let batches = resolve_order(tasks.iter().map(|t| (t.name(), t.deps())))?;
        let tasks = tasks
            .into_iter()
            .map(|t| (t.name().to_string(), Arc::new(t)))
            .collect();
        Ok(Self { tasks, batches })
    }

    /// Resolve every configured task against `registry`.
    pub fn from_config(cfg: &ConfigFile, registry: &TransformRegistry) -> Result<Self> {
        let tasks = cfg
            .tasks()
            .iter()
            .map(|(name, task)| Task::from_config(name, task, cfg, registry))
            .collect::<Result<Vec<_>>>()?;
        Self::new(tasks)
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.tasks.get(name).map(|t| t.deps()).unwrap_or(&[])
    }

    /// Immediate dependents of a task, sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.tasks
            .values()
            .filter(|t| t.deps().iter().any(|d| d == name))
            .map(|t| t.name())
            .collect()
    }
}
