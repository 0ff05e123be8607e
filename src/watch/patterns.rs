// src/watch/patterns.rs

use std::fmt;

use globset::{GlobMatcher, GlobSet, GlobSetBuilder};

use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::paths::{compile_glob, literal_prefix_len, normalize_pattern, wildcard_count};

/// One watch pattern owned by one task.
#[derive(Clone)]
pub struct WatchRegistration {
    pattern: String,
    task: TaskName,
    /// Declaration order across the whole config, used as the last tiebreak.
    order: usize,
    matcher: GlobMatcher,
}

impl fmt::Debug for WatchRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistration")
            .field("pattern", &self.pattern)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl WatchRegistration {
    pub fn new(pattern: &str, task: impl Into<TaskName>, order: usize) -> Result<Self> {
        let task = task.into();
        let pattern = normalize_pattern(pattern).to_string();
        let matcher = compile_glob(&pattern)
            .map_err(|e| {
                AssetdagError::Config(format!(
                    "task '{}' has invalid watch glob '{}': {}",
                    task, pattern, e
                ))
            })?
            .compile_matcher();
        Ok(Self {
            pattern,
            task,
            order,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Sort key where smaller means more specific.
    fn specificity(&self) -> (std::cmp::Reverse<usize>, usize, usize) {
        (
            std::cmp::Reverse(literal_prefix_len(&self.pattern)),
            wildcard_count(&self.pattern),
            self.order,
        )
    }
}

/// Every watch registration of a session plus per-task excludes.
#[derive(Debug, Clone, Default)]
pub struct WatchTable {
    registrations: Vec<WatchRegistration>,
    excludes: Vec<(TaskName, GlobSet)>,
    /// Destination directory relative to the root; changes below it never
    /// trigger anything.
    dest: String,
}

impl WatchTable {
    pub fn new(dest: impl Into<String>) -> Self {
        Self {
            registrations: Vec::new(),
            excludes: Vec::new(),
            dest: dest.into().trim_end_matches('/').to_string(),
        }
    }

    /// Registrations for every task's watch patterns, in graph order.
    pub fn from_graph(graph: &TaskGraph, dest: impl Into<String>) -> Result<Self> {
        let mut table = Self::new(dest);
        for task in graph.tasks() {
            table.add_task(task.name(), task.watch_patterns(), task.exclude_patterns())?;
        }
        Ok(table)
    }

    pub fn add_task(&mut self, task: &str, watch: &[String], exclude: &[String]) -> Result<()> {
        for pattern in watch {
            let order = self.registrations.len();
            self.registrations
                .push(WatchRegistration::new(pattern, task, order)?);
        }

        if !exclude.is_empty() {
            let mut builder = GlobSetBuilder::new();
            for pattern in exclude {
                let glob = compile_glob(normalize_pattern(pattern)).map_err(|e| {
                    AssetdagError::Config(format!(
                        "task '{}' has invalid exclude glob '{}': {}",
                        task, pattern, e
                    ))
                })?;
                builder.add(glob);
            }
            let set = builder
                .build()
                .map_err(|e| AssetdagError::Config(format!("task '{}': {}", task, e)))?;
            self.excludes.push((task.to_string(), set));
        }
        Ok(())
    }

    pub fn registrations(&self) -> &[WatchRegistration] {
        &self.registrations
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn is_excluded(&self, task: &str, rel_path: &str) -> bool {
        self.excludes
            .iter()
            .any(|(t, set)| t == task && set.is_match(rel_path))
    }

    fn is_in_dest(&self, rel_path: &str) -> bool {
        !self.dest.is_empty()
            && (rel_path == self.dest
                || rel_path
                    .strip_prefix(&self.dest)
                    .is_some_and(|rest| rest.starts_with('/')))
    }

    /// Most specific registration matching `rel_path`.
    ///
    /// Ranking: longest literal prefix, then fewest wildcards, then
    /// declaration order. A task's excludes remove its registrations from
    /// the candidates.
    pub fn resolve(&self, rel_path: &str) -> Option<&WatchRegistration> {
        if self.is_in_dest(rel_path) {
            return None;
        }
        self.registrations
            .iter()
            .filter(|r| r.matches(rel_path) && !self.is_excluded(r.task(), rel_path))
            .min_by_key(|r| r.specificity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &[&str])]) -> WatchTable {
        let mut table = WatchTable::new("dist");
        for (task, patterns) in entries {
            let watch: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
            table.add_task(task, &watch, &[]).unwrap();
        }
        table
    }

    #[test]
    fn longer_literal_prefix_wins() {
        let t = table(&[
            ("all", &["src/**/*"]),
            ("styles", &["src/styles/**/*.scss"]),
        ]);
        let hit = t.resolve("src/styles/base/_reset.scss").unwrap();
        assert_eq!(hit.task(), "styles");
        assert_eq!(t.resolve("src/scripts/app.js").unwrap().task(), "all");
    }

    #[test]
    fn fewer_wildcards_break_prefix_ties() {
        let t = table(&[("loose", &["src/*/*.js"]), ("tight", &["src/*/app.js"])]);
        assert_eq!(t.resolve("src/scripts/app.js").unwrap().task(), "tight");
    }

    #[test]
    fn declaration_order_breaks_full_ties() {
        let t = table(&[("first", &["src/**/*.js"]), ("second", &["src/**/*.js"])]);
        assert_eq!(t.resolve("src/a.js").unwrap().task(), "first");
    }

    #[test]
    fn dest_and_excludes_never_match() {
        let mut t = table(&[("all", &["**/*"])]);
        assert!(t.resolve("dist/styles/styles.css").is_none());

        t.add_task("images", &["src/images/**/*".to_string()], &["**/*.tmp".to_string()])
            .unwrap();
        assert_eq!(t.resolve("src/images/a.tmp").unwrap().task(), "all");
        assert_eq!(t.resolve("src/images/a.png").unwrap().task(), "images");
    }
}
