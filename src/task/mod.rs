// src/task/mod.rs

//! A named unit of work: read inputs, run the transform chain, write
//! outputs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use globset::{GlobSet, GlobSetBuilder};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::model::{ConfigFile, TaskConfig};
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::paths::compile_glob;
use crate::transform::{FileSet, TransformRegistry, TransformStep};
use crate::types::ReloadKind;

pub mod io;

pub use io::{WriteSummary, read_inputs, write_outputs};

/// Immutable task definition, resolved from config.
#[derive(Debug)]
pub struct Task {
    name: TaskName,
    root: PathBuf,
    sources: Vec<String>,
    base: Option<String>,
    steps: Vec<Arc<TransformStep>>,
    deps: Vec<TaskName>,
    watch: Vec<String>,
    exclude: Vec<String>,
    excluded: GlobSet,
    out_dir: PathBuf,
    dest_dir: PathBuf,
    reload: Option<ReloadKind>,
}

/// Outcome of one successful task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskName,
    /// Files whose contents changed on disk.
    pub written: usize,
    /// Files skipped because the bytes on disk already matched.
    pub unchanged: usize,
    /// Every output path, relative to the destination directory.
    pub outputs: Vec<String>,
    /// blake3 over the final output set (paths and contents).
    pub digest: String,
    pub reload: ReloadKind,
    pub elapsed: Duration,
}

impl Task {
    /// Minimal task for code paths that never touch the filesystem,
    /// such as graph ordering and scheduling tests.
    pub fn new(name: impl Into<TaskName>, deps: Vec<TaskName>) -> Self {
        Self {
            name: name.into(),
            root: PathBuf::from("."),
            sources: Vec::new(),
            base: None,
            steps: Vec::new(),
            deps,
            watch: Vec::new(),
            exclude: Vec::new(),
            excluded: GlobSet::empty(),
            out_dir: PathBuf::from("dist"),
            dest_dir: PathBuf::from("dist"),
            reload: None,
        }
    }

    /// Resolve a configured task.
    ///
    /// Transform entries whose `when` does not match the config's build mode
    /// are dropped here.
    pub fn from_config(
        name: &str,
        task: &TaskConfig,
        cfg: &ConfigFile,
        registry: &TransformRegistry,
    ) -> Result<Self> {
        let mut steps = Vec::new();
        for spec in &task.transforms {
            if !spec.when.applies_to(cfg.mode()) {
                debug!(task = name, transform = %spec.name, mode = %cfg.mode(), "skipping transform for build mode");
                continue;
            }

            let filter = spec
                .filter
                .as_deref()
                .map(|pattern| compile_glob(pattern).map(|g| g.compile_matcher()))
                .transpose()
                .map_err(|e| {
                    AssetdagError::Config(format!(
                        "task '{}': transform '{}' has invalid filter: {}",
                        name, spec.name, e
                    ))
                })?;

            let transform = registry.resolve(&spec.name, &spec.options).map_err(|e| {
                AssetdagError::Config(format!(
                    "task '{}': transform '{}': {:#}",
                    name, spec.name, e
                ))
            })?;

            steps.push(Arc::new(TransformStep::new(&spec.name, filter, transform)));
        }

        let dest_dir = cfg.dest_dir();
        Ok(Self {
            name: name.to_string(),
            root: cfg.root().to_path_buf(),
            sources: task.src.clone(),
            base: task.base.clone(),
            steps,
            deps: task.depends_on.clone(),
            watch: task.effective_watch().to_vec(),
            exclude: task.exclude.clone(),
            excluded: build_globset(name, &task.exclude)?,
            out_dir: dest_dir.join(&task.out_dir),
            dest_dir,
            reload: task.reload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[TaskName] {
        &self.deps
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn watch_patterns(&self) -> &[String] {
        &self.watch
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_excluded(&self, rel: &str) -> bool {
        self.excluded.is_match(rel)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn transform_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name())
    }

    /// Apply the transform chain in order, each step consuming the
    /// previous step's output.
    ///
    /// Steps run on the blocking pool. The first failing step aborts the
    /// chain with [`AssetdagError::Transform`].
    pub async fn execute(&self, inputs: FileSet) -> Result<FileSet> {
        let mut files = inputs;
        for step in &self.steps {
            let step = Arc::clone(step);
            let name = step.name().to_string();
            debug!(task = %self.name, transform = %name, files = files.len(), "applying transform");

            let joined = tokio::task::spawn_blocking(move || step.apply(files)).await;
            files = match joined {
                Ok(Ok(out)) => out,
                Ok(Err(e)) => {
                    return Err(AssetdagError::Transform {
                        task: self.name.clone(),
                        transform: name,
                        source: e.into(),
                    });
                }
                Err(join_err) => {
                    return Err(AssetdagError::Transform {
                        task: self.name.clone(),
                        transform: name,
                        source: Box::new(join_err),
                    });
                }
            };
        }
        Ok(files)
    }

    /// Full run: read, transform, write.
    ///
    /// Nothing is written unless the whole chain succeeded.
    pub async fn run(&self, fs: Arc<dyn FileSystem>) -> Result<TaskReport> {
        let started = Instant::now();

        let inputs = read_inputs(self, fs.as_ref())?;
        debug!(task = %self.name, inputs = inputs.len(), "collected inputs");

        let outputs = self.execute(inputs).await?;
        let digest = digest(&outputs);

        let summary = write_outputs(self, fs.as_ref(), &outputs)?;
        let reload = self
            .reload
            .unwrap_or_else(|| ReloadKind::infer(summary.outputs.iter().map(String::as_str)));

        let report = TaskReport {
            task: self.name.clone(),
            written: summary.written,
            unchanged: summary.unchanged,
            outputs: summary.outputs,
            digest,
            reload,
            elapsed: started.elapsed(),
        };
        info!(
            task = %self.name,
            written = report.written,
            unchanged = report.unchanged,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "task finished"
        );
        Ok(report)
    }
}

fn build_globset(task: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = compile_glob(pattern).map_err(|e| {
            AssetdagError::Config(format!("task '{}' has invalid glob '{}': {}", task, pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AssetdagError::Config(format!("task '{}': {}", task, e)))
}

/// Stable digest of a file set: each path and its contents, in order.
pub fn digest(files: &FileSet) -> String {
    let mut hasher = blake3::Hasher::new();
    for (path, contents) in files {
        hasher.update(&(path.len() as u64).to_le_bytes());
        hasher.update(path.as_bytes());
        hasher.update(&(contents.len() as u64).to_le_bytes());
        hasher.update(contents);
    }
    hasher.finalize().to_hex().to_string()
}
