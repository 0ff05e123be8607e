// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{BuildMode, ReloadKind, TransformWhen};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// dest = "dist"
/// debounce_ms = 100
///
/// [server]
/// port = 3000
///
/// [task.styles]
/// src = ["src/styles/styles.scss"]
/// watch = ["src/styles/**/*.scss"]
/// out_dir = "styles"
/// transforms = [{ name = "strip_comments", when = "release" }]
/// ```
///
/// All sections except `[task.*]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Destination directory, relative to the project root.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// Debounce window for file events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_dest() -> String {
    "dist".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            dest: default_dest(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[server]` section, used by `serve`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Source globs, relative to the project root.
    pub src: Vec<String>,

    /// Directory output paths are computed against. Defaults to the
    /// non-glob prefix of each source pattern.
    #[serde(default)]
    pub base: Option<String>,

    /// Ordered transform chain.
    #[serde(default)]
    pub transforms: Vec<TransformSpec>,

    /// Tasks that must finish before this one starts in a full build.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Patterns that re-run this task in watch mode. Empty means `src`.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Patterns ignored both as inputs and as watch triggers.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Output directory below `[config].dest`. Empty means `dest` itself.
    #[serde(default)]
    pub out_dir: String,

    /// Override the reload kind inferred from the written files.
    #[serde(default)]
    pub reload: Option<ReloadKind>,
}

impl TaskConfig {
    /// Watch patterns after applying the `src` fallback.
    pub fn effective_watch(&self) -> &[String] {
        if self.watch.is_empty() {
            &self.src
        } else {
            &self.watch
        }
    }
}

/// One entry in a task's `transforms` list.
///
/// Everything other than `name`, `filter` and `when` is handed to the
/// transform's constructor as its options table.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformSpec {
    pub name: String,

    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default)]
    pub when: TransformWhen,

    #[serde(flatten)]
    pub options: toml::Table,
}

impl TransformSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
            when: TransformWhen::Always,
            options: toml::Table::new(),
        }
    }
}

/// Validated configuration.
///
/// Only produced through `TryFrom<RawConfigFile>`, so holders can rely on:
/// at least one task, known dependencies, no cycles, compilable globs and
/// safe output directories. Transform names and options are checked when
/// the task graph is built against a registry.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    task: BTreeMap<String, TaskConfig>,
    root: PathBuf,
    mode: BuildMode,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        server: ServerSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            server,
            task,
            root: PathBuf::from("."),
            mode: BuildMode::default(),
        }
    }

    /// Project root all relative paths resolve against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Absolute (or root-joined) destination directory.
    pub fn dest_dir(&self) -> PathBuf {
        self.root.join(&self.config.dest)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.debounce_ms)
    }
}
