#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use assetdag::config::{ConfigFile, ConfigSection, RawConfigFile, ServerSection, TaskConfig, TransformSpec};
use assetdag::errors::Result;
use assetdag::types::{ReloadKind, TransformWhen};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                server: ServerSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.config.config.dest = dest.to_string();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }

    /// Build and anchor at `root`.
    pub fn build_at(self, root: &Path) -> ConfigFile {
        self.build().with_root(root)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(src: &str) -> Self {
        Self {
            task: TaskConfig {
                src: vec![src.to_string()],
                ..TaskConfig::default()
            },
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.task.depends_on.push(dep.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task.watch.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn out_dir(mut self, dir: &str) -> Self {
        self.task.out_dir = dir.to_string();
        self
    }

    pub fn reload(mut self, kind: ReloadKind) -> Self {
        self.task.reload = Some(kind);
        self
    }

    /// Append a transform without options.
    pub fn transform(self, name: &str) -> Self {
        self.transform_with(name, &[])
    }

    /// Append a transform with string options.
    pub fn transform_with(mut self, name: &str, options: &[(&str, &str)]) -> Self {
        let mut spec = TransformSpec::named(name);
        for (key, value) in options {
            spec.options
                .insert(key.to_string(), toml::Value::String(value.to_string()));
        }
        self.task.transforms.push(spec);
        self
    }

    /// Append a fully specified transform entry.
    pub fn transform_spec(mut self, spec: TransformSpec) -> Self {
        self.task.transforms.push(spec);
        self
    }

    /// Restrict the last transform to a build mode.
    pub fn when(mut self, when: TransformWhen) -> Self {
        if let Some(last) = self.task.transforms.last_mut() {
            last.when = when;
        }
        self
    }

    /// Restrict the last transform to files matching `glob`.
    pub fn filter(mut self, glob: &str) -> Self {
        if let Some(last) = self.task.transforms.last_mut() {
            last.filter = Some(glob.to_string());
        }
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
