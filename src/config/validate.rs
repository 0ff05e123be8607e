// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::resolve_order;
use crate::errors::{AssetdagError, Result};
use crate::paths::{compile_glob, safe_relative};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.server, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetdagError::Config(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if safe_relative(&cfg.config.dest).is_none() {
        return Err(AssetdagError::Config(format!(
            "[config].dest must be a relative path inside the project (got '{}')",
            cfg.config.dest
        )));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.src.is_empty() {
            return Err(AssetdagError::Config(format!(
                "task '{}' must list at least one `src` pattern",
                name
            )));
        }

        if !task.out_dir.is_empty() && safe_relative(&task.out_dir).is_none() {
            return Err(AssetdagError::Config(format!(
                "task '{}' has out_dir '{}' outside the destination directory",
                name, task.out_dir
            )));
        }

        let patterns = task
            .src
            .iter()
            .chain(task.watch.iter())
            .chain(task.exclude.iter())
            .chain(task.transforms.iter().filter_map(|t| t.filter.as_ref()));
        for pattern in patterns {
            compile_glob(pattern).map_err(|e| {
                AssetdagError::Config(format!(
                    "task '{}' has invalid glob '{}': {}",
                    name, pattern, e
                ))
            })?;
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.depends_on.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(AssetdagError::UnknownDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let nodes = cfg
        .task
        .iter()
        .map(|(name, task)| (name.as_str(), task.depends_on.as_slice()));
    resolve_order(nodes).map(|_| ())
}
