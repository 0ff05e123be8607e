// src/task/io.rs

//! Reading task inputs and writing task outputs through [`FileSystem`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::{debug, warn};

use super::Task;
use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::paths::{compile_glob, glob_base, has_glob_meta, normalize_pattern, relative_str, safe_relative, to_slash};
use crate::transform::FileSet;

/// What [`write_outputs`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: usize,
    pub unchanged: usize,
    /// Output paths relative to the destination directory.
    pub outputs: Vec<String>,
}

/// Collect every file matching the task's source patterns.
///
/// Keys are relative to the task's `base`, or to the non-glob prefix of the
/// pattern that matched. Two different files mapping to the same key fail
/// the task. Missing literal sources are skipped with a warning. Files under
/// the destination directory are never inputs.
pub fn read_inputs(task: &Task, fs: &dyn FileSystem) -> Result<FileSet> {
    let root = task.root();
    let dest_rel = relative_str(root, task.dest_dir()).unwrap_or_default();
    let base = task.base().map(|b| normalize_pattern(b).trim_end_matches('/').to_string());

    let mut files = FileSet::new();
    let mut origins: BTreeMap<String, String> = BTreeMap::new();

    for pattern in task.sources() {
        let pattern = normalize_pattern(pattern);
        let matcher = compile_glob(pattern)
            .map_err(|e| AssetdagError::task(task.name(), e))?
            .compile_matcher();
        let pattern_base = to_slash(&glob_base(pattern));

        let candidates = if has_glob_meta(pattern) {
            let start = root.join(glob_base(pattern));
            if !fs.is_dir(&start) {
                debug!(task = task.name(), pattern, "source directory does not exist");
                continue;
            }
            let mut found = Vec::new();
            walk(fs, &start, &mut found).map_err(|e| AssetdagError::task(task.name(), e))?;
            found
        } else {
            let literal = root.join(pattern);
            if !fs.is_file(&literal) {
                warn!(task = task.name(), pattern, "source file does not exist");
                continue;
            }
            vec![literal]
        };

        for path in candidates {
            let Some(rel) = relative_str(root, &path) else {
                continue;
            };
            if !matcher.is_match(&rel) || task.is_excluded(&rel) || is_under(&rel, &dest_rel) {
                continue;
            }

            let key = match &base {
                Some(base) => strip_dir(&rel, base).ok_or_else(|| {
                    AssetdagError::task(
                        task.name(),
                        anyhow!("input '{}' is outside base directory '{}'", rel, base),
                    )
                })?,
                None => strip_dir(&rel, &pattern_base).unwrap_or_else(|| rel.clone()),
            };

            if let Some(existing) = origins.get(&key) {
                if existing != &rel {
                    return Err(AssetdagError::task(
                        task.name(),
                        anyhow!(
                            "inputs '{}' and '{}' both map to '{}'",
                            existing,
                            rel,
                            key
                        ),
                    ));
                }
                continue;
            }

            let contents = fs
                .read(&path)
                .map_err(|e| AssetdagError::task(task.name(), e))?;
            origins.insert(key.clone(), rel);
            files.insert(key, contents);
        }
    }

    Ok(files)
}

/// Write `outputs` under the task's output directory.
///
/// Every path is checked before the first write; one that escapes the
/// output directory fails the task with nothing written. Changed files are
/// written as one batch, so a write error leaves the previous output in
/// place. Files whose bytes already match are left alone.
pub fn write_outputs(task: &Task, fs: &dyn FileSystem, outputs: &FileSet) -> Result<WriteSummary> {
    let mut targets = Vec::with_capacity(outputs.len());
    for (rel, contents) in outputs {
        let safe = safe_relative(rel).ok_or_else(|| {
            AssetdagError::task(
                task.name(),
                anyhow!("output path '{}' escapes the output directory", rel),
            )
        })?;
        targets.push((safe, contents));
    }

    let out_prefix = task
        .out_dir()
        .strip_prefix(task.dest_dir())
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut summary = WriteSummary::default();
    let mut changed: Vec<(PathBuf, &[u8])> = Vec::new();
    for (rel, contents) in targets {
        let target = task.out_dir().join(&rel);

        let unchanged = fs.is_file(&target)
            && fs
                .read(&target)
                .map(|existing| existing == *contents)
                .unwrap_or(false);

        if unchanged {
            summary.unchanged += 1;
        } else {
            changed.push((target, contents.as_slice()));
        }
        summary.outputs.push(to_slash(&out_prefix.join(&rel)));
    }

    fs.write_batch(&changed)
        .map_err(|e| AssetdagError::task(task.name(), e))?;
    summary.written = changed.len();

    Ok(summary)
}

fn walk(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in fs.read_dir(dir)? {
        if fs.is_dir(&entry) {
            walk(fs, &entry, out)?;
        } else if fs.is_file(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

/// `rel` with the leading `dir/` removed; `dir` may be empty.
fn strip_dir(rel: &str, dir: &str) -> Option<String> {
    if dir.is_empty() {
        return Some(rel.to_string());
    }
    rel.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

fn is_under(rel: &str, dir: &str) -> bool {
    !dir.is_empty() && (rel == dir || strip_dir(rel, dir).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_dir_requires_a_path_boundary() {
        assert_eq!(strip_dir("src/images/a.png", "src/images"), Some("a.png".to_string()));
        assert_eq!(strip_dir("src/imagesx/a.png", "src/images"), None);
        assert_eq!(strip_dir("a.png", ""), Some("a.png".to_string()));
    }

    #[test]
    fn files_under_dest_are_recognised() {
        assert!(is_under("dist/a.css", "dist"));
        assert!(!is_under("distx/a.css", "dist"));
        assert!(!is_under("a.css", ""));
    }
}
