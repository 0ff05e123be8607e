// src/fs/mod.rs

//! Filesystem seam used by task input collection, output writing and
//! `clean`. Tests swap in [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::NamedTempFile;

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace the contents of `path`, creating parent directories.
    ///
    /// Readers never observe a half-written file.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Replace several files at once.
    ///
    /// Every file is staged before the first one is replaced, so a failure
    /// while staging leaves all targets untouched.
    fn write_batch(&self, files: &[(PathBuf, &[u8])]) -> Result<()> {
        for (path, contents) in files {
            self.write(path, contents)?;
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Remove a directory tree. Returns `false` if it did not exist.
    fn remove_dir_all(&self, path: &Path) -> Result<bool>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let staged = stage(path, contents)?;
        commit(staged, path)
    }

    fn write_batch(&self, files: &[(PathBuf, &[u8])]) -> Result<()> {
        // Dropping the staged files on an early return deletes them.
        let mut staged = Vec::with_capacity(files.len());
        for (path, contents) in files {
            staged.push((stage(path, contents)?, path));
        }
        for (tmp, path) in staged {
            commit(tmp, path)?;
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("removing {:?}", path)),
        }
    }
}

/// Write `contents` to a temp file next to `path`.
fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("no parent directory for {:?}", path))?;
    fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".assetdag-")
        .tempfile_in(parent)
        .with_context(|| format!("creating temp file in {:?}", parent))?;
    tmp.write_all(contents)
        .with_context(|| format!("writing temp file for {:?}", path))?;
    tmp.as_file().sync_all().ok();
    Ok(tmp)
}

/// Move a staged file into place. The temp file is removed if this fails.
fn commit(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path)
        .map_err(|e| anyhow::Error::new(e.error))
        .with_context(|| format!("moving {:?} into place", path))?;
    Ok(())
}
