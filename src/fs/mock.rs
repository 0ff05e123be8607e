// src/fs/mock.rs

//! In-memory [`FileSystem`] for tests.
//!
//! Paths are normalised by dropping `.` components, so `./src/a.css` and
//! `src/a.css` name the same entry. The root is `.`.

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>), // child names
}

#[derive(Debug, Clone)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
    /// Number of successful `write` calls, for asserting "nothing rewritten".
    writes: Arc<Mutex<usize>>,
    /// Paths whose writes fail.
    failing: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn key(path: &Path) -> PathBuf {
    let normal: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normal.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normal
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    Some(key(path.parent().unwrap_or(Path::new("."))))
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(BTreeSet::new()));
        Self {
            entries: Arc::new(Mutex::new(entries)),
            writes: Arc::new(Mutex::new(0)),
            failing: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        // A poisoned mock only happens after a test already panicked.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut entries = self.lock();
        Self::ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::File(content.into()));
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().get(&key(path.as_ref())) {
            Some(MockEntry::File(c)) => Some(c.clone()),
            _ => None,
        }
    }

    /// Make every later write to `path` fail.
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key(path.as_ref()));
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        let failing = self.failing.lock().unwrap_or_else(|p| p.into_inner());
        if failing.contains(&key(path)) {
            return Err(anyhow!("Write refused: {:?}", path));
        }
        Ok(())
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn ensure_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let mut child = path.to_path_buf();
        while let Some(parent) = parent_key(&child) {
            let name = child
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let entry = entries
                .entry(parent.clone())
                .or_insert_with(|| MockEntry::Dir(BTreeSet::new()));
            if let MockEntry::Dir(children) = entry {
                children.insert(name);
            }
            child = parent;
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_writable(path)?;
        self.add_file(path, contents);
        *self.writes.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }

    fn write_batch(&self, files: &[(PathBuf, &[u8])]) -> Result<()> {
        for (path, _) in files {
            self.check_writable(path)?;
        }
        for (path, contents) in files {
            self.write(path, contents)?;
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        let target = key(path);
        let mut entries = self.lock();
        if !entries.contains_key(&target) {
            return Ok(false);
        }
        entries.retain(|p, _| !p.starts_with(&target) || target == Path::new("."));
        if let (Some(parent), Some(name)) = (parent_key(&target), target.file_name()) {
            if let Some(MockEntry::Dir(children)) = entries.get_mut(&parent) {
                children.remove(name.to_string_lossy().as_ref());
            }
        }
        Ok(true)
    }
}
