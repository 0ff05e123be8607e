// src/transform/mod.rs

//! File-set transforms.
//!
//! - [`registry`] maps configured names to constructors.
//! - [`builtin`] holds the generic transforms shipped with the tool.
//! - [`template`] renders minijinja templates.
//!
//! A transform is a pure function from one [`FileSet`] to another. Tasks
//! chain them; the chain never touches the filesystem.

use std::collections::BTreeMap;
use std::fmt::Debug;

use anyhow::Result;
use globset::GlobMatcher;

pub mod builtin;
pub mod registry;
pub mod template;

pub use registry::TransformRegistry;

/// Relative path (forward slashes) to file contents, ordered by path.
pub type FileSet = BTreeMap<String, Vec<u8>>;

/// A single file-set transformation.
///
/// Implementations must be deterministic for identical inputs and options.
pub trait Transform: Send + Sync + Debug {
    fn apply(&self, files: FileSet) -> Result<FileSet>;
}

/// A resolved entry of a task's transform chain.
#[derive(Debug)]
pub struct TransformStep {
    name: String,
    filter: Option<GlobMatcher>,
    transform: Box<dyn Transform>,
}

impl TransformStep {
    pub fn new(
        name: impl Into<String>,
        filter: Option<GlobMatcher>,
        transform: Box<dyn Transform>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            transform,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transform on the files selected by the filter; the rest
    /// pass through untouched.
    ///
    /// When a selected and a passed-through file end up at the same path,
    /// the transform's output wins.
    pub fn apply(&self, files: FileSet) -> Result<FileSet> {
        let Some(filter) = &self.filter else {
            return self.transform.apply(files);
        };

        let (selected, mut passthrough): (FileSet, FileSet) =
            files.into_iter().partition(|(path, _)| filter.is_match(path));

        let produced = self.transform.apply(selected)?;
        passthrough.extend(produced);
        Ok(passthrough)
    }
}

/// Decode a file as UTF-8, naming the path on failure.
pub(crate) fn utf8<'a>(path: &str, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| anyhow::anyhow!("{path} is not valid UTF-8: {e}"))
}
