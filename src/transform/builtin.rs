// src/transform/builtin.rs

//! Generic, deterministic transforms available under fixed names.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::info;

use super::registry::parse_options;
use super::{FileSet, Transform, utf8};

/// Insert `path` into `out`, failing if another file already claimed it.
fn insert_unique(out: &mut FileSet, path: String, contents: Vec<u8>, what: &str) -> Result<()> {
    if out.contains_key(&path) {
        bail!("{what} maps two files to '{path}'");
    }
    out.insert(path, contents);
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoOptions {}

/// Identity transform; copies every file to the output unchanged.
#[derive(Debug)]
pub struct CopyFiles;

impl CopyFiles {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        parse_options::<NoOptions>(options)?;
        Ok(Box::new(CopyFiles))
    }
}

impl Transform for CopyFiles {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        Ok(files)
    }
}

/// Joins every file, in path order, into a single output file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Concat {
    output: String,
    #[serde(default = "default_separator")]
    separator: String,
}

fn default_separator() -> String {
    "\n".to_string()
}

impl Concat {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let concat: Concat = parse_options(options)?;
        if concat.output.trim().is_empty() {
            bail!("concat: `output` must not be empty");
        }
        Ok(Box::new(concat))
    }
}

impl Transform for Concat {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        if files.is_empty() {
            return Ok(FileSet::new());
        }

        let mut joined = Vec::new();
        for (i, contents) in files.into_values().enumerate() {
            if i > 0 {
                joined.extend_from_slice(self.separator.as_bytes());
            }
            joined.extend_from_slice(&contents);
        }

        let mut out = FileSet::new();
        out.insert(self.output.clone(), joined);
        Ok(out)
    }
}

/// Renames files by exact path, or swaps their extension.
///
/// Paths listed in `map` win over `extension`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rename {
    #[serde(default)]
    map: BTreeMap<String, String>,
    #[serde(default)]
    extension: Option<String>,
}

impl Rename {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let mut rename: Rename = parse_options(options)?;
        if rename.map.is_empty() && rename.extension.is_none() {
            bail!("rename: set `map`, `extension` or both");
        }
        rename.extension = rename
            .extension
            .map(|ext| ext.trim_start_matches('.').to_string());
        Ok(Box::new(rename))
    }

    fn target(&self, path: &str) -> String {
        if let Some(mapped) = self.map.get(path) {
            return mapped.clone();
        }
        match &self.extension {
            Some(ext) => with_extension(path, ext),
            None => path.to_string(),
        }
    }
}

impl Transform for Rename {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (path, contents) in files {
            insert_unique(&mut out, self.target(&path), contents, "rename")?;
        }
        Ok(out)
    }
}

/// Replace the extension of a slash-separated relative path.
pub(crate) fn with_extension(path: &str, ext: &str) -> String {
    let replaced = Path::new(path).with_extension(ext);
    crate::paths::to_slash(&replaced)
}

/// Drops directories from every path.
#[derive(Debug)]
pub struct Flatten;

impl Flatten {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        parse_options::<NoOptions>(options)?;
        Ok(Box::new(Flatten))
    }
}

impl Transform for Flatten {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (path, contents) in files {
            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            insert_unique(&mut out, name, contents, "flatten")?;
        }
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplaceOptions {
    pattern: String,
    #[serde(default)]
    replacement: String,
}

/// Regex replace over UTF-8 files. `$1` style group references work in
/// the replacement.
#[derive(Debug)]
pub struct Replace {
    pattern: Regex,
    replacement: String,
}

impl Replace {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let opts: ReplaceOptions = parse_options(options)?;
        let pattern = Regex::new(&opts.pattern)
            .map_err(|e| anyhow!("replace: invalid pattern '{}': {e}", opts.pattern))?;
        Ok(Box::new(Replace {
            pattern,
            replacement: opts.replacement,
        }))
    }
}

impl Transform for Replace {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (path, contents) in files {
            let text = utf8(&path, &contents)?;
            let replaced = self.pattern.replace_all(text, self.replacement.as_str());
            out.insert(path, replaced.into_owned().into_bytes());
        }
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StripCommentsOptions {
    #[serde(default)]
    line_comments: bool,
    #[serde(default = "default_true")]
    preserve_important: bool,
}

fn default_true() -> bool {
    true
}

/// Removes `/* ... */` comments and, optionally, whole-line `//` comments.
///
/// `/*! ... */` comments survive unless `preserve_important = false`.
/// Line comments are only stripped when they start a line, so `//` inside
/// URLs is left alone.
#[derive(Debug)]
pub struct StripComments {
    block: Regex,
    line: Option<Regex>,
    preserve_important: bool,
}

impl StripComments {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let opts: StripCommentsOptions = parse_options(options)?;
        let block = Regex::new(r"(?s)/\*.*?\*/")?;
        let line = if opts.line_comments {
            Some(Regex::new(r"(?m)^[ \t]*//[^\n]*(?:\n|$)")?)
        } else {
            None
        };
        Ok(Box::new(StripComments {
            block,
            line,
            preserve_important: opts.preserve_important,
        }))
    }

    fn strip(&self, text: &str) -> String {
        let preserve = self.preserve_important;
        let stripped = self.block.replace_all(text, |caps: &Captures| {
            let comment = &caps[0];
            if preserve && comment.starts_with("/*!") {
                comment.to_string()
            } else {
                String::new()
            }
        });
        match &self.line {
            Some(line) => line.replace_all(&stripped, "").into_owned(),
            None => stripped.into_owned(),
        }
    }
}

impl Transform for StripComments {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (path, contents) in files {
            let text = utf8(&path, &contents)?;
            out.insert(path, self.strip(text).into_bytes());
        }
        Ok(out)
    }
}

/// Trims every line and drops the blank ones.
#[derive(Debug)]
pub struct CollapseWhitespace;

impl CollapseWhitespace {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        parse_options::<NoOptions>(options)?;
        Ok(Box::new(CollapseWhitespace))
    }
}

impl Transform for CollapseWhitespace {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (path, contents) in files {
            let text = utf8(&path, &contents)?;
            let mut collapsed = String::with_capacity(text.len());
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                collapsed.push_str(line);
                collapsed.push('\n');
            }
            out.insert(path, collapsed.into_bytes());
        }
        Ok(out)
    }
}

/// Prepends fixed text to every file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Banner {
    text: String,
}

impl Banner {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let banner: Banner = parse_options(options)?;
        Ok(Box::new(banner))
    }
}

impl Transform for Banner {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        Ok(files
            .into_iter()
            .map(|(path, contents)| {
                let mut with_banner = Vec::with_capacity(self.text.len() + contents.len());
                with_banner.extend_from_slice(self.text.as_bytes());
                with_banner.extend_from_slice(&contents);
                (path, with_banner)
            })
            .collect())
    }
}

/// Logs the file count and total size, then passes everything through.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Size {
    #[serde(default)]
    title: Option<String>,
}

impl Size {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let size: Size = parse_options(options)?;
        Ok(Box::new(size))
    }
}

impl Transform for Size {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let bytes: usize = files.values().map(Vec::len).sum();
        info!(
            title = self.title.as_deref().unwrap_or("size"),
            files = files.len(),
            bytes,
            "{}",
            human_size(bytes)
        );
        Ok(files)
    }
}

fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["B", "kB", "MB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_uses_decimal_units() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(999), "999 B");
        assert_eq!(human_size(1500), "1.50 kB");
        assert_eq!(human_size(2_000_000), "2.00 MB");
    }

    #[test]
    fn with_extension_keeps_directories() {
        assert_eq!(with_extension("pages/index.hbs", "html"), "pages/index.html");
        assert_eq!(with_extension("readme", "md"), "readme.md");
    }
}
