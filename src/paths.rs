// src/paths.rs

//! Glob and path helpers shared by task input collection and the watcher.
//!
//! All patterns are written relative to the project root with forward
//! slashes, e.g. `src/styles/**/*.scss`.

use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobBuilder};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Build a glob where `*` and `?` never match `/`.
///
/// Only `**` crosses directories, so a pattern's watch mode
/// ([`spans_directories`]) agrees with what it matches.
pub fn compile_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Whether `s` contains any glob metacharacter.
pub fn has_glob_meta(s: &str) -> bool {
    s.contains(GLOB_META)
}

/// Strip a leading `./` so patterns and relative paths compare equal.
pub fn normalize_pattern(pattern: &str) -> &str {
    let mut p = pattern;
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}

/// Directory prefix of a pattern that contains no glob metacharacters.
///
/// - `src/images/**/*` -> `src/images`
/// - `src/styles/styles.scss` -> `src/styles` (a literal file's parent)
/// - `*.js` -> `` (the root itself)
pub fn glob_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = normalize_pattern(pattern).split('/').collect();
    let literal = segments.iter().take_while(|s| !has_glob_meta(s)).count();
    let take = if literal == segments.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };
    segments
        .iter()
        .take(take)
        .filter(|s| !s.is_empty() && **s != ".")
        .collect()
}

/// Whether matching `pattern` requires looking below its base directory.
pub fn spans_directories(pattern: &str) -> bool {
    let pattern = normalize_pattern(pattern);
    let base_len = glob_base(pattern).to_string_lossy().len();
    let rest = pattern.get(base_len..).unwrap_or(pattern).trim_start_matches('/');
    rest.contains('/') || rest.contains("**")
}

/// Number of characters before the first glob metacharacter.
pub fn literal_prefix_len(pattern: &str) -> usize {
    let pattern = normalize_pattern(pattern);
    pattern.find(GLOB_META).unwrap_or(pattern.len())
}

/// Number of glob metacharacters; `**` counts once.
pub fn wildcard_count(pattern: &str) -> usize {
    normalize_pattern(pattern)
        .replace("**", "*")
        .chars()
        .filter(|c| GLOB_META.contains(c))
        .count()
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Tries a plain `strip_prefix` first and falls back to canonicalizing both
/// sides (macOS reports `/private/var/...` for `/var/...`, for example).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path
        .canonicalize()
        .ok()
        .or_else(|| canonical_parent_join(path))?;
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}

/// Removed files can't be canonicalized; resolve their parent instead.
fn canonical_parent_join(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}

/// Render a relative path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Validate that `rel` stays inside whatever directory it is joined onto.
///
/// Only plain components are allowed: no `..`, no root, no drive prefix.
pub fn safe_relative(rel: &str) -> Option<PathBuf> {
    let path = Path::new(rel);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_base_stops_at_first_wildcard_segment() {
        assert_eq!(glob_base("src/images/**/*"), PathBuf::from("src/images"));
        assert_eq!(glob_base("./src/scripts/*.js"), PathBuf::from("src/scripts"));
        assert_eq!(glob_base("src/styles/styles.scss"), PathBuf::from("src/styles"));
        assert_eq!(glob_base("*.js"), PathBuf::new());
        assert_eq!(glob_base("index.html"), PathBuf::new());
    }

    #[test]
    fn spans_directories_detects_recursive_patterns() {
        assert!(spans_directories("src/**/*.scss"));
        assert!(spans_directories("src/*/main.js"));
        assert!(!spans_directories("src/styles/*.scss"));
        assert!(!spans_directories("src/styles/styles.scss"));
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let glob = compile_glob("src/styles/*.css").unwrap().compile_matcher();
        assert!(glob.is_match("src/styles/a.css"));
        assert!(!glob.is_match("src/styles/sub/b.css"));
        assert!(!spans_directories("src/styles/*.css"));

        let deep = compile_glob("src/styles/**/*.css").unwrap().compile_matcher();
        assert!(deep.is_match("src/styles/a.css"));
        assert!(deep.is_match("src/styles/sub/b.css"));
        assert!(spans_directories("src/styles/**/*.css"));
    }

    #[test]
    fn specificity_helpers() {
        assert_eq!(literal_prefix_len("src/styles/**/*.scss"), "src/styles/".len());
        assert_eq!(wildcard_count("src/styles/**/*.scss"), 2);
        assert_eq!(wildcard_count("src/styles/main.scss"), 0);
    }

    #[test]
    fn safe_relative_rejects_escapes() {
        assert_eq!(safe_relative("a/b.css"), Some(PathBuf::from("a/b.css")));
        assert_eq!(safe_relative("./a.css"), Some(PathBuf::from("a.css")));
        assert_eq!(safe_relative("../a.css"), None);
        assert_eq!(safe_relative("a/../../b"), None);
        assert_eq!(safe_relative("/etc/passwd"), None);
        assert_eq!(safe_relative(""), None);
    }
}
