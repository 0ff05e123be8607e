use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Build flavour for a whole invocation.
///
/// Chosen once on the command line (`--release`) and carried by the loaded
/// configuration; transforms never look at it directly, the task graph drops
/// steps whose [`TransformWhen`] does not match while it is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Development,
    Release,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Release => f.write_str("release"),
        }
    }
}

/// Condition attached to a single transform entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformWhen {
    #[default]
    Always,
    Release,
    Development,
}

impl TransformWhen {
    pub fn applies_to(self, mode: BuildMode) -> bool {
        match self {
            TransformWhen::Always => true,
            TransformWhen::Release => mode == BuildMode::Release,
            TransformWhen::Development => mode == BuildMode::Development,
        }
    }
}

/// What connected browsers should do after a task rebuilt its output.
///
/// - `Style`: swap stylesheets in place without losing page state.
/// - `Full`: reload the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    Style,
    Full,
}

impl ReloadKind {
    /// Infer the reload kind from the files a task produced.
    ///
    /// Only a non-empty, all-`.css` output set counts as a style change.
    pub fn infer<'a, I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut any = false;
        for path in outputs {
            any = true;
            if !path.ends_with(".css") {
                return ReloadKind::Full;
            }
        }
        if any { ReloadKind::Style } else { ReloadKind::Full }
    }

    /// Event name used on the live-reload channel.
    pub fn event_name(self) -> &'static str {
        match self {
            ReloadKind::Style => "style",
            ReloadKind::Full => "reload",
        }
    }
}

impl FromStr for ReloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "style" => Ok(ReloadKind::Style),
            "full" => Ok(ReloadKind::Full),
            other => Err(format!(
                "invalid reload kind: {other} (expected \"style\" or \"full\")"
            )),
        }
    }
}
