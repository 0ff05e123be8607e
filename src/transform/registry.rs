// src/transform/registry.rs

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

use super::Transform;
use super::builtin;
use super::template::Template;

/// Constructor validating an options table and building a transform.
pub type TransformFactory = fn(&toml::Table) -> Result<Box<dyn Transform>>;

/// Typed registry of transform constructors, keyed by configured name.
///
/// Lookups happen once while the task graph is built, so a misspelled name
/// or bad option fails before anything runs.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    factories: BTreeMap<String, TransformFactory>,
}

impl TransformRegistry {
    /// Registry without any transforms.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry preloaded with every built-in transform.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("copy", builtin::CopyFiles::from_options);
        registry.register("concat", builtin::Concat::from_options);
        registry.register("rename", builtin::Rename::from_options);
        registry.register("flatten", builtin::Flatten::from_options);
        registry.register("replace", builtin::Replace::from_options);
        registry.register("strip_comments", builtin::StripComments::from_options);
        registry.register("collapse_whitespace", builtin::CollapseWhitespace::from_options);
        registry.register("banner", builtin::Banner::from_options);
        registry.register("size", builtin::Size::from_options);
        registry.register("template", Template::from_options);
        registry
    }

    /// Add or replace a constructor.
    pub fn register(&mut self, name: impl Into<String>, factory: TransformFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }

    /// Build a fresh transform instance.
    pub fn resolve(&self, name: &str, options: &toml::Table) -> Result<Box<dyn Transform>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.names().collect();
            anyhow!("unknown transform '{}' (known: {})", name, known.join(", "))
        })?;
        factory(options)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Deserialize an options table into a typed options struct.
pub(crate) fn parse_options<T: DeserializeOwned>(options: &toml::Table) -> Result<T> {
    toml::Value::Table(options.clone())
        .try_into::<T>()
        .map_err(|e| anyhow!("invalid options: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_list_the_known_ones() {
        let registry = TransformRegistry::with_builtins();
        let err = registry.resolve("minify", &toml::Table::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown transform 'minify'"));
        assert!(msg.contains("concat"));
    }

    #[test]
    fn options_are_checked_at_resolve_time() {
        let registry = TransformRegistry::with_builtins();
        let mut options = toml::Table::new();
        options.insert("bogus".into(), toml::Value::Boolean(true));
        assert!(registry.resolve("copy", &options).is_err());
        assert!(registry.resolve("concat", &toml::Table::new()).is_err());
    }
}
