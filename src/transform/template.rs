// src/transform/template.rs

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use globset::{GlobSet, GlobSetBuilder};
use minijinja::{Environment, Value};
use serde::Deserialize;

use crate::paths::compile_glob;

use super::builtin::with_extension;
use super::registry::parse_options;
use super::{FileSet, Transform, utf8};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateOptions {
    #[serde(default)]
    partials: Vec<String>,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default)]
    vars: toml::Table,
}

fn default_extension() -> String {
    "html".to_string()
}

/// Renders every file as a minijinja template.
///
/// Files matching `partials` can be pulled in with `extends`, `include` or
/// `import` (by their relative path) but are not emitted themselves.
/// Rendered pages get their extension replaced. The context holds the
/// configured `vars` plus `page`, the relative path being rendered.
#[derive(Debug)]
pub struct Template {
    partials: GlobSet,
    extension: String,
    vars: BTreeMap<String, Value>,
}

impl Template {
    pub fn from_options(options: &toml::Table) -> Result<Box<dyn Transform>> {
        let opts: TemplateOptions = parse_options(options)?;

        let mut builder = GlobSetBuilder::new();
        for pattern in &opts.partials {
            builder.add(
                compile_glob(pattern)
                    .with_context(|| format!("template: invalid partials glob '{pattern}'"))?,
            );
        }

        let vars = opts
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_serialize(v)))
            .collect();

        Ok(Box::new(Template {
            partials: builder.build()?,
            extension: opts.extension.trim_start_matches('.').to_string(),
            vars,
        }))
    }
}

impl Transform for Template {
    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut env = Environment::new();
        for (path, contents) in &files {
            let source = utf8(path, contents)?;
            env.add_template(path.as_str(), source)
                .with_context(|| format!("parsing template {path}"))?;
        }

        let mut out = FileSet::new();
        for path in files.keys().filter(|p| !self.partials.is_match(p.as_str())) {
            let mut ctx = self.vars.clone();
            ctx.insert("page".to_string(), Value::from(path.as_str()));

            let rendered = env
                .get_template(path)
                .and_then(|tmpl| tmpl.render(&ctx))
                .with_context(|| format!("rendering template {path}"))?;
            out.insert(with_extension(path, &self.extension), rendered.into_bytes());
        }
        Ok(out)
    }
}
