// tests/task_pipeline.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, read_file, write_file};

use std::error::Error;
use std::sync::Arc;

use anyhow::anyhow;
use assetdag::config::{ConfigFile, TransformSpec};
use assetdag::errors::AssetdagError;
use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::{FileSystem, RealFileSystem};
use assetdag::task::Task;
use assetdag::transform::{FileSet, Transform, TransformRegistry};
use assetdag::types::{BuildMode, ReloadKind, TransformWhen};

type TestResult = Result<(), Box<dyn Error>>;

#[derive(Debug)]
struct Explode;

impl Transform for Explode {
    fn apply(&self, _files: FileSet) -> anyhow::Result<FileSet> {
        Err(anyhow!("syntax error on line 3"))
    }
}

#[derive(Debug)]
struct Escape;

impl Transform for Escape {
    fn apply(&self, files: FileSet) -> anyhow::Result<FileSet> {
        Ok(files
            .into_values()
            .map(|contents| ("../escaped.css".to_string(), contents))
            .collect())
    }
}

fn registry() -> TransformRegistry {
    let mut registry = TransformRegistry::with_builtins();
    registry.register("explode", |_| Ok(Box::new(Explode)));
    registry.register("escape", |_| Ok(Box::new(Escape)));
    registry
}

fn task(cfg: &ConfigFile, name: &str) -> Task {
    Task::from_config(name, &cfg.tasks()[name], cfg, &registry()).unwrap()
}

fn styles_fs() -> Arc<MockFileSystem> {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("src/styles/base.css", "/* base */\nbody { margin: 0 }\n");
    fs.add_file("src/styles/theme/dark.css", "body { color: #eee }\n");
    fs.add_file("src/styles/notes.txt", "not css");
    fs
}

#[tokio::test]
async fn test_outputs_are_relative_to_the_glob_base() -> TestResult {
    init_tracing();
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/**/*.css").out_dir("styles").build(),
        )
        .build();

    let report = task(&cfg, "styles").run(fs.clone()).await?;

    assert_eq!(report.written, 2);
    assert_eq!(
        report.outputs,
        vec!["styles/base.css".to_string(), "styles/theme/dark.css".to_string()]
    );
    assert_eq!(report.reload, ReloadKind::Style);
    assert_eq!(
        fs.contents("dist/styles/theme/dark.css").unwrap(),
        b"body { color: #eee }\n"
    );
    assert!(fs.contents("dist/styles/notes.txt").is_none());
    Ok(())
}

#[tokio::test]
async fn test_second_run_rewrites_nothing() -> TestResult {
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/**/*.css")
                .out_dir("styles")
                .transform("strip_comments")
                .build(),
        )
        .build();
    let task = task(&cfg, "styles");

    let first = task.run(fs.clone()).await?;
    let writes_after_first = fs.write_count();
    let first_bytes = fs.contents("dist/styles/base.css").unwrap();

    let second = task.run(fs.clone()).await?;

    assert_eq!(first.digest, second.digest);
    assert_eq!(second.written, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(fs.write_count(), writes_after_first);
    assert_eq!(fs.contents("dist/styles/base.css").unwrap(), first_bytes);
    assert_eq!(first_bytes, b"\nbody { margin: 0 }\n");
    Ok(())
}

#[tokio::test]
async fn test_failing_transform_leaves_previous_output() -> TestResult {
    let fs = styles_fs();
    let good = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/base.css").out_dir("styles").build(),
        )
        .build();
    task(&good, "styles").run(fs.clone()).await?;
    let before = fs.contents("dist/styles/base.css").unwrap();

    fs.add_file("src/styles/base.css", "body { margin: 1px }\n");
    let broken = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/base.css")
                .out_dir("styles")
                .transform_with("banner", &[("text", "/* v2 */\n")])
                .transform("explode")
                .build(),
        )
        .build();

    match task(&broken, "styles").run(fs.clone()).await {
        Err(AssetdagError::Transform { task, transform, source }) => {
            assert_eq!(task, "styles");
            assert_eq!(transform, "explode");
            assert!(source.to_string().contains("syntax error"));
        }
        other => panic!("expected Transform error, got {:?}", other),
    }
    assert_eq!(fs.contents("dist/styles/base.css").unwrap(), before);
    Ok(())
}

#[tokio::test]
async fn test_escaping_output_paths_fail_before_writing() -> TestResult {
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/*.css")
                .out_dir("styles")
                .transform("escape")
                .build(),
        )
        .build();

    let err = task(&cfg, "styles").run(fs.clone()).await.unwrap_err();
    assert!(matches!(err, AssetdagError::Task { .. }));
    assert!(err.to_string().contains("escapes the output directory"));
    assert_eq!(fs.write_count(), 0);
    assert!(fs.contents("dist/escaped.css").is_none());
    Ok(())
}

#[tokio::test]
async fn test_colliding_inputs_fail_the_task() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("bower/respond/respond.min.js", "respond");
    fs.add_file("vendor/respond.min.js", "other respond");
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "vendor",
            TaskConfigBuilder::new("bower/respond/*.js").src("vendor/*.js").build(),
        )
        .build();

    let err = task(&cfg, "vendor").run(fs.clone()).await.unwrap_err();
    assert!(err.to_string().contains("both map to 'respond.min.js'"), "{err}");
    assert_eq!(fs.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_base_and_rename_map() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("bower/jquery-legacy/dist/jquery.min.js", "legacy");
    fs.add_file("bower/jquery-modern/dist/jquery.min.js", "modern");

    let mut rename = TransformSpec::named("rename");
    let mut map = toml::Table::new();
    map.insert(
        "jquery-legacy/dist/jquery.min.js".into(),
        "jquery-legacy.min.js".into(),
    );
    map.insert(
        "jquery-modern/dist/jquery.min.js".into(),
        "jquery-modern.min.js".into(),
    );
    rename.options.insert("map".into(), toml::Value::Table(map));

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "vendor",
            TaskConfigBuilder::new("bower/jquery-legacy/dist/jquery.min.js")
                .src("bower/jquery-modern/dist/jquery.min.js")
                .base("bower")
                .out_dir("scripts")
                .transform_spec(rename)
                .build(),
        )
        .build();

    let report = task(&cfg, "vendor").run(fs.clone()).await?;
    assert_eq!(
        report.outputs,
        vec![
            "scripts/jquery-legacy.min.js".to_string(),
            "scripts/jquery-modern.min.js".to_string()
        ]
    );
    assert_eq!(report.reload, ReloadKind::Full);
    assert_eq!(fs.contents("dist/scripts/jquery-modern.min.js").unwrap(), b"modern");
    Ok(())
}

#[tokio::test]
async fn test_release_only_transforms_follow_build_mode() -> TestResult {
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/base.css")
                .out_dir("styles")
                .transform("strip_comments")
                .when(TransformWhen::Release)
                .build(),
        )
        .build();

    let dev = task(&cfg, "styles");
    assert_eq!(dev.transform_names().count(), 0);
    dev.run(fs.clone()).await?;
    assert!(fs.contents("dist/styles/base.css").unwrap().starts_with(b"/* base */"));

    let release_cfg = cfg.clone().with_mode(BuildMode::Release);
    let release = task(&release_cfg, "styles");
    assert_eq!(release.transform_names().collect::<Vec<_>>(), vec!["strip_comments"]);
    release.run(fs.clone()).await?;
    assert_eq!(fs.contents("dist/styles/base.css").unwrap(), b"\nbody { margin: 0 }\n");
    Ok(())
}

#[tokio::test]
async fn test_reload_override_and_excludes() -> TestResult {
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/**/*")
                .exclude("**/*.txt")
                .reload(ReloadKind::Full)
                .build(),
        )
        .build();

    let report = task(&cfg, "styles").run(fs.clone()).await?;
    assert_eq!(report.outputs, vec!["base.css".to_string(), "theme/dark.css".to_string()]);
    assert_eq!(report.reload, ReloadKind::Full);
    Ok(())
}

#[tokio::test]
async fn test_real_filesystem_build_is_byte_identical() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_file(root, "src/scripts/a.js", "// a\nvar a = 1;\n");
    write_file(root, "src/scripts/lib/b.js", "var b = 2;\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            "scripts",
            TaskConfigBuilder::new("src/scripts/**/*.js")
                .out_dir("scripts")
                .transform_with("concat", &[("output", "scripts.js")])
                .build(),
        )
        .build_at(root);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let task = task(&cfg, "scripts");

    let first = task.run(Arc::clone(&fs)).await?;
    let bytes = read_file(root, "dist/scripts/scripts.js");
    let second = task.run(Arc::clone(&fs)).await?;

    assert_eq!(bytes, "// a\nvar a = 1;\n\nvar b = 2;\n");
    assert_eq!(read_file(root, "dist/scripts/scripts.js"), bytes);
    assert_eq!(first.digest, second.digest);
    assert_eq!((first.written, second.written, second.unchanged), (1, 0, 1));
    Ok(())
}

#[tokio::test]
async fn test_single_star_does_not_reach_into_subdirectories() -> TestResult {
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task("styles", TaskConfigBuilder::new("src/styles/*.css").build())
        .build();

    let report = task(&cfg, "styles").run(fs.clone()).await?;
    assert_eq!(report.outputs, vec!["base.css".to_string()]);
    assert!(fs.contents("dist/theme/dark.css").is_none());
    Ok(())
}

#[tokio::test]
async fn test_write_error_keeps_previous_output() -> TestResult {
    let fs = styles_fs();
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            TaskConfigBuilder::new("src/styles/**/*.css").out_dir("styles").build(),
        )
        .build();
    let styles = task(&cfg, "styles");
    styles.run(fs.clone()).await?;

    fs.add_file("src/styles/base.css", "body { margin: 1px }\n");
    fs.add_file("src/styles/theme/dark.css", "body { color: #000 }\n");
    fs.fail_writes_to("dist/styles/theme/dark.css");

    let err = styles.run(fs.clone()).await.unwrap_err();
    assert!(matches!(err, AssetdagError::Task { .. }));
    assert_eq!(
        fs.contents("dist/styles/base.css").unwrap(),
        b"/* base */\nbody { margin: 0 }\n"
    );
    assert_eq!(
        fs.contents("dist/styles/theme/dark.css").unwrap(),
        b"body { color: #eee }\n"
    );
    Ok(())
}
