// tests/dev_server.rs

mod common;
use crate::common::write_file;

use std::error::Error;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use assetdag::engine::{ReloadEvent, ReloadSink, TaskOutcome};
use assetdag::server::{CLIENT_PATH, DevServer};
use assetdag::task::TaskReport;
use assetdag::types::ReloadKind;

type TestResult = Result<(), Box<dyn Error>>;

fn report(task: &str, outputs: &[&str]) -> TaskReport {
    let outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
    TaskReport {
        task: task.to_string(),
        written: outputs.len(),
        unchanged: 0,
        reload: ReloadKind::infer(outputs.iter().map(String::as_str)),
        outputs,
        digest: String::new(),
        elapsed: Duration::ZERO,
    }
}

async fn get(server: &DevServer, uri: &str) -> Result<(StatusCode, Option<String>, String), Box<dyn Error>> {
    let response = server
        .router()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap_or_default().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, content_type, String::from_utf8(body.to_vec())?))
}

#[tokio::test]
async fn test_html_pages_get_the_reload_client() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "index.html", "<html><body><h1>Home</h1></body></html>");
    let server = DevServer::new(dir.path());

    let (status, content_type, body) = get(&server, "/").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap_or_default().starts_with("text/html"));
    assert_eq!(
        body,
        format!("<html><body><h1>Home</h1><script src=\"{CLIENT_PATH}\"></script></body></html>")
    );
    Ok(())
}

#[tokio::test]
async fn test_other_assets_are_served_untouched() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "styles/styles.css", "body { margin: 0 }");
    let server = DevServer::new(dir.path());

    let (status, content_type, body) = get(&server, "/styles/styles.css").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/css"));
    assert_eq!(body, "body { margin: 0 }");

    let (status, _, _) = get(&server, "/missing.js").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_client_script_is_served() -> TestResult {
    let dir = tempfile::tempdir()?;
    let server = DevServer::new(dir.path());

    let (status, content_type, body) = get(&server, CLIENT_PATH).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap_or_default().starts_with("application/javascript"));
    assert!(body.contains("EventSource"));
    Ok(())
}

#[tokio::test]
async fn test_notify_sends_style_or_full_reload() -> TestResult {
    let dir = tempfile::tempdir()?;
    let server = DevServer::new(dir.path());
    let mut signals = server.subscribe();

    server.notify(&ReloadEvent {
        task: "styles".to_string(),
        outcome: TaskOutcome::Succeeded(report("styles", &["styles/styles.css"])),
    });
    let signal = signals.recv().await?;
    assert_eq!(signal.kind, ReloadKind::Style);
    assert_eq!(signal.task, "styles");

    server.notify(&ReloadEvent {
        task: "templates".to_string(),
        outcome: TaskOutcome::Succeeded(report("templates", &["index.html", "styles/x.css"])),
    });
    assert_eq!(signals.recv().await?.kind, ReloadKind::Full);
    Ok(())
}

#[tokio::test]
async fn test_failed_runs_send_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let server = DevServer::new(dir.path());
    let mut signals = server.subscribe();

    server.notify(&ReloadEvent {
        task: "styles".to_string(),
        outcome: TaskOutcome::Failed("transform 'sass' failed".to_string()),
    });

    assert!(matches!(
        signals.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
    Ok(())
}

#[tokio::test]
async fn test_spawn_binds_an_ephemeral_port() -> TestResult {
    let dir = tempfile::tempdir()?;
    let server = DevServer::new(dir.path());

    let handle = server.spawn("127.0.0.1:0".parse()?).await?;
    assert_ne!(handle.local_addr().port(), 0);
    handle.shutdown();
    Ok(())
}
