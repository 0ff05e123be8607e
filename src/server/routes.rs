// src/server/routes.rs

use std::convert::Infallible;
use std::path::PathBuf;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::ReloadSignal;

pub const EVENTS_PATH: &str = "/__assetdag/events";
pub const CLIENT_PATH: &str = "/__assetdag/client.js";

const CLIENT_JS: &str = include_str!("livereload.js");

/// HTML bodies larger than this are served untouched.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

pub fn router(root: PathBuf, signals: broadcast::Sender<ReloadSignal>) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(events))
        .route(CLIENT_PATH, get(client_js))
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn(inject_reload_client))
        .layer(TraceLayer::new_for_http())
        .with_state(signals)
}

async fn events(
    State(signals): State<broadcast::Sender<ReloadSignal>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(signals.subscribe()).filter_map(|signal| match signal {
        Ok(signal) => Some(Ok(Event::default()
            .event(signal.kind.event_name())
            .data(signal.task))),
        Err(e) => {
            warn!(error = %e, "live-reload client fell behind");
            None
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_js() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_JS,
    )
}

/// Add the live-reload script tag to HTML responses.
async fn inject_reload_client(req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "could not buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = inject_snippet(&html);

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_snippet(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}
