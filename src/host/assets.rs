//! Static files served from a directory under a route prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::AppState;
use crate::dispatch::ErrorReport;
use crate::http::{Request, Response, StatusCode};
use crate::router::{Handler, PathParams, handler};

/// Name of the wildcard capture in static routes.
pub(crate) const FILEPATH: &str = "filepath";

/// `GET <prefix>/*filepath` handler serving files below `root`.
pub(crate) fn static_handler(state: Arc<AppState>, root: PathBuf) -> Handler {
    let root = Arc::new(root);
    handler(move |request: Request, params: PathParams| {
        let state = Arc::clone(&state);
        let root = Arc::clone(&root);
        async move {
            let relative = params.get(FILEPATH).unwrap_or("");
            match serve_file(&root, relative).await {
                Some(response) => response,
                None => {
                    let report = ErrorReport::status(StatusCode::NotFound, state.config().mode);
                    state.errors().handle(&request, &report)
                }
            }
        }
    })
}

// `None` means 404: outside the root, missing, or unreadable.
async fn serve_file(root: &Path, relative: &str) -> Option<Response> {
    let mut path = resolve(root, relative)?;

    if tokio::fs::metadata(&path).await.ok()?.is_dir() {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => Some(
            Response::new(StatusCode::Ok)
                .header("Content-Type", content_type(&path))
                .body_bytes(bytes),
        ),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "static file unavailable");
            None
        }
    }
}

/// Join `relative` onto `root`, refusing anything that would climb out of it.
pub(crate) fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

/// Content type from the file extension.
pub(crate) fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
