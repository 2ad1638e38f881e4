//! Views: the rendering contract and view file resolution.
//!
//! Template syntax is up to the [`Renderer`]. The framework only decides which
//! files are involved:
//!
//! - view: `<view directory>/<name><suffix>`, where `name` defaults to the
//!   pretty form of the action (`CommentAdd` → `comment-add.html`);
//! - layout: `<parent of view directory>/<layout_dir>/<layout>`.
//!
//! [`FileRenderer`] is the fallback when the application supplies no renderer.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::BoxFuture;
use crate::router::pretty_path;

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("view {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {path}: {message}")]
    Template { path: PathBuf, message: String },
}

impl RenderError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Turns a view file and its data into a response body.
pub trait Renderer: Send + Sync {
    fn render<'a>(&'a self, view: &'a Path, data: &'a Value) -> BoxFuture<'a, Result<String, RenderError>>;

    /// Render `view`, then wrap the result in `layout`.
    fn render_in_layout<'a>(
        &'a self,
        view: &'a Path,
        layout: &'a Path,
        data: &'a Value,
    ) -> BoxFuture<'a, Result<String, RenderError>>;
}

/// Serves view files as they are on disk.
///
/// Data is ignored. In a layout, the first occurrence of [`CONTENT_MARKER`] is
/// replaced with the view's content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRenderer;

/// Placeholder a [`FileRenderer`] layout uses for the view.
pub const CONTENT_MARKER: &str = "{{content}}";

async fn read_view(path: &Path) -> Result<String, RenderError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RenderError::from_io(path, e))
}

impl Renderer for FileRenderer {
    fn render<'a>(&'a self, view: &'a Path, _data: &'a Value) -> BoxFuture<'a, Result<String, RenderError>> {
        Box::pin(read_view(view))
    }

    fn render_in_layout<'a>(
        &'a self,
        view: &'a Path,
        layout: &'a Path,
        _data: &'a Value,
    ) -> BoxFuture<'a, Result<String, RenderError>> {
        Box::pin(async move {
            let content = read_view(view).await?;
            let frame = read_view(layout).await?;
            Ok(frame.replacen(CONTENT_MARKER, &content, 1))
        })
    }
}

/// `<view_directory>/<name or pretty(action)><suffix>`.
pub fn view_file(view_directory: &Path, name: Option<&str>, action: &str, suffix: &str) -> PathBuf {
    let stem = match name {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => pretty_path(action),
    };
    view_directory.join(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_file_defaults_to_pretty_action() {
        let dir = Path::new("/app/views/post");
        assert_eq!(
            view_file(dir, None, "CommentAdd", ".html"),
            PathBuf::from("/app/views/post/comment-add.html")
        );
        assert_eq!(
            view_file(dir, Some("list"), "Index", ".tpl"),
            PathBuf::from("/app/views/post/list.tpl")
        );
    }

    #[tokio::test]
    async fn file_renderer_wraps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("index.html");
        let layout = dir.path().join("layout.html");
        std::fs::write(&view, "<p>hi</p>").unwrap();
        std::fs::write(&layout, "<body>{{content}}</body>").unwrap();

        let out = FileRenderer
            .render_in_layout(&view, &layout, &Value::Null)
            .await
            .unwrap();
        assert_eq!(out, "<body><p>hi</p></body>");
    }

    #[tokio::test]
    async fn missing_view_is_not_found() {
        let err = FileRenderer
            .render(Path::new("/definitely/not/here.html"), &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NotFound { .. }));
    }
}
