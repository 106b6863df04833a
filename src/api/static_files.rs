use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(RustEmbed)]
#[folder = "public"]
pub struct Assets;

/// Landing page, admin page and stylesheet, optionally overridden from disk
pub struct StaticAssets {
    static_dir: Option<PathBuf>,
}

impl StaticAssets {
    pub fn new(static_dir: Option<&str>) -> Self {
        Self {
            static_dir: static_dir.map(PathBuf::from),
        }
    }
}

/// Serve static files from the filesystem override or embedded assets
pub async fn serve_static(State(assets): State<Arc<StaticAssets>>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if !is_safe_path(path) {
        return not_found();
    }

    // Try to serve from filesystem if static_dir is provided
    if let Some(ref dir) = assets.static_dir {
        let file_path = dir.join(path);
        if let Ok(content) = tokio::fs::read(&file_path).await {
            return file_response(path, Body::from(content));
        }
    }

    match Assets::get(path) {
        Some(content) => file_response(path, Body::from(content.data)),
        None => not_found(),
    }
}

/// Only plain relative segments; no `..`, roots or drive prefixes
fn is_safe_path(path: &str) -> bool {
    !path.contains('\\')
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn file_response(path: &str, body: Body) -> Response {
    let mime = from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.to_string())],
        body,
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}
