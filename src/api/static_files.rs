use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::{Component, Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "assets"]
pub struct Assets;

/// Serve static files from the asset directory or the embedded copy
pub async fn serve_static(path: &str, static_dir: Option<&str>) -> Response {
    let path = path.trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if !is_safe_path(path) {
        return not_found();
    }

    // Try to serve from filesystem if static_dir is provided
    if let Some(dir) = static_dir {
        let file_path = PathBuf::from(dir).join(path);
        if let Ok(content) = tokio::fs::read(&file_path).await {
            let mime_type = from_path(&file_path).first_or_octet_stream();
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime_type.to_string())],
                Body::from(content),
            )
                .into_response();
        }
    }

    // Fall back to embedded assets
    serve_embedded(path)
}

/// Router fallback for any path no route claimed
pub async fn static_fallback(uri: Uri, static_dir: Option<String>) -> Response {
    serve_static(uri.path(), static_dir.as_deref()).await
}

fn serve_embedded(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.to_string())],
                Body::from(content.data),
            )
                .into_response()
        }
        None => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

/// Only plain relative paths, nothing that could climb out of the asset root
fn is_safe_path(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}
