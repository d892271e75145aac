use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::static_files::serve_static;
use crate::error::AppError;
use crate::service::UrlService;

pub struct RedirectState {
    pub service: Arc<UrlService>,
    pub static_dir: Option<String>,
}

/// Redirect to the target URL, or serve the asset of the same name
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(id): Path<String>,
) -> Response {
    match state.service.find_by_id(&id).await {
        Ok(url) if !url.target_url.is_empty() => {
            // Not awaited: the visitor is redirected whether or not the count lands
            state.service.record_access(&url.short_id);

            (
                StatusCode::MOVED_PERMANENTLY,
                [(header::LOCATION, url.target_url)],
            )
                .into_response()
        }
        Ok(_) | Err(AppError::NotFound) => {
            tracing::debug!(short_id = %id, "no redirect, falling back to static asset");
            serve_static(&id, state.static_dir.as_deref()).await
        }
        Err(err) => err.into_response(),
    }
}

/// Landing page
pub async fn index(State(state): State<Arc<RedirectState>>) -> Response {
    serve_static("index.html", state.static_dir.as_deref()).await
}
