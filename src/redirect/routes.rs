use axum::{http::Uri, routing::get, Router};
use std::sync::Arc;

use crate::api::static_files::static_fallback;
use crate::service::UrlService;

use super::handlers::{index, redirect_url, RedirectState};

pub fn create_redirect_router(service: Arc<UrlService>, static_dir: Option<String>) -> Router {
    let fallback_dir = static_dir.clone();
    let state = Arc::new(RedirectState {
        service,
        static_dir,
    });

    Router::new()
        .route("/", get(index))
        .route("/{id}", get(redirect_url))
        .fallback(move |uri: Uri| static_fallback(uri, fallback_dir.clone()))
        .with_state(state)
}
