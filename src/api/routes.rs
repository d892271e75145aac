use axum::{routing::get, Router};
use std::sync::Arc;

use crate::service::UrlService;

use super::handlers::{
    create_url, delete_url, get_url, health_check, hostname_stats, list_urls, update_url,
    url_stats, AppState,
};

pub fn create_api_router(service: Arc<UrlService>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/health", get(health_check))
        .route("/urls", get(list_urls).post(create_url))
        .route(
            "/urls/{id}",
            get(get_url).patch(update_url).delete(delete_url),
        )
        .route("/stats", get(hostname_stats))
        .route("/stats/{id}", get(url_stats))
        .with_state(state)
}
