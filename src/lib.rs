pub mod allocator;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod redirect;
pub mod service;
pub mod storage;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::UrlService;

/// Management API, redirects and static assets on a single router
pub fn create_app(service: Arc<UrlService>, static_dir: Option<String>) -> Router {
    api::create_api_router(Arc::clone(&service))
        .merge(redirect::create_redirect_router(service, static_dir))
        .layer(TraceLayer::new_for_http())
}
