use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shorturl::allocator::{Allocator, RandomIdGenerator};
use shorturl::config::Config;
use shorturl::service::UrlService;
use shorturl::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage = storage::connect(&config.database).await?;
    info!("Database initialized successfully");

    let max_attempts = config.allocator.max_attempts;
    if max_attempts == 0 {
        info!("Short id allocation retries without limit");
    } else {
        info!("Short id allocation gives up after {} attempts", max_attempts);
    }
    let allocator = Allocator::new(Arc::new(RandomIdGenerator::from_clock()), max_attempts);
    let service = Arc::new(UrlService::new(storage, allocator));

    match config.frontend.static_dir {
        Some(ref static_dir) => info!("Serving assets from directory: {}", static_dir),
        None => info!("Serving embedded assets"),
    }

    let app = shorturl::create_app(service, config.frontend.static_dir.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
