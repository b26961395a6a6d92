use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use studio::config::Config;
use studio::routes::build_router;
use studio::state::AppState;
use studio::storage::{FileStorage, MemoryStorage, StoragePort};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting form studio v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn StoragePort> = match &config.storage_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            let files = FileStorage::new(dir.clone());
            info!("Template store: {}", files.root().display());
            Arc::new(files)
        }
        None => {
            info!("Template store: in-memory (set STORAGE_DIR to persist)");
            Arc::new(MemoryStorage::new())
        }
    };

    let state = AppState::new(config.clone(), store);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor front end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
