//! folio-server: serves /blogs, /pastes and /static from PostgreSQL.
//!
//! Usage: `folio-server [server-config.json]`

use folio::{
    common_routes_with_ready, ensure_tables, load, resource_routes, table_registry, AppState,
    PgStorage, Storage,
};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("folio=info,folio_server=info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load(config_path.as_deref())?;
    let registry = table_registry(&config)?;

    let (storage, descriptor) = PgStorage::connect(&config.database).await?;
    tracing::info!("connected ({})", descriptor);
    ensure_tables(storage.pool(), &registry).await?;

    let storage = Arc::new(storage);
    let state = AppState::new(storage.clone(), registry);
    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(resource_routes(state));

    let listener = TcpListener::bind(config.listen_addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.close().await;
    tracing::info!("storage closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
