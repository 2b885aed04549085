use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use refdata_hub::config::Config;
use refdata_hub::state::AppState;
use refdata_hub::{app, scheduler};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let host = config.host.clone();
    let port = config.port;

    let state = AppState::new(config);

    // Warm the cache from the canonical files before accepting traffic.
    tracing::info!("initializing cache from the data directory");
    state.refresher.init_from_disk().await;

    // Daily refresh jobs.
    scheduler::spawn(Arc::clone(&state));

    let app = app(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("invalid bind address");

    tracing::info!("refdata hub listening on http://{addr}");
    tracing::info!("API documentation available at http://{addr}/api-docs");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received, gracefully stopping");
}
