pub mod auth;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod query;
pub mod refresh;
pub mod routes;
pub mod scheduler;
pub mod sources;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::auth::ApiKeys;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Build the full application router: authenticated API plus the public
/// documentation and health endpoints.
pub fn app(state: Arc<AppState>) -> Router {
    let api_keys = ApiKeys(Arc::new(state.config.api_keys.clone()));

    let api = routes::api_router()
        .layer(middleware::from_fn(auth::require_api_key))
        .layer(Extension(api_keys))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    // Docs stay public and outside the API-key check.
    let docs = ServeDir::new(&state.config.docs_dir).append_index_html_on_directories(true);

    Router::new()
        .merge(api)
        .route("/health", get(health))
        .nest_service("/api-docs", docs)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let currencies_loaded = state
        .store
        .rates_snapshot()
        .await
        .map(|s| s.rates.len())
        .unwrap_or(0);
    Json(json!({
        "status": "ok",
        "stock_sources": state.store.source_count().await,
        "stock_records": state.store.stock_record_count().await,
        "currencies_loaded": currencies_loaded,
    }))
}
