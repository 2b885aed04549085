use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::model::RefreshOutcome;
use crate::query::{self, RateResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload/rates", post(upload_rates))
        .route("/search/rates/{pattern}", get(search_rates))
}

/// POST /upload/rates — replace the active rate snapshot from an uploaded
/// file, whatever the file is called.
async fn upload_rates(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (file_name, content) = super::first_file(&mut multipart).await?;
    tracing::info!("processing rates file upload: {file_name}");

    match state.refresher.apply_rates_upload(&content).await {
        Ok(RefreshOutcome::Rates { currencies_loaded }) => Ok(Json(json!({
            "message": "Rates file processed successfully.",
            "currencies_loaded": currencies_loaded,
        }))),
        Ok(_) => Err(ApiError::Internal("unexpected refresh outcome".to_string())),
        Err(e) => {
            tracing::error!("error processing rates upload {file_name}: {e}");
            Err(super::stocks::upload_error(e))
        }
    }
}

/// GET /search/rates/{pattern} — exact `EUR_XXX` lookup in the active
/// snapshot.
async fn search_rates(
    State(state): State<Arc<AppState>>,
    Path(pattern): Path<String>,
) -> Result<Json<RateResult>, ApiError> {
    tracing::debug!("rates lookup for pattern: {pattern}");
    let result = query::lookup_rate(&state.store, &pattern).await?;
    Ok(Json(result))
}
