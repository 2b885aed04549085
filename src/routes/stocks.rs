use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::model::{RefreshOutcome, StockRecord};
use crate::query;
use crate::refresh::RefreshError;
use crate::sources;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", get(search))
        .route("/upload/stocks", post(upload_stocks))
        .route("/refresh/{source}", post(refresh_source))
}

/// GET /search — merged stock view, filtered by an optional `%`-wildcard
/// query. Zero matches is an empty array, not an error.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<StockRecord>> {
    tracing::debug!("stock search, query={:?}", params.query);
    let results = query::search_stocks(&state.store, params.query.as_deref()).await;
    Json(results)
}

/// POST /upload/stocks — parse one uploaded stock file and store it under
/// its recognized name.
async fn upload_stocks(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (file_name, content) = super::first_file(&mut multipart).await?;
    tracing::info!("processing stock file upload: {file_name}");

    match state.refresher.apply_stock_upload(&file_name, &content).await {
        Ok(RefreshOutcome::Stocks { records_loaded }) => Ok(Json(json!({
            "message": format!("{file_name} processed successfully."),
            "records_loaded": records_loaded,
        }))),
        Ok(_) => Err(ApiError::Internal("unexpected refresh outcome".to_string())),
        Err(e) => {
            tracing::error!("error processing stock upload {file_name}: {e}");
            Err(upload_error(e))
        }
    }
}

/// POST /refresh/{source} — on-demand remote refresh by alias.
async fn refresh_source(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let Some(spec) = sources::by_alias(&source) else {
        return Err(ApiError::NotFound(format!("Unknown refresh source: {source}")));
    };

    tracing::info!("on-demand refresh of {} triggered via API", spec.file_name);
    match state.refresher.refresh_remote(spec).await {
        Ok(RefreshOutcome::Stocks { records_loaded }) => Ok(Json(json!({
            "message": format!("Successfully refreshed {} stock data.", spec.alias),
            "records_loaded": records_loaded,
        }))),
        Ok(RefreshOutcome::Rates { currencies_loaded }) => Ok(Json(json!({
            "message": "Successfully refreshed currency rates data.",
            "currencies_loaded": currencies_loaded,
        }))),
        Ok(RefreshOutcome::Skipped { reason }) => Ok(Json(json!({ "message": reason }))),
        Err(e) => Err(ApiError::RefreshFailed {
            message: format!("Failed to refresh {} data.", spec.alias),
            error: e.to_string(),
        }),
    }
}

/// Upload failures: bad content is the client's problem, anything else ours.
pub(crate) fn upload_error(e: RefreshError) -> ApiError {
    match e {
        RefreshError::Parse(parse) => parse.into(),
        other => ApiError::Internal(other.to_string()),
    }
}
