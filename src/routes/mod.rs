pub mod rates;
pub mod stocks;

use axum::extract::multipart::Multipart;
use axum::Router;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Assemble the authenticated API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new().merge(stocks::routes()).merge(rates::routes())
}

/// Pull the first uploaded file (name + text content) out of a multipart
/// body.
pub(crate) async fn first_file(multipart: &mut Multipart) -> Result<(String, String), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read uploaded file: {e}")))?;
        return Ok((file_name, content));
    }
    Err(ApiError::BadRequest("No file uploaded.".to_string()))
}
