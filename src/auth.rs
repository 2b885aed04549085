use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::error::ApiError;

/// Extension type injected into every request so the middleware can read the
/// configured allow-list.
#[derive(Clone)]
pub struct ApiKeys(pub Arc<Vec<String>>);

/// Axum middleware: require a valid `X-API-Key` header when any key is
/// configured. An empty allow-list disables the check entirely.
pub async fn require_api_key(request: Request, next: Next) -> Response {
    let keys = request
        .extensions()
        .get::<ApiKeys>()
        .cloned()
        .unwrap_or_else(|| ApiKeys(Arc::new(Vec::new())));

    if keys.0.is_empty() {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let Some(presented) = presented else {
        tracing::warn!("request rejected: API key missing");
        return ApiError::Unauthorized(
            "Unauthorized: API key is missing. Include it in the \"X-API-Key\" header."
                .to_string(),
        )
        .into_response();
    };

    if keys
        .0
        .iter()
        .any(|key| constant_time_eq(key.as_bytes(), presented.as_bytes()))
    {
        next.run(request).await
    } else {
        tracing::warn!("request rejected: invalid API key");
        ApiError::Forbidden("Forbidden: invalid API key.".to_string()).into_response()
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_handles_length_and_content() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secre"));
        assert!(!constant_time_eq(b"secret", b"secrex"));
        assert!(constant_time_eq(b"", b""));
    }
}
