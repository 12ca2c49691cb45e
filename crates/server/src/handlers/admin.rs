//! Admin handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use pipeline::ModelMode;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub mode: ModelMode,
    pub algo: String,
    pub genres_vocab_size: usize,
}

/// Check `Authorization: Bearer <token>` against the configured admin token.
pub fn authorize_admin(headers: &HeaderMap, expected: Option<&str>) -> ApiResult<()> {
    let Some(expected) = expected else {
        return Err(ApiError::forbidden("admin routes are disabled"));
    };
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    if token != expected {
        warn!("Rejected admin request with a wrong token");
        return Err(ApiError::forbidden("admin access required"));
    }
    Ok(())
}

/// Re-read the artifacts from disk and swap the served model.
///
/// Requires the admin bearer token. Loading runs on the blocking pool. If it
/// fails the previous model keeps serving and the error is returned as 503.
pub async fn reload(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<ReloadResponse>> {
    authorize_admin(&headers, state.config.admin_token.as_deref())?;

    let worker = state.clone();
    let model = tokio::task::spawn_blocking(move || worker.reload())
        .await
        .map_err(|e| ApiError::internal(format!("reload task failed: {}", e)))?
        .map_err(|e| {
            error!("Reload failed, keeping current model: {}", e);
            ApiError::ServiceUnavailable(e.to_string())
        })?;

    Ok(Json(ReloadResponse {
        status: "reloaded",
        mode: model.mode(),
        algo: model.metadata().algo.clone(),
        genres_vocab_size: model.metadata().genres_vocab.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_authorize_admin() {
        assert!(authorize_admin(&bearer("s3cret"), Some("s3cret")).is_ok());
        assert!(matches!(
            authorize_admin(&HeaderMap::new(), Some("s3cret")),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize_admin(&bearer("guess"), Some("s3cret")),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_admin(&bearer("s3cret"), None),
            Err(ApiError::Forbidden(_))
        ));
    }
}
