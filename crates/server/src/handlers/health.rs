//! Health check handler.

use axum::Json;
use axum::extract::State;
use pipeline::ModelMode;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: ModelMode,
}

/// Liveness probe; also reports which kind of model is served.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.model().mode(),
    })
}
