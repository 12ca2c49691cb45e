//! Prediction handler.

use axum::Json;
use axum::extract::State;
use tracing::{debug, error, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, Prediction};
use crate::validation::PredictRequest;

pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<Prediction>> {
    let model = state.model();
    match model.handle(&request) {
        Ok(prediction) => {
            debug!(?prediction, "Prediction served");
            Ok(Json(prediction))
        }
        Err(err @ (ApiError::BadRequest(_) | ApiError::Validation(_))) => {
            warn!("Rejected request: {}", err);
            Err(err)
        }
        Err(err) => {
            error!("Prediction failed: {}", err);
            Err(err)
        }
    }
}
