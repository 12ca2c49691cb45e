//! Model info handler.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use pipeline::{BinMode, ModelMode, TrainingMetrics};
use serde::Serialize;

use crate::state::AppState;

/// What a client needs to build valid requests, plus the training metrics.
#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub mode: ModelMode,
    pub algo: String,
    /// Sorted lexicographically
    pub allowed_content_ratings: Vec<String>,
    pub genres_vocab: Vec<String>,
    pub numeric_ranges: BTreeMap<String, [i64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_score_range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_mode: Option<BinMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_edges: Option<Vec<f64>>,
    pub metrics: Option<TrainingMetrics>,
}

pub async fn meta(State(state): State<AppState>) -> Json<MetaResponse> {
    let model = state.model();
    let metadata = model.metadata();
    let observed_score_range = match metadata.mode {
        ModelMode::Regression => Some(metadata.target_range_observed.unwrap_or([0.0, 10.0])),
        ModelMode::Multiclass => None,
    };

    Json(MetaResponse {
        mode: metadata.mode,
        algo: metadata.algo.clone(),
        allowed_content_ratings: metadata.sorted_content_ratings(),
        genres_vocab: metadata.genres_vocab.clone(),
        numeric_ranges: metadata.numeric_ranges.clone(),
        observed_score_range,
        bin_mode: metadata.bin_mode,
        class_labels: metadata.class_labels.clone(),
        class_edges: metadata.class_edges.clone(),
        metrics: model.metrics().cloned(),
    })
}
