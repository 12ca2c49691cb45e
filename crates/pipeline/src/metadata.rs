//! Persisted documents written next to a trained pipeline.
//!
//! `ModelMetadata` is what a serving process validates requests against and
//! cross-checks the pipeline with. `TrainingMetrics` is informational only.

use crate::binning::{BinMode, Binning};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ModelMode
// =============================================================================

/// What the persisted pipeline predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelMode {
    Regression,
    Multiclass,
}

impl ModelMode {
    /// Suffix used in artifact file names
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ModelMode::Regression => "reg",
            ModelMode::Multiclass => "cls",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelMode::Regression => "REGRESSION",
            ModelMode::Multiclass => "MULTICLASS",
        }
    }
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regression" | "reg" => Ok(ModelMode::Regression),
            "multiclass" | "classification" | "cls" => Ok(ModelMode::Multiclass),
            other => Err(PipelineError::config(format!("unknown model mode '{}'", other))),
        }
    }
}

// =============================================================================
// ModelMetadata
// =============================================================================

/// Metadata document persisted with every trained pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub mode: ModelMode,
    pub algo: String,
    /// Ratings seen in training, most frequent first
    pub allowed_content_ratings: Vec<String>,
    /// Genre vocabulary in output column order
    pub genres_vocab: Vec<String>,
    /// `[min, max]` of each numeric field, truncated to integers
    pub numeric_ranges: BTreeMap<String, [i64; 2]>,
    pub bin_mode: Option<BinMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_edges: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_range_observed: Option<[f64; 2]>,
    /// Assembled feature column order
    #[serde(default)]
    pub feature_columns: Vec<String>,
}

impl ModelMetadata {
    pub fn allows_content_rating(&self, rating: &str) -> bool {
        self.allowed_content_ratings.iter().any(|r| r == rating)
    }

    /// Allowed ratings in lexicographic order
    pub fn sorted_content_ratings(&self) -> Vec<String> {
        let mut ratings = self.allowed_content_ratings.clone();
        ratings.sort();
        ratings
    }

    /// Rebuild the persisted bins; `None` for regression metadata.
    pub fn binning(&self) -> Result<Option<Binning>> {
        match (&self.class_edges, &self.class_labels) {
            (Some(edges), Some(labels)) => {
                let mode = self.bin_mode.unwrap_or(BinMode::Quantile);
                Binning::from_parts(mode, edges.clone(), labels.clone()).map(Some)
            }
            (None, None) => Ok(None),
            _ => Err(PipelineError::config(
                "metadata has class edges or labels but not both",
            )),
        }
    }
}

// =============================================================================
// TrainingMetrics
// =============================================================================

/// Classification quality on both splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub train_accuracy: f64,
    pub valid_accuracy: f64,
    pub train_macro_f1: f64,
    pub valid_macro_f1: f64,
    pub class_distribution_train: BTreeMap<String, usize>,
    pub class_distribution_valid: BTreeMap<String, usize>,
}

/// Regression quality on both splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub train_rmse: f64,
    pub valid_rmse: f64,
    pub train_mae: f64,
    pub valid_mae: f64,
    pub train_r2: f64,
    pub valid_r2: f64,
}

/// Metrics document; never read by the prediction path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub algo: String,
    pub mode: ModelMode,
    pub n_train: usize,
    pub n_valid: usize,
    #[serde(flatten)]
    pub classification: Option<ClassificationReport>,
    #[serde(flatten)]
    pub regression: Option<RegressionReport>,
    pub crate_version: String,
}
