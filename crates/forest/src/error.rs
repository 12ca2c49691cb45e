//! Error types for the forest crate.

use pipeline::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForestError {
    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Training set has {rows} rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Model was fit on {expected} features, got {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("Label {label} out of range for {n_classes} classes")]
    InvalidLabel { label: usize, n_classes: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0} is not fitted")]
    NotFitted(&'static str),
}

impl From<ForestError> for PipelineError {
    fn from(err: ForestError) -> Self {
        match err {
            ForestError::FeatureMismatch { expected, found } => {
                PipelineError::WidthMismatch { expected, found }
            }
            ForestError::NotFitted(component) => PipelineError::not_fitted(component),
            ForestError::InvalidParameter(msg) => PipelineError::config(msg),
            other => PipelineError::model(other.to_string()),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ForestError>;
