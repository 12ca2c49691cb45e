//! Error types for the pipeline crate.

use thiserror::Error;

/// Errors raised while fitting, applying or persisting the prediction pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A transform was invoked before `fit`
    #[error("{component} is not fitted; call fit before transform")]
    NotFitted { component: String },

    /// Bad configuration or unusable/inconsistent artifacts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Quantile binning left fewer than two distinct edges
    #[error("Target values collapse to a single bin; cannot derive classes")]
    DegenerateTarget,

    /// Fit or transform received nothing to work with
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A feature block or model saw a different number of columns than it was fit on
    #[error("Feature width mismatch: expected {expected} columns, found {found}")]
    WidthMismatch { expected: usize, found: usize },

    /// The learner failed to fit or predict
    #[error("Model error: {0}")]
    Model(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl PipelineError {
    pub fn not_fitted(component: impl Into<String>) -> Self {
        Self::NotFitted {
            component: component.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PipelineError>;
