//! Feature encoding, label binning and the fitted prediction pipeline.
//!
//! This crate provides:
//! - FeatureTransformer trait and the per-column encoders (numeric imputer,
//!   content-rating one-hot, genre multi-hot)
//! - FeatureAssembler for composing them in a fixed, named column order
//! - LabelBinner operations for turning the score into ordinal classes
//! - PredictionPipeline coupling the assembler with a learner
//! - ArtifactStore for persisting pipelines with their metadata and metrics
//! - Training orchestration producing all three documents
//!
//! ## Architecture
//! A raw record flows through the pipeline in stages:
//! 1. FeatureAssembler encodes named fields into one wide `f32` row
//! 2. The learner predicts a score or a class distribution
//! 3. Regression output is clamped and rounded; class indices map to labels
//!
//! The learner is anything implementing [`Regressor`] or [`Classifier`].
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{ArtifactStore, TrainingConfig, train_regression};
//! use forest::RegressionModel;
//!
//! let dataset = data_loader::load_movies("data/movie_metadata.csv")?;
//! let trained = train_regression(&dataset, &TrainingConfig::default(), RegressionModel::default())?;
//!
//! let store = ArtifactStore::open("artifacts");
//! store.save(&trained.pipeline, &trained.metadata, &trained.metrics)?;
//!
//! let outcome = trained.pipeline.predict_one(&dataset.records[0])?;
//! println!("{} ({})", outcome.predicted_score, outcome.confidence);
//! ```

pub mod error;
pub mod traits;
pub mod genres;
pub mod binning;
pub mod numeric;
pub mod categorical;
pub mod assembler;
pub mod model;
pub mod prediction;
pub mod metadata;
pub mod artifacts;
pub mod metrics;
pub mod split;
pub mod training;

// Re-export main types
pub use artifacts::{ArtifactPaths, ArtifactStore, LoadedClassification, LoadedRegression};
pub use assembler::FeatureAssembler;
pub use binning::{BinEdges, BinMode, Binning, ClassLabel, assign, compute_edges};
pub use categorical::CategoricalEncoder;
pub use error::{PipelineError, Result};
pub use genres::{GenreVocabulary, GenresEncoder};
pub use metadata::{ModelMetadata, ModelMode, TrainingMetrics};
pub use model::{Classifier, Regressor, SupportsMemberPredictions};
pub use numeric::NumericImputer;
pub use prediction::{ClassificationOutcome, PredictionPipeline, RegressionOutcome};
pub use split::train_valid_split;
pub use traits::FeatureTransformer;
pub use training::{TrainedModel, TrainingConfig, train_classification, train_regression};
