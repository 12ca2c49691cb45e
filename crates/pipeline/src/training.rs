//! Offline training orchestration.
//!
//! A training run takes a cleaned [`Dataset`], a [`TrainingConfig`] and an
//! unfitted learner, and returns the fitted pipeline together with the
//! metadata and metrics documents ready for the [`ArtifactStore`].
//!
//! The genre vocabulary, allowed content ratings, numeric ranges and (for
//! classification) bin edges are derived from the full dataset. Only the
//! pipeline itself is fit on the training split.
//!
//! [`ArtifactStore`]: crate::artifacts::ArtifactStore

use crate::assembler::FeatureAssembler;
use crate::binning::{BinMode, Binning, DEFAULT_FIXED_EDGES, DEFAULT_N_CLASSES, compute_edges};
use crate::error::{PipelineError, Result};
use crate::genres::{DEFAULT_TOP_GENRES, GenreVocabulary};
use crate::metadata::{ClassificationReport, ModelMetadata, ModelMode, RegressionReport, TrainingMetrics};
use crate::metrics;
use crate::model::{Classifier, Regressor};
use crate::prediction::PredictionPipeline;
use crate::split::{Split, take, train_valid_split};
use data_loader::{Dataset, MovieRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Knobs of a training run that do not belong to the learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub mode: ModelMode,
    /// Learner name recorded in metadata, e.g. "random_forest"
    pub algo: String,
    pub bin_mode: BinMode,
    pub n_classes: usize,
    pub fixed_edges: Vec<f64>,
    pub top_genres: usize,
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            mode: ModelMode::Regression,
            algo: "random_forest".to_string(),
            bin_mode: BinMode::Quantile,
            n_classes: DEFAULT_N_CLASSES,
            fixed_edges: DEFAULT_FIXED_EDGES.to_vec(),
            top_genres: DEFAULT_TOP_GENRES,
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Output of a training run
#[derive(Debug, Clone)]
pub struct TrainedModel<M> {
    pub pipeline: PredictionPipeline<M>,
    pub metadata: ModelMetadata,
    pub metrics: TrainingMetrics,
    /// Bins used for the labels; `None` for regression
    pub binning: Option<Binning>,
}

/// Fit a regression pipeline and evaluate it on a held-out split.
pub fn train_regression<M: Regressor>(
    dataset: &Dataset,
    config: &TrainingConfig,
    model: M,
) -> Result<TrainedModel<M>> {
    check_dataset(dataset)?;
    let vocabulary = fit_vocabulary(dataset, config);
    let split = train_valid_split(dataset.len(), config.test_size, config.random_state, None)?;
    let (train_rows, valid_rows) = split_rows(&dataset.records, &split);
    let y_train = take(&dataset.targets, &split.train);
    let y_valid = take(&dataset.targets, &split.valid);

    let assembler = FeatureAssembler::with_genre_vocabulary(vocabulary.tokens().to_vec(), config.top_genres);
    let mut pipeline = PredictionPipeline::new(assembler, model);
    pipeline.fit_regressor(&train_rows, &y_train)?;

    let p_train = pipeline.predict(&train_rows)?.to_vec();
    let p_valid = pipeline.predict(&valid_rows)?.to_vec();
    let report = RegressionReport {
        train_rmse: metrics::rmse(&y_train, &p_train),
        valid_rmse: metrics::rmse(&y_valid, &p_valid),
        train_mae: metrics::mae(&y_train, &p_train),
        valid_mae: metrics::mae(&y_valid, &p_valid),
        train_r2: metrics::r2(&y_train, &p_train),
        valid_r2: metrics::r2(&y_valid, &p_valid),
    };
    info!(
        "[{}] Train RMSE: {:.3} | Valid RMSE: {:.3} | Valid R2: {:.3}",
        config.algo, report.train_rmse, report.valid_rmse, report.valid_r2
    );

    let mut metadata = base_metadata(dataset, &pipeline, ModelMode::Regression, &config.algo)?;
    metadata.target_range_observed = dataset.target_range().map(|(lo, hi)| [lo, hi]);

    let metrics = TrainingMetrics {
        algo: config.algo.clone(),
        mode: ModelMode::Regression,
        n_train: split.train.len(),
        n_valid: split.valid.len(),
        classification: None,
        regression: Some(report),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Ok(TrainedModel {
        pipeline,
        metadata,
        metrics,
        binning: None,
    })
}

/// Bin the target, fit a classification pipeline on a stratified split and
/// evaluate it.
pub fn train_classification<M: Classifier>(
    dataset: &Dataset,
    config: &TrainingConfig,
    model: M,
) -> Result<TrainedModel<M>> {
    check_dataset(dataset)?;
    let vocabulary = fit_vocabulary(dataset, config);

    let binning = compute_edges(
        &dataset.targets,
        config.bin_mode,
        config.n_classes,
        Some(&config.fixed_edges),
    )?;
    let n_classes = binning.n_classes();
    info!(
        "Classes: {} ({} mode), edges {:?}",
        n_classes,
        binning.mode(),
        binning.edges().as_slice()
    );
    if n_classes < config.n_classes {
        info!(
            "Quantile edges collapsed: {} classes requested, {} realized",
            config.n_classes, n_classes
        );
    }

    let classes = binning.assign_all(&dataset.targets);
    let split = train_valid_split(dataset.len(), config.test_size, config.random_state, Some(&classes))?;
    let (train_rows, valid_rows) = split_rows(&dataset.records, &split);
    let y_train = take(&classes, &split.train);
    let y_valid = take(&classes, &split.valid);

    let assembler = FeatureAssembler::with_genre_vocabulary(vocabulary.tokens().to_vec(), config.top_genres);
    let mut pipeline = PredictionPipeline::new(assembler, model);
    pipeline.fit_classifier(&train_rows, &y_train, n_classes)?;

    let p_train = pipeline.predict_classes(&train_rows)?;
    let p_valid = pipeline.predict_classes(&valid_rows)?;
    let labels = binning.label_strings();
    let report = ClassificationReport {
        train_accuracy: metrics::accuracy(&y_train, &p_train),
        valid_accuracy: metrics::accuracy(&y_valid, &p_valid),
        train_macro_f1: metrics::macro_f1(&y_train, &p_train),
        valid_macro_f1: metrics::macro_f1(&y_valid, &p_valid),
        class_distribution_train: metrics::class_distribution(&y_train, &labels),
        class_distribution_valid: metrics::class_distribution(&y_valid, &labels),
    };
    info!(
        "[{}] Train Acc: {:.3} | Train Macro-F1: {:.3}",
        config.algo, report.train_accuracy, report.train_macro_f1
    );
    info!(
        "[{}] Valid Acc: {:.3} | Valid Macro-F1: {:.3}",
        config.algo, report.valid_accuracy, report.valid_macro_f1
    );

    let mut metadata = base_metadata(dataset, &pipeline, ModelMode::Multiclass, &config.algo)?;
    metadata.bin_mode = Some(binning.mode());
    metadata.class_edges = Some(binning.edges().as_slice().to_vec());
    metadata.class_labels = Some(labels);

    let metrics = TrainingMetrics {
        algo: config.algo.clone(),
        mode: ModelMode::Multiclass,
        n_train: split.train.len(),
        n_valid: split.valid.len(),
        classification: Some(report),
        regression: None,
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Ok(TrainedModel {
        pipeline,
        metadata,
        metrics,
        binning: Some(binning),
    })
}

fn check_dataset(dataset: &Dataset) -> Result<()> {
    if dataset.is_empty() {
        return Err(PipelineError::EmptyInput("dataset has no rows".into()));
    }
    if dataset.records.len() != dataset.targets.len() {
        return Err(PipelineError::config(format!(
            "{} records but {} targets",
            dataset.records.len(),
            dataset.targets.len()
        )));
    }
    info!("Rows: {}", dataset.len());
    Ok(())
}

fn fit_vocabulary(dataset: &Dataset, config: &TrainingConfig) -> GenreVocabulary {
    let vocabulary =
        GenreVocabulary::from_frequencies(dataset.records.iter().map(|r| r.genres()), config.top_genres);
    info!("Genres vocab size: {}", vocabulary.len());
    vocabulary
}

fn split_rows(records: &[MovieRecord], split: &Split) -> (Vec<MovieRecord>, Vec<MovieRecord>) {
    (take(records, &split.train), take(records, &split.valid))
}

/// Metadata fields shared by both modes.
fn base_metadata<M>(
    dataset: &Dataset,
    pipeline: &PredictionPipeline<M>,
    mode: ModelMode,
    algo: &str,
) -> Result<ModelMetadata> {
    let assembler = pipeline.assembler();
    Ok(ModelMetadata {
        mode,
        algo: algo.to_string(),
        allowed_content_ratings: dataset
            .content_rating_counts()
            .into_iter()
            .map(|(rating, _)| rating)
            .collect(),
        genres_vocab: assembler.genres_vocabulary()?.tokens().to_vec(),
        numeric_ranges: dataset.numeric_ranges(),
        bin_mode: None,
        class_edges: None,
        class_labels: None,
        target_range_observed: None,
        feature_columns: assembler.column_names()?.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.n_classes, 5);
        assert_eq!(config.fixed_edges, vec![0.0, 5.0, 6.5, 7.5, 8.5, 10.0]);
        assert_eq!(config.top_genres, 30);
        assert_eq!(config.random_state, 42);
    }

    #[test]
    fn test_config_deserializes_partial() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"mode": "MULTICLASS", "bin_mode": "fixed"}"#).unwrap();
        assert_eq!(config.mode, ModelMode::Multiclass);
        assert_eq!(config.bin_mode, BinMode::Fixed);
        assert_eq!(config.test_size, 0.2);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        #[derive(Debug)]
        struct Never;
        impl Regressor for Never {
            fn fit(&mut self, _: ndarray::ArrayView2<f32>, _: ndarray::ArrayView1<f64>) -> Result<()> {
                unreachable!()
            }
            fn predict(&self, _: ndarray::ArrayView2<f32>) -> Result<ndarray::Array1<f64>> {
                unreachable!()
            }
            fn n_features(&self) -> Option<usize> {
                None
            }
        }
        let err = train_regression(&Dataset::new(), &TrainingConfig::default(), Never).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput(_)));
    }
}
