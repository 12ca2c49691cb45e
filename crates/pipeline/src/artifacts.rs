//! On-disk layout of a trained model.
//!
//! One directory holds up to two trained models side by side, one per mode:
//!
//! ```text
//! artifacts/
//!   model_reg.json    meta_reg.json    metrics_reg.json
//!   model_cls.json    meta_cls.json    metrics_cls.json
//! ```
//!
//! All three documents are pretty-printed JSON. Writes go to a temporary
//! sibling first and are renamed into place, so a reader never sees a
//! half-written file.

use crate::binning::Binning;
use crate::error::{PipelineError, Result};
use crate::metadata::{ModelMetadata, ModelMode, TrainingMetrics};
use crate::model::{Classifier, Regressor};
use crate::prediction::PredictionPipeline;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File locations of one mode's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub metadata: PathBuf,
    pub metrics: PathBuf,
}

/// A loaded regression pipeline with its metadata
#[derive(Debug, Clone)]
pub struct LoadedRegression<M> {
    pub pipeline: PredictionPipeline<M>,
    pub metadata: ModelMetadata,
    pub metrics: Option<TrainingMetrics>,
}

/// A loaded classification pipeline with its metadata and bins
#[derive(Debug, Clone)]
pub struct LoadedClassification<M> {
    pub pipeline: PredictionPipeline<M>,
    pub metadata: ModelMetadata,
    pub binning: Binning,
    pub metrics: Option<TrainingMetrics>,
}

/// Reads and writes model artifacts under one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn paths(&self, mode: ModelMode) -> ArtifactPaths {
        let suffix = mode.file_suffix();
        ArtifactPaths {
            model: self.dir.join(format!("model_{}.json", suffix)),
            metadata: self.dir.join(format!("meta_{}.json", suffix)),
            metrics: self.dir.join(format!("metrics_{}.json", suffix)),
        }
    }

    /// Write pipeline, metadata and metrics for `metadata.mode`.
    pub fn save<M: Serialize>(
        &self,
        pipeline: &PredictionPipeline<M>,
        metadata: &ModelMetadata,
        metrics: &TrainingMetrics,
    ) -> Result<ArtifactPaths> {
        fs::create_dir_all(&self.dir).map_err(|source| PipelineError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let paths = self.paths(metadata.mode);
        write_json(&paths.model, pipeline)?;
        write_json(&paths.metadata, metadata)?;
        write_json(&paths.metrics, metrics)?;
        info!("Saved {} artifacts to {}", metadata.mode, self.dir.display());
        Ok(paths)
    }

    /// Read the metadata document; a missing file is a configuration error.
    pub fn load_metadata(&self, mode: ModelMode) -> Result<ModelMetadata> {
        let path = self.paths(mode).metadata;
        let metadata: ModelMetadata = read_json(&path)?;
        if metadata.mode != mode {
            return Err(PipelineError::config(format!(
                "{} declares mode {} but {} was requested",
                path.display(),
                metadata.mode,
                mode
            )));
        }
        Ok(metadata)
    }

    /// Read the metrics document, if one was written.
    pub fn load_metrics(&self, mode: ModelMode) -> Result<Option<TrainingMetrics>> {
        let path = self.paths(mode).metrics;
        if !path.exists() {
            debug!("No metrics at {}", path.display());
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn load_pipeline<M: DeserializeOwned>(&self, mode: ModelMode) -> Result<PredictionPipeline<M>> {
        read_json(&self.paths(mode).model)
    }

    /// Load a regression pipeline and check it against its metadata.
    pub fn load_regression<M>(&self) -> Result<LoadedRegression<M>>
    where
        M: Regressor + DeserializeOwned,
    {
        let mode = ModelMode::Regression;
        let metadata = self.load_metadata(mode)?;
        let pipeline: PredictionPipeline<M> = self.load_pipeline(mode)?;
        check_pipeline(&pipeline, &metadata, pipeline.model().n_features())?;
        let metrics = self.load_metrics(mode)?;
        info!("Loaded regression model ({}) from {}", metadata.algo, self.dir.display());
        Ok(LoadedRegression {
            pipeline,
            metadata,
            metrics,
        })
    }

    /// Load a classification pipeline and check it against its metadata.
    pub fn load_classification<M>(&self) -> Result<LoadedClassification<M>>
    where
        M: Classifier + DeserializeOwned,
    {
        let mode = ModelMode::Multiclass;
        let metadata = self.load_metadata(mode)?;
        let pipeline: PredictionPipeline<M> = self.load_pipeline(mode)?;
        check_pipeline(&pipeline, &metadata, pipeline.model().n_features())?;

        let binning = metadata
            .binning()?
            .ok_or_else(|| PipelineError::config("classification metadata has no class edges"))?;
        let n_classes = pipeline.model().n_classes().unwrap_or(0);
        if n_classes != binning.n_classes() {
            return Err(PipelineError::config(format!(
                "model has {} classes but metadata defines {}",
                n_classes,
                binning.n_classes()
            )));
        }

        let metrics = self.load_metrics(mode)?;
        info!(
            "Loaded classification model ({}, {} classes) from {}",
            metadata.algo,
            n_classes,
            self.dir.display()
        );
        Ok(LoadedClassification {
            pipeline,
            metadata,
            binning,
            metrics,
        })
    }
}

/// Vocabulary, feature columns and model width must all agree.
fn check_pipeline<M>(
    pipeline: &PredictionPipeline<M>,
    metadata: &ModelMetadata,
    model_width: Option<usize>,
) -> Result<()> {
    let assembler = pipeline.assembler();
    assembler.check_consistency()?;

    if assembler.genres_vocabulary()?.tokens() != metadata.genres_vocab.as_slice() {
        return Err(PipelineError::config(
            "pipeline genre vocabulary does not match metadata",
        ));
    }
    let columns = assembler.column_names()?;
    if !metadata.feature_columns.is_empty() && columns != metadata.feature_columns.as_slice() {
        return Err(PipelineError::config(
            "pipeline feature columns do not match metadata",
        ));
    }
    let width = model_width.ok_or_else(|| PipelineError::not_fitted("model"))?;
    if width != columns.len() {
        return Err(PipelineError::WidthMismatch {
            expected: columns.len(),
            found: width,
        });
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| PipelineError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            PipelineError::config(format!("artifact not found: {}", path.display()))
        } else {
            PipelineError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })?;
    serde_json::from_str(&text).map_err(|source| PipelineError::Json {
        path: path.display().to_string(),
        source,
    })
}
