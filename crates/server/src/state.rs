//! Application state.
//!
//! The served model sits behind `RwLock<Arc<LoadedModel>>`. Requests clone
//! the inner `Arc` and drop the lock at once, so a reload swaps in a fully
//! loaded model while in-flight requests finish on the one they started with.

use std::sync::{Arc, PoisonError, RwLock};

use data_loader::MovieRecord;
use forest::{ClassificationModel, RegressionModel};
use pipeline::{
    ArtifactStore, ClassificationOutcome, LoadedClassification, LoadedRegression, ModelMetadata, ModelMode,
    RegressionOutcome, TrainingMetrics,
};
use serde::Serialize;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::validation::PredictRequest;

/// Response body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Regression(RegressionOutcome),
    Classification(ClassificationOutcome),
}

/// A pipeline loaded from disk together with its metadata
#[derive(Debug, Clone)]
pub enum LoadedModel {
    Regression(LoadedRegression<RegressionModel>),
    Classification(LoadedClassification<ClassificationModel>),
}

impl LoadedModel {
    /// Load and cross-check the artifacts for `mode`.
    pub fn load(store: &ArtifactStore, mode: ModelMode) -> pipeline::Result<Self> {
        match mode {
            ModelMode::Regression => store.load_regression().map(LoadedModel::Regression),
            ModelMode::Multiclass => store.load_classification().map(LoadedModel::Classification),
        }
    }

    pub fn mode(&self) -> ModelMode {
        self.metadata().mode
    }

    pub fn metadata(&self) -> &ModelMetadata {
        match self {
            LoadedModel::Regression(m) => &m.metadata,
            LoadedModel::Classification(m) => &m.metadata,
        }
    }

    pub fn metrics(&self) -> Option<&TrainingMetrics> {
        match self {
            LoadedModel::Regression(m) => m.metrics.as_ref(),
            LoadedModel::Classification(m) => m.metrics.as_ref(),
        }
    }

    /// Predict one already-validated row.
    pub fn predict(&self, record: &MovieRecord) -> pipeline::Result<Prediction> {
        match self {
            LoadedModel::Regression(m) => m.pipeline.predict_one(record).map(Prediction::Regression),
            LoadedModel::Classification(m) => m
                .pipeline
                .classify(record, &m.binning)
                .map(Prediction::Classification),
        }
    }

    /// Validate a request against this model's metadata, then predict.
    pub fn handle(&self, request: &PredictRequest) -> ApiResult<Prediction> {
        let record = request.validate(self.metadata())?;
        Ok(self.predict(&record)?)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    store: Arc<ArtifactStore>,
    model: Arc<RwLock<Arc<LoadedModel>>>,
}

impl AppState {
    /// Load the configured artifacts; fails if they are missing or inconsistent.
    pub fn load(config: ServerConfig) -> pipeline::Result<Self> {
        let store = ArtifactStore::open(&config.artifacts_dir);
        let model = LoadedModel::load(&store, config.mode)?;
        Ok(Self::with_model(config, store, model))
    }

    pub fn with_model(config: ServerConfig, store: ArtifactStore, model: LoadedModel) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            model: Arc::new(RwLock::new(Arc::new(model))),
        }
    }

    /// Model currently being served
    pub fn model(&self) -> Arc<LoadedModel> {
        let guard = self.model.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Re-read the artifacts and swap them in. On error the current model stays.
    pub fn reload(&self) -> pipeline::Result<Arc<LoadedModel>> {
        let fresh = Arc::new(LoadedModel::load(&self.store, self.config.mode)?);
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        info!(
            "Reloaded {} model ({}) from {}",
            fresh.mode(),
            fresh.metadata().algo,
            self.store.dir().display()
        );
        Ok(fresh)
    }
}
