//! The fitted unit served in production: feature assembler plus learner.
//!
//! Both halves are fit together on the same rows and persisted together.
//! Before any prediction the learner's fitted column count is checked
//! against the assembler's width, so a pipeline stitched from mismatched
//! halves fails loudly instead of predicting garbage.
//!
//! ## Regression confidence
//! For ensembles exposing [`SupportsMemberPredictions`], confidence is
//! `max(0, 1 - std(member predictions) / CONFIDENCE_SCALE)`. Anything else
//! gets [`NEUTRAL_CONFIDENCE`]. This is a spread heuristic, not a
//! calibrated probability.

use crate::assembler::FeatureAssembler;
use crate::binning::Binning;
use crate::error::{PipelineError, Result};
use crate::model::{Classifier, Regressor, argmax};
use crate::traits::FeatureTransformer;
use data_loader::MovieRecord;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Member spread that maps to zero confidence
pub const CONFIDENCE_SCALE: f64 = 2.5;

/// Confidence reported when member predictions are unavailable
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Lower and upper bound of a served score
pub const SCORE_RANGE: (f64, f64) = (0.0, 10.0);

/// Human-readable note attached to every regression response
pub const EXPLANATION: &str =
    "Features used: duration, budget, title_year, content_rating, genres (multi-hot).";

/// Served result of a regression prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionOutcome {
    pub predicted_score: f64,
    pub confidence: f64,
    pub explanation: String,
}

/// Served result of a classification prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub predicted_class: String,
    pub class_probabilities: BTreeMap<String, f64>,
}

/// Feature assembler and learner, fit and versioned as one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionPipeline<M> {
    assembler: FeatureAssembler,
    model: M,
}

impl<M> PredictionPipeline<M> {
    pub fn new(assembler: FeatureAssembler, model: M) -> Self {
        Self { assembler, model }
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn features(&self, rows: &[MovieRecord], n_features: Option<usize>) -> Result<Array2<f32>> {
        let expected = n_features.ok_or_else(|| PipelineError::not_fitted("model"))?;
        let x = self.assembler.transform(rows)?;
        if x.ncols() != expected {
            return Err(PipelineError::WidthMismatch {
                expected,
                found: x.ncols(),
            });
        }
        Ok(x)
    }
}

// =============================================================================
// Regression
// =============================================================================

impl<M: Regressor> PredictionPipeline<M> {
    /// Fit the assembler, then the learner on the assembled matrix.
    pub fn fit_regressor(&mut self, rows: &[MovieRecord], targets: &[f64]) -> Result<()> {
        check_lengths(rows.len(), targets.len())?;
        self.assembler.fit(rows)?;
        let x = self.assembler.transform(rows)?;
        let y = Array1::from(targets.to_vec());
        self.model.fit(x.view(), y.view())?;
        info!("Fitted regression pipeline on {} rows x {} columns", x.nrows(), x.ncols());
        Ok(())
    }

    /// Raw learner output, one value per row
    pub fn predict(&self, rows: &[MovieRecord]) -> Result<Array1<f64>> {
        let x = self.features(rows, self.model.n_features())?;
        self.model.predict(x.view())
    }

    /// Clamped score, confidence and explanation for one row.
    pub fn predict_one(&self, row: &MovieRecord) -> Result<RegressionOutcome> {
        let rows = std::slice::from_ref(row);
        let x = self.features(rows, self.model.n_features())?;
        let raw = self
            .model
            .predict(x.view())?
            .first()
            .copied()
            .ok_or_else(|| PipelineError::model("learner returned no prediction"))?;

        let confidence = match self.model.as_ensemble() {
            Some(ensemble) => {
                let members = ensemble.member_predictions(x.view())?;
                member_confidence(members.column(0).iter().copied())
            }
            None => NEUTRAL_CONFIDENCE,
        };
        debug!("Raw score {:.4}, confidence {:.4}", raw, confidence);

        Ok(RegressionOutcome {
            predicted_score: round2(raw.clamp(SCORE_RANGE.0, SCORE_RANGE.1)),
            confidence: round2(confidence),
            explanation: EXPLANATION.to_string(),
        })
    }
}

// =============================================================================
// Classification
// =============================================================================

impl<M: Classifier> PredictionPipeline<M> {
    /// Fit the assembler, then the learner on class indices.
    pub fn fit_classifier(&mut self, rows: &[MovieRecord], classes: &[usize], n_classes: usize) -> Result<()> {
        check_lengths(rows.len(), classes.len())?;
        if let Some(&bad) = classes.iter().find(|&&c| c >= n_classes) {
            return Err(PipelineError::config(format!(
                "class index {} out of range for {} classes",
                bad, n_classes
            )));
        }
        self.assembler.fit(rows)?;
        let x = self.assembler.transform(rows)?;
        self.model.fit(x.view(), classes, n_classes)?;
        info!(
            "Fitted classification pipeline on {} rows x {} columns, {} classes",
            x.nrows(),
            x.ncols(),
            n_classes
        );
        Ok(())
    }

    /// Most probable class index per row
    pub fn predict_classes(&self, rows: &[MovieRecord]) -> Result<Vec<usize>> {
        let x = self.features(rows, self.model.n_features())?;
        self.model.predict(x.view())
    }

    /// Probability over realized classes, one row per input row
    pub fn predict_proba(&self, rows: &[MovieRecord]) -> Result<Array2<f64>> {
        let x = self.features(rows, self.model.n_features())?;
        self.model.predict_proba(x.view())
    }

    /// Label and per-label probabilities for one row.
    pub fn classify(&self, row: &MovieRecord, binning: &Binning) -> Result<ClassificationOutcome> {
        let proba = self.predict_proba(std::slice::from_ref(row))?;
        let row_proba = proba.index_axis(Axis(0), 0).to_vec();
        if row_proba.len() != binning.n_classes() {
            return Err(PipelineError::config(format!(
                "model predicts {} classes but the bins define {}",
                row_proba.len(),
                binning.n_classes()
            )));
        }

        let best = argmax(&row_proba);
        let class_probabilities = binning
            .labels()
            .iter()
            .zip(&row_proba)
            .map(|(label, &p)| (label.label.clone(), p))
            .collect();

        Ok(ClassificationOutcome {
            predicted_class: binning.labels()[best].label.clone(),
            class_probabilities,
        })
    }
}

fn check_lengths(rows: usize, targets: usize) -> Result<()> {
    if rows == 0 {
        return Err(PipelineError::EmptyInput("no training rows".into()));
    }
    if rows != targets {
        return Err(PipelineError::config(format!(
            "{} rows but {} targets",
            rows, targets
        )));
    }
    Ok(())
}

/// `max(0, 1 - population_std / CONFIDENCE_SCALE)`, clamped to `[0, 1]`.
pub fn member_confidence(members: impl IntoIterator<Item = f64>) -> f64 {
    let values: Vec<f64> = members.into_iter().collect();
    if values.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / CONFIDENCE_SCALE).clamp(0.0, 1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{BinMode, DEFAULT_FIXED_EDGES, compute_edges};
    use crate::model::SupportsMemberPredictions;
    use ndarray::{ArrayView1, ArrayView2};

    /// Predicts the first column plus a fixed offset
    #[derive(Default)]
    struct FirstColumn {
        offset: f64,
        width: Option<usize>,
        members: Option<Vec<f64>>,
    }

    impl Regressor for FirstColumn {
        fn fit(&mut self, x: ArrayView2<f32>, _y: ArrayView1<f64>) -> Result<()> {
            self.width = Some(x.ncols());
            Ok(())
        }

        fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
            Ok(x.column(0).mapv(|v| v as f64 + self.offset))
        }

        fn n_features(&self) -> Option<usize> {
            self.width
        }

        fn as_ensemble(&self) -> Option<&dyn SupportsMemberPredictions> {
            self.members.as_ref().map(|_| self as &dyn SupportsMemberPredictions)
        }
    }

    impl SupportsMemberPredictions for FirstColumn {
        fn member_predictions(&self, x: ArrayView2<f32>) -> Result<Array2<f64>> {
            let members = self.members.clone().unwrap_or_default();
            Ok(Array2::from_shape_fn((members.len(), x.nrows()), |(m, _)| members[m]))
        }
    }

    /// Always predicts the same distribution
    struct Constant {
        proba: Vec<f64>,
        width: Option<usize>,
    }

    impl Classifier for Constant {
        fn fit(&mut self, x: ArrayView2<f32>, _y: &[usize], _n: usize) -> Result<()> {
            self.width = Some(x.ncols());
            Ok(())
        }

        fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f64>> {
            let p = &self.proba;
            Ok(Array2::from_shape_fn((x.nrows(), p.len()), |(_, j)| p[j]))
        }

        fn n_classes(&self) -> Option<usize> {
            Some(self.proba.len())
        }

        fn n_features(&self) -> Option<usize> {
            self.width
        }
    }

    fn movie(duration: f64) -> MovieRecord {
        MovieRecord {
            duration: Some(duration),
            budget: Some(1e6),
            title_year: Some(2001.0),
            content_rating: Some("R".into()),
            genres: Some("Drama".into()),
        }
    }

    #[test]
    fn test_member_confidence() {
        assert_eq!(member_confidence([7.0, 7.0, 7.0]), 1.0);
        // population std of [6, 8] is 1.0
        assert!((member_confidence([6.0, 8.0]) - 0.6).abs() < 1e-12);
        assert_eq!(member_confidence([0.0, 10.0]), 0.0);
        assert_eq!(member_confidence(Vec::<f64>::new()), NEUTRAL_CONFIDENCE);
    }

    #[test]
    fn test_predict_one_clamps_and_rounds() {
        let mut pipeline = PredictionPipeline::new(
            FeatureAssembler::default(),
            FirstColumn {
                offset: -100.0,
                ..Default::default()
            },
        );
        let rows = vec![movie(100.0), movie(120.0)];
        pipeline.fit_regressor(&rows, &[6.0, 7.0]).unwrap();

        let outcome = pipeline.predict_one(&movie(107.456)).unwrap();
        assert_eq!(outcome.predicted_score, 7.46);
        assert_eq!(outcome.confidence, NEUTRAL_CONFIDENCE);
        assert_eq!(outcome.explanation, EXPLANATION);

        assert_eq!(pipeline.predict_one(&movie(150.0)).unwrap().predicted_score, 10.0);
        assert_eq!(pipeline.predict_one(&movie(50.0)).unwrap().predicted_score, 0.0);
    }

    #[test]
    fn test_predict_one_uses_member_spread() {
        let mut pipeline = PredictionPipeline::new(
            FeatureAssembler::default(),
            FirstColumn {
                offset: -100.0,
                width: None,
                members: Some(vec![6.0, 8.0]),
            },
        );
        pipeline.fit_regressor(&[movie(100.0)], &[7.0]).unwrap();
        let outcome = pipeline.predict_one(&movie(107.0)).unwrap();
        assert_eq!(outcome.confidence, 0.6);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut pipeline = PredictionPipeline::new(FeatureAssembler::default(), FirstColumn::default());
        pipeline.fit_regressor(&[movie(100.0)], &[7.0]).unwrap();
        pipeline.model.width = Some(99);
        assert!(matches!(
            pipeline.predict_one(&movie(100.0)),
            Err(PipelineError::WidthMismatch { expected: 99, .. })
        ));
    }

    #[test]
    fn test_unfitted_model_is_not_fitted() {
        let pipeline = PredictionPipeline::new(FeatureAssembler::default(), FirstColumn::default());
        assert!(matches!(
            pipeline.predict(&[movie(100.0)]),
            Err(PipelineError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_fit_rejects_length_mismatch() {
        let mut pipeline = PredictionPipeline::new(FeatureAssembler::default(), FirstColumn::default());
        assert!(pipeline.fit_regressor(&[movie(100.0)], &[7.0, 8.0]).is_err());
        assert!(matches!(
            pipeline.fit_regressor(&[], &[]),
            Err(PipelineError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_classify_maps_labels() {
        let binning = compute_edges(&[], BinMode::Fixed, 5, Some(&DEFAULT_FIXED_EDGES)).unwrap();
        let mut pipeline = PredictionPipeline::new(
            FeatureAssembler::default(),
            Constant {
                proba: vec![0.1, 0.2, 0.4, 0.2, 0.1],
                width: None,
            },
        );
        pipeline.fit_classifier(&[movie(100.0), movie(90.0)], &[2, 3], 5).unwrap();

        let outcome = pipeline.classify(&movie(95.0), &binning).unwrap();
        assert_eq!(outcome.predicted_class, "[6.5, 7.5)");
        assert_eq!(outcome.class_probabilities.len(), 5);
        let total: f64 = outcome.class_probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(pipeline.predict_classes(&[movie(95.0)]).unwrap(), vec![2]);
    }

    #[test]
    fn test_classify_rejects_class_count_mismatch() {
        let binning = compute_edges(&[], BinMode::Fixed, 5, Some(&DEFAULT_FIXED_EDGES)).unwrap();
        let mut pipeline = PredictionPipeline::new(
            FeatureAssembler::default(),
            Constant {
                proba: vec![0.5, 0.5],
                width: None,
            },
        );
        pipeline.fit_classifier(&[movie(100.0)], &[1], 2).unwrap();
        assert!(matches!(
            pipeline.classify(&movie(100.0), &binning),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_fit_classifier_rejects_out_of_range_class() {
        let mut pipeline = PredictionPipeline::new(
            FeatureAssembler::default(),
            Constant {
                proba: vec![0.5, 0.5],
                width: None,
            },
        );
        assert!(pipeline.fit_classifier(&[movie(100.0)], &[2], 2).is_err());
    }
}
