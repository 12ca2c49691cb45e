//! Learner seams used by the prediction pipeline.
//!
//! The pipeline never names a concrete algorithm. Any regressor or
//! classifier that fits on an `f32` feature matrix can plug in, and
//! regressors built from several members can expose their per-member
//! predictions for confidence scoring.

use crate::error::Result;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// A learner predicting a continuous value per row.
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f64>) -> Result<()>;

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f64>>;

    /// Column count seen at fit; `None` before fit
    fn n_features(&self) -> Option<usize>;

    /// Member access for ensembles; plain learners return `None`.
    fn as_ensemble(&self) -> Option<&dyn SupportsMemberPredictions> {
        None
    }
}

/// Ensembles that can report every member's prediction.
pub trait SupportsMemberPredictions {
    /// Shape `(members, rows)`
    fn member_predictions(&self, x: ArrayView2<f32>) -> Result<Array2<f64>>;
}

/// A learner predicting one of `n_classes` ordinal classes per row.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: ArrayView2<f32>, y: &[usize], n_classes: usize) -> Result<()>;

    /// Shape `(rows, n_classes)`; each row sums to one
    fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f64>>;

    /// Most probable class per row, lowest index on ties.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(&row.to_vec())).collect())
    }

    fn n_classes(&self) -> Option<usize>;

    fn n_features(&self) -> Option<usize>;
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
