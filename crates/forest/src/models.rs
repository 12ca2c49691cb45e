//! Algorithm selection and the pipeline learner traits.
//!
//! `RegressionModel` and `ClassificationModel` are what a training run
//! stores inside a persisted pipeline. The `algo` tag in the JSON selects
//! the variant when the pipeline is loaded back.

use crate::error::ForestError;
use crate::forest::{DecisionTreeClassifier, DecisionTreeRegressor, RandomForestClassifier, RandomForestRegressor};
use crate::params::ForestParams;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use pipeline::{Classifier, Regressor, SupportsMemberPredictions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Learning algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algo {
    RandomForest,
    DecisionTree,
}

impl Algo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algo::RandomForest => "random_forest",
            Algo::DecisionTree => "decision_tree",
        }
    }
}

impl fmt::Display for Algo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algo {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, ForestError> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(Algo::RandomForest),
            "decision_tree" | "tree" => Ok(Algo::DecisionTree),
            other => Err(ForestError::InvalidParameter(format!("unknown algorithm '{}'", other))),
        }
    }
}

// =============================================================================
// RegressionModel
// =============================================================================

/// Regression learner chosen at training time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algo", rename_all = "snake_case")]
pub enum RegressionModel {
    RandomForest(RandomForestRegressor),
    DecisionTree(DecisionTreeRegressor),
}

impl RegressionModel {
    /// Unfitted model; a decision tree uses the tree part of `params`.
    pub fn new(algo: Algo, params: ForestParams) -> Self {
        match algo {
            Algo::RandomForest => RegressionModel::RandomForest(RandomForestRegressor::new(params)),
            Algo::DecisionTree => {
                RegressionModel::DecisionTree(DecisionTreeRegressor::new(params.tree, params.random_state))
            }
        }
    }

    pub fn algo(&self) -> Algo {
        match self {
            RegressionModel::RandomForest(_) => Algo::RandomForest,
            RegressionModel::DecisionTree(_) => Algo::DecisionTree,
        }
    }
}

impl Default for RegressionModel {
    fn default() -> Self {
        Self::new(Algo::RandomForest, ForestParams::default())
    }
}

impl Regressor for RegressionModel {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f64>) -> pipeline::Result<()> {
        let y = y.to_vec();
        match self {
            RegressionModel::RandomForest(m) => m.fit(x, &y)?,
            RegressionModel::DecisionTree(m) => m.fit(x, &y)?,
        }
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> pipeline::Result<Array1<f64>> {
        let pred = match self {
            RegressionModel::RandomForest(m) => m.predict(x)?,
            RegressionModel::DecisionTree(m) => m.predict(x)?,
        };
        Ok(pred)
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            RegressionModel::RandomForest(m) => m.n_features(),
            RegressionModel::DecisionTree(m) => m.n_features(),
        }
    }

    fn as_ensemble(&self) -> Option<&dyn SupportsMemberPredictions> {
        match self {
            RegressionModel::RandomForest(m) => Some(m),
            RegressionModel::DecisionTree(_) => None,
        }
    }
}

impl SupportsMemberPredictions for RandomForestRegressor {
    fn member_predictions(&self, x: ArrayView2<f32>) -> pipeline::Result<Array2<f64>> {
        Ok(RandomForestRegressor::member_predictions(self, x)?)
    }
}

// =============================================================================
// ClassificationModel
// =============================================================================

/// Classification learner chosen at training time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algo", rename_all = "snake_case")]
pub enum ClassificationModel {
    RandomForest(RandomForestClassifier),
    DecisionTree(DecisionTreeClassifier),
}

impl ClassificationModel {
    pub fn new(algo: Algo, params: ForestParams) -> Self {
        match algo {
            Algo::RandomForest => ClassificationModel::RandomForest(RandomForestClassifier::new(params)),
            Algo::DecisionTree => {
                ClassificationModel::DecisionTree(DecisionTreeClassifier::new(params.tree, params.random_state))
            }
        }
    }

    pub fn algo(&self) -> Algo {
        match self {
            ClassificationModel::RandomForest(_) => Algo::RandomForest,
            ClassificationModel::DecisionTree(_) => Algo::DecisionTree,
        }
    }
}

impl Default for ClassificationModel {
    fn default() -> Self {
        Self::new(Algo::RandomForest, ForestParams::classification())
    }
}

impl Classifier for ClassificationModel {
    fn fit(&mut self, x: ArrayView2<f32>, y: &[usize], n_classes: usize) -> pipeline::Result<()> {
        match self {
            ClassificationModel::RandomForest(m) => m.fit(x, y, n_classes)?,
            ClassificationModel::DecisionTree(m) => m.fit(x, y, n_classes)?,
        }
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f32>) -> pipeline::Result<Array2<f64>> {
        let proba = match self {
            ClassificationModel::RandomForest(m) => m.predict_proba(x)?,
            ClassificationModel::DecisionTree(m) => m.predict_proba(x)?,
        };
        Ok(proba)
    }

    fn n_classes(&self) -> Option<usize> {
        match self {
            ClassificationModel::RandomForest(m) => m.n_classes(),
            ClassificationModel::DecisionTree(m) => m.n_classes(),
        }
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            ClassificationModel::RandomForest(m) => m.n_features(),
            ClassificationModel::DecisionTree(m) => m.n_features(),
        }
    }
}
