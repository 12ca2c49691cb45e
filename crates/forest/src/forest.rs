//! Bagged ensembles of CART trees.
//!
//! Each tree is grown on its own bootstrap sample with its own RNG, seeded
//! from `random_state` and the tree index, so training is reproducible
//! regardless of how rayon schedules the trees.

use crate::error::{ForestError, Result};
use crate::impurity::{Gini, Impurity, Variance};
use crate::params::{ForestParams, TreeParams};
use crate::tree::Tree;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Spreads per-tree seeds across the u64 space
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of tree `index` in a forest seeded with `random_state`
pub fn tree_seed(random_state: u64, index: usize) -> u64 {
    random_state.wrapping_add((index as u64).wrapping_mul(SEED_STRIDE))
}

/// Grow `params.n_trees` trees in parallel.
fn grow_trees<I: Impurity>(x: ArrayView2<f32>, criterion: &I, params: &ForestParams) -> Result<Vec<Tree>> {
    let n = x.nrows();
    (0..params.n_trees)
        .into_par_iter()
        .map(|t| {
            let mut rng = StdRng::seed_from_u64(tree_seed(params.random_state, t));
            let samples: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.random_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            Tree::grow(x, criterion, samples, &params.tree, &mut rng)
        })
        .collect()
}

/// Fail unless `found` matches the width seen at fit.
pub(crate) fn check_width(fitted: Option<usize>, found: usize) -> Result<usize> {
    let expected = fitted.ok_or(ForestError::NotFitted("model"))?;
    if expected != found {
        return Err(ForestError::FeatureMismatch { expected, found });
    }
    Ok(expected)
}

pub(crate) fn check_training_set(rows: usize, targets: usize) -> Result<()> {
    if rows == 0 {
        return Err(ForestError::EmptyTrainingSet);
    }
    if rows != targets {
        return Err(ForestError::LengthMismatch { rows, targets });
    }
    Ok(())
}

pub(crate) fn check_labels(labels: &[usize], n_classes: usize) -> Result<()> {
    if n_classes == 0 {
        return Err(ForestError::InvalidParameter("n_classes must be at least 1".into()));
    }
    match labels.iter().find(|&&l| l >= n_classes) {
        Some(&label) => Err(ForestError::InvalidLabel { label, n_classes }),
        None => Ok(()),
    }
}

// =============================================================================
// Regressor
// =============================================================================

/// Random forest predicting the mean of its trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<Tree>,
    n_features: Option<usize>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn fit(&mut self, x: ArrayView2<f32>, y: &[f64]) -> Result<()> {
        self.params.validate()?;
        check_training_set(x.nrows(), y.len())?;

        let trees = grow_trees(x, &Variance::new(y), &self.params)?;
        let mean_leaves = trees.iter().map(|t| t.n_leaves()).sum::<usize>() as f64 / trees.len() as f64;
        info!(
            "Fitted random forest regressor: {} trees, {:.1} leaves per tree",
            trees.len(),
            mean_leaves
        );
        self.trees = trees;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    /// Prediction of every tree, shape `(trees, rows)`
    pub fn member_predictions(&self, x: ArrayView2<f32>) -> Result<Array2<f64>> {
        check_width(self.n_features, x.ncols())?;
        let rows: Vec<Vec<f32>> = x.rows().into_iter().map(|r| r.to_vec()).collect();

        let per_tree: Vec<Vec<f64>> = self
            .trees
            .par_iter()
            .map(|tree| rows.iter().map(|row| tree.predict_row(row)[0]).collect())
            .collect();

        let mut out = Array2::zeros((self.trees.len(), x.nrows()));
        for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(per_tree) {
            dst.assign(&Array1::from(src));
        }
        Ok(out)
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        let members = self.member_predictions(x)?;
        members
            .mean_axis(Axis(0))
            .ok_or(ForestError::NotFitted("RandomForestRegressor"))
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Random forest averaging the class distributions of its trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    trees: Vec<Tree>,
    n_features: Option<usize>,
    n_classes: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: None,
            n_classes: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    pub fn fit(&mut self, x: ArrayView2<f32>, y: &[usize], n_classes: usize) -> Result<()> {
        self.params.validate()?;
        check_training_set(x.nrows(), y.len())?;
        check_labels(y, n_classes)?;

        let trees = grow_trees(x, &Gini::new(y, n_classes), &self.params)?;
        info!(
            "Fitted random forest classifier: {} trees, {} classes",
            trees.len(),
            n_classes
        );
        self.trees = trees;
        self.n_features = Some(x.ncols());
        self.n_classes = Some(n_classes);
        Ok(())
    }

    /// Mean of the trees' leaf distributions, shape `(rows, classes)`
    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f64>> {
        check_width(self.n_features, x.ncols())?;
        let n_classes = self.n_classes.ok_or(ForestError::NotFitted("RandomForestClassifier"))?;
        let n_trees = self.trees.len().max(1) as f64;

        let rows: Vec<Vec<f32>> = x.rows().into_iter().map(|r| r.to_vec()).collect();
        let distributions: Vec<Vec<f64>> = rows
            .par_iter()
            .map(|row| {
                let mut acc = vec![0.0; n_classes];
                for tree in &self.trees {
                    for (slot, &p) in acc.iter_mut().zip(tree.predict_row(row)) {
                        *slot += p;
                    }
                }
                acc.iter_mut().for_each(|v| *v /= n_trees);
                acc
            })
            .collect();

        let mut out = Array2::zeros((x.nrows(), n_classes));
        for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(distributions) {
            dst.assign(&Array1::from(src));
        }
        debug!("Predicted class distributions for {} rows", x.nrows());
        Ok(out)
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(ForestParams::classification())
    }
}

// =============================================================================
// Single trees
// =============================================================================

/// One CART regression tree on all rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    params: TreeParams,
    random_state: u64,
    tree: Option<Tree>,
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams, random_state: u64) -> Self {
        Self {
            params,
            random_state,
            tree: None,
        }
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.tree.as_ref().map(Tree::n_features)
    }

    pub fn fit(&mut self, x: ArrayView2<f32>, y: &[f64]) -> Result<()> {
        self.params.validate()?;
        check_training_set(x.nrows(), y.len())?;
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let tree = Tree::grow(x, &Variance::new(y), (0..x.nrows()).collect(), &self.params, &mut rng)?;
        info!(
            "Fitted decision tree regressor: {} leaves, depth {}",
            tree.n_leaves(),
            tree.depth()
        );
        self.tree = Some(tree);
        Ok(())
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        let tree = self.tree.as_ref().ok_or(ForestError::NotFitted("DecisionTreeRegressor"))?;
        check_width(Some(tree.n_features()), x.ncols())?;
        Ok(x.rows().into_iter().map(|row| tree.predict_row(&row.to_vec())[0]).collect())
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new(TreeParams::default(), 42)
    }
}

/// One CART classification tree on all rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    params: TreeParams,
    random_state: u64,
    tree: Option<Tree>,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams, random_state: u64) -> Self {
        Self {
            params,
            random_state,
            tree: None,
        }
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.tree.as_ref().map(Tree::n_features)
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.tree.as_ref().map(Tree::n_outputs)
    }

    pub fn fit(&mut self, x: ArrayView2<f32>, y: &[usize], n_classes: usize) -> Result<()> {
        self.params.validate()?;
        check_training_set(x.nrows(), y.len())?;
        check_labels(y, n_classes)?;
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let tree = Tree::grow(
            x,
            &Gini::new(y, n_classes),
            (0..x.nrows()).collect(),
            &self.params,
            &mut rng,
        )?;
        info!(
            "Fitted decision tree classifier: {} leaves, depth {}",
            tree.n_leaves(),
            tree.depth()
        );
        self.tree = Some(tree);
        Ok(())
    }

    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f64>> {
        let tree = self.tree.as_ref().ok_or(ForestError::NotFitted("DecisionTreeClassifier"))?;
        check_width(Some(tree.n_features()), x.ncols())?;
        let mut out = Array2::zeros((x.nrows(), tree.n_outputs()));
        for (mut dst, row) in out.axis_iter_mut(Axis(0)).zip(x.rows()) {
            dst.assign(&ndarray::ArrayView1::from(tree.predict_row(&row.to_vec())));
        }
        Ok(out)
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(TreeParams::default(), 42)
    }
}
