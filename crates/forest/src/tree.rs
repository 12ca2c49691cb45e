//! CART decision tree.
//!
//! Nodes are stored as parallel arrays indexed by node id, root at 0.
//! A node whose `left` child is [`NO_CHILD`] is a leaf. Leaf predictions live
//! in a flat buffer with `n_outputs` values per node: one mean for
//! regression, one probability per class for classification.
//!
//! A sample goes left when `x[feature] <= threshold`.

use crate::error::{ForestError, Result};
use crate::impurity::Impurity;
use crate::params::TreeParams;
use ndarray::ArrayView2;
use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Child index marking a leaf
pub const NO_CHILD: u32 = u32::MAX;

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

/// A fitted tree in structure-of-arrays layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    features: Vec<u32>,
    thresholds: Vec<f32>,
    left: Vec<u32>,
    right: Vec<u32>,
    leaf_values: Vec<f64>,
    n_outputs: usize,
    n_features: usize,
}

impl Tree {
    fn with_outputs(n_outputs: usize, n_features: usize) -> Self {
        Self {
            features: Vec::new(),
            thresholds: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
            leaf_values: Vec::new(),
            n_outputs,
            n_features,
        }
    }

    /// Append a leaf node and return its id.
    fn push_node(&mut self) -> u32 {
        let id = self.features.len() as u32;
        self.features.push(0);
        self.thresholds.push(0.0);
        self.left.push(NO_CHILD);
        self.right.push(NO_CHILD);
        self.leaf_values.extend(std::iter::repeat_n(0.0, self.n_outputs));
        id
    }

    pub fn n_nodes(&self) -> usize {
        self.features.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.left.iter().filter(|&&l| l == NO_CHILD).count()
    }

    /// Longest root-to-leaf path, in edges
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let n = node as usize;
            if self.left[n] == NO_CHILD {
                max_depth = max_depth.max(depth);
            } else {
                stack.push((self.left[n], depth + 1));
                stack.push((self.right[n], depth + 1));
            }
        }
        max_depth
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Leaf values reached by one feature row.
    pub fn predict_row(&self, row: &[f32]) -> &[f64] {
        let mut node = 0usize;
        while self.left[node] != NO_CHILD {
            let value = row[self.features[node] as usize];
            node = if value <= self.thresholds[node] {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        &self.leaf_values[node * self.n_outputs..(node + 1) * self.n_outputs]
    }

    /// Grow a tree on the given sample indices (duplicates allowed).
    pub fn grow<I: Impurity, R: Rng>(
        x: ArrayView2<f32>,
        criterion: &I,
        samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(ForestError::EmptyTrainingSet);
        }
        let n_features = x.ncols();
        let n_candidates = params.max_features.resolve(n_features);
        let mut tree = Tree::with_outputs(criterion.n_outputs(), n_features);

        let root = tree.push_node();
        let mut stack = vec![(root, samples, 0usize)];

        while let Some((node, mut samples, depth)) = stack.pop() {
            let mut stats = criterion.empty();
            for &s in &samples {
                criterion.add(&mut stats, s);
            }
            let n = node as usize;
            let n_out = tree.n_outputs;
            criterion.leaf_value(&stats, &mut tree.leaf_values[n * n_out..(n + 1) * n_out]);

            let parent = criterion.weighted(&stats);
            let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
            if depth_reached || samples.len() < params.min_samples_split || parent <= MIN_GAIN || n_features == 0 {
                continue;
            }

            let candidates = index::sample(rng, n_features, n_candidates);
            let Some(best) = best_split(x, criterion, &mut samples, &stats, candidates.iter(), params, parent)
            else {
                continue;
            };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .copied()
                .partition(|&s| x[[s, best.feature]] <= best.threshold);
            if left_samples.is_empty() || right_samples.is_empty() {
                continue;
            }

            let left = tree.push_node();
            let right = tree.push_node();
            tree.features[n] = best.feature as u32;
            tree.thresholds[n] = best.threshold;
            tree.left[n] = left;
            tree.right[n] = right;
            stack.push((right, right_samples, depth + 1));
            stack.push((left, left_samples, depth + 1));
        }

        Ok(tree)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f32,
    score: f64,
}

/// Lowest weighted child impurity over the candidate features, if any split
/// improves on the parent.
fn best_split<I: Impurity>(
    x: ArrayView2<f32>,
    criterion: &I,
    samples: &mut [usize],
    total: &I::Stats,
    candidates: impl Iterator<Item = usize>,
    params: &TreeParams,
    parent: f64,
) -> Option<SplitCandidate> {
    let mut best: Option<SplitCandidate> = None;
    let n = samples.len();

    for feature in candidates {
        samples.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left = criterion.empty();
        let mut right = total.clone();
        for i in 0..n - 1 {
            criterion.add(&mut left, samples[i]);
            criterion.remove(&mut right, samples[i]);

            let here = x[[samples[i], feature]];
            let next = x[[samples[i + 1], feature]];
            if here >= next {
                continue;
            }
            let n_left = criterion.count(&left);
            if n_left < params.min_samples_leaf || n - n_left < params.min_samples_leaf {
                continue;
            }

            let score = criterion.weighted(&left) + criterion.weighted(&right);
            if parent - score <= MIN_GAIN {
                continue;
            }
            if best.as_ref().is_none_or(|b| score < b.score) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(here, next),
                    score,
                });
            }
        }
    }
    best
}

/// Threshold strictly separating `lo < hi`
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi || mid < lo { lo } else { mid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impurity::{Gini, Variance};
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_regression_tree_fits_step_function() {
        let x = array![[1.0f32], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = [1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let tree = Tree::grow(x.view(), &Variance::new(&y), (0..6).collect(), &TreeParams::default(), &mut rng())
            .unwrap();

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[2.5]), &[1.0]);
        assert_eq!(tree.predict_row(&[11.5]), &[5.0]);
        // threshold sits between 3 and 10
        assert_eq!(tree.predict_row(&[6.5]), &[1.0]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[1.0f32], [2.0], [3.0], [4.0]];
        let y = [1.0, 2.0, 3.0, 4.0];
        let params = TreeParams {
            max_depth: Some(1),
            ..TreeParams::default()
        };
        let tree = Tree::grow(x.view(), &Variance::new(&y), (0..4).collect(), &params, &mut rng()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0f32], [2.0], [3.0], [4.0]];
        let y = [0.0, 0.0, 0.0, 9.0];
        let params = TreeParams {
            min_samples_leaf: 2,
            ..TreeParams::default()
        };
        let tree = Tree::grow(x.view(), &Variance::new(&y), (0..4).collect(), &params, &mut rng()).unwrap();
        // the 3|1 split is forbidden, only 2|2 remains
        assert_eq!(tree.predict_row(&[1.0]), &[0.0]);
        assert_eq!(tree.predict_row(&[4.0]), &[4.5]);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = array![[1.0f32, 5.0], [2.0, 6.0]];
        let y = [3.0, 3.0];
        let tree = Tree::grow(x.view(), &Variance::new(&y), vec![0, 1], &TreeParams::default(), &mut rng())
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(&[0.0, 0.0]), &[3.0]);
    }

    #[test]
    fn test_classification_tree_leaf_distributions() {
        let x = array![[0.0f32, 1.0], [0.0, 2.0], [1.0, 1.0], [1.0, 2.0]];
        let labels = [0, 0, 1, 1];
        let tree = Tree::grow(
            x.view(),
            &Gini::new(&labels, 2),
            (0..4).collect(),
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(tree.n_outputs(), 2);
        assert_eq!(tree.predict_row(&[0.0, 1.5]), &[1.0, 0.0]);
        assert_eq!(tree.predict_row(&[1.0, 1.5]), &[0.0, 1.0]);
    }

    #[test]
    fn test_duplicate_samples_from_bootstrap() {
        let x = array![[1.0f32], [2.0]];
        let y = [1.0, 3.0];
        let tree = Tree::grow(x.view(), &Variance::new(&y), vec![0, 0, 0, 1], &TreeParams::default(), &mut rng())
            .unwrap();
        assert_eq!(tree.predict_row(&[1.0]), &[1.0]);
        assert_eq!(tree.predict_row(&[2.0]), &[3.0]);
    }

    #[test]
    fn test_empty_samples_is_error() {
        let x = array![[1.0f32]];
        let y = [1.0];
        let err = Tree::grow(x.view(), &Variance::new(&y), vec![], &TreeParams::default(), &mut rng()).unwrap_err();
        assert!(matches!(err, ForestError::EmptyTrainingSet));
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(midpoint(1.0, 3.0), 2.0);
        let lo = 1.0f32;
        let hi = f32::from_bits(lo.to_bits() + 1);
        assert_eq!(midpoint(lo, hi), lo);
    }
}
