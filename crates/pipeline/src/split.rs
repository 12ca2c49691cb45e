//! Seeded train/validation split.

use crate::error::{PipelineError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Row indices of each side of a split, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub valid: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `test_size` of it.
///
/// With `stratify`, each class is split on its own so both sides keep the
/// class proportions; every class with at least two rows lands on both
/// sides. The same inputs always produce the same split.
pub fn train_valid_split(
    n: usize,
    test_size: f64,
    seed: u64,
    stratify: Option<&[usize]>,
) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if n < 2 {
        return Err(PipelineError::EmptyInput(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let (mut train, mut valid) = match stratify {
        None => {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let n_valid = holdout(n, test_size);
            let train = indices.split_off(n_valid);
            (train, indices)
        }
        Some(labels) => {
            if labels.len() != n {
                return Err(PipelineError::config(format!(
                    "{} stratification labels for {} rows",
                    labels.len(),
                    n
                )));
            }
            let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, &label) in labels.iter().enumerate() {
                groups.entry(label).or_default().push(i);
            }

            let mut train = Vec::with_capacity(n);
            let mut valid = Vec::new();
            for (_, mut members) in groups {
                members.shuffle(&mut rng);
                let n_valid = if members.len() < 2 {
                    0
                } else {
                    ((members.len() as f64 * test_size).round() as usize).clamp(1, members.len() - 1)
                };
                valid.extend_from_slice(&members[..n_valid]);
                train.extend_from_slice(&members[n_valid..]);
            }
            (train, valid)
        }
    };

    train.sort_unstable();
    valid.sort_unstable();
    Ok(Split { train, valid })
}

/// Held-out row count: `ceil(n * test_size)`, leaving at least one train row.
fn holdout(n: usize, test_size: f64) -> usize {
    ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1)
}

/// Gather the elements at `indices`.
pub fn take<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_disjoint() {
        let split = train_valid_split(10, 0.2, 42, None).unwrap();
        assert_eq!(split.valid.len(), 2);
        assert_eq!(split.train.len(), 8);

        let mut all: Vec<usize> = split.train.iter().chain(&split.valid).copied().collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let a = train_valid_split(50, 0.3, 7, None).unwrap();
        let b = train_valid_split(50, 0.3, 7, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stratified_keeps_every_class_on_both_sides() {
        let labels: Vec<usize> = (0..40).map(|i| i % 4).collect();
        let split = train_valid_split(40, 0.25, 42, Some(&labels)).unwrap();
        for class in 0..4 {
            assert!(split.valid.iter().any(|&i| labels[i] == class));
            assert!(split.train.iter().any(|&i| labels[i] == class));
        }
        assert_eq!(split.valid.len(), 12);
    }

    #[test]
    fn test_singleton_class_stays_in_train() {
        let labels = vec![0, 0, 0, 0, 1];
        let split = train_valid_split(5, 0.2, 1, Some(&labels)).unwrap();
        assert!(split.train.contains(&4));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(train_valid_split(10, 0.0, 1, None).is_err());
        assert!(train_valid_split(10, 1.0, 1, None).is_err());
        assert!(train_valid_split(1, 0.2, 1, None).is_err());
        assert!(train_valid_split(3, 0.2, 1, Some(&[0, 1])).is_err());
    }

    #[test]
    fn test_take() {
        assert_eq!(take(&["a", "b", "c"], &[2, 0]), vec!["c", "a"]);
    }
}
