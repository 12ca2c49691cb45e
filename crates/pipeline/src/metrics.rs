//! Evaluation metrics reported in the metrics document.

use std::collections::{BTreeMap, BTreeSet};

/// Fraction of exact matches
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

/// Unweighted mean of per-class F1 over every class present in either input.
///
/// A class with no true and no predicted positives never appears; a class
/// with zero precision and recall contributes 0.
pub fn macro_f1(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let classes: BTreeSet<usize> = y_true.iter().chain(y_pred).copied().collect();
    if classes.is_empty() {
        return 0.0;
    }

    let total: f64 = classes
        .iter()
        .map(|&class| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in y_true.iter().zip(y_pred) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                2.0 * tp as f64 / denom as f64
            }
        })
        .sum();
    total / classes.len() as f64
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2))).sqrt()
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()))
}

/// Coefficient of determination; 0 when the target is constant.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let y_mean = mean(y_true.iter().copied());
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    1.0 - ss_res / ss_tot
}

/// Count of rows per class, keyed by class label. Classes absent from
/// `classes` are omitted.
pub fn class_distribution(classes: &[usize], labels: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for &class in classes {
        if let Some(label) = labels.get(class) {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
    }
    counts
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
