//! Discretization of the continuous score into ordinal classes.
//!
//! Edges `e0 <= e1 <= ... <= eN` define N intervals. Every interval is
//! half-open `[e(i), e(i+1))` except the last, which is closed `[e(N-1), eN]`.
//! Values outside `[e0, eN]` clamp to the first or last interval.
//!
//! Edges come from one of two sources:
//! - **quantile**: the 0th..100th percentiles of the observed target in
//!   `n_classes` equal steps, with repeated boundaries collapsed. The realized
//!   class count can therefore be lower than requested.
//! - **fixed**: exactly `n_classes + 1` caller-supplied boundaries.
//!
//! Edges are computed once at training time and persisted with the model.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Decimal places used when rendering interval labels
pub const LABEL_PRECISION: usize = 1;

/// Highest precision tried before falling back to exact rendering
pub const MAX_LABEL_PRECISION: usize = 6;

/// Default fixed boundaries on the 0-10 score scale
pub const DEFAULT_FIXED_EDGES: [f64; 6] = [0.0, 5.0, 6.5, 7.5, 8.5, 10.0];

/// Default requested class count
pub const DEFAULT_N_CLASSES: usize = 5;

// =============================================================================
// BinMode
// =============================================================================

/// How bin edges are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinMode {
    Quantile,
    Fixed,
}

impl BinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinMode::Quantile => "quantile",
            BinMode::Fixed => "fixed",
        }
    }
}

impl fmt::Display for BinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantile" => Ok(BinMode::Quantile),
            "fixed" => Ok(BinMode::Fixed),
            other => Err(PipelineError::config(format!("unknown bin mode '{}'", other))),
        }
    }
}

// =============================================================================
// BinEdges
// =============================================================================

/// Validated, non-decreasing boundary values (at least two).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(PipelineError::config(format!(
                "bin edges need at least 2 values, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(PipelineError::config("bin edges must be finite"));
        }
        if edges.windows(2).any(|w| w[0] > w[1]) {
            return Err(PipelineError::config(format!(
                "bin edges must be non-decreasing, got {:?}",
                edges
            )));
        }
        Ok(Self(edges))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of intervals
    pub fn n_classes(&self) -> usize {
        self.0.len() - 1
    }

    /// Class index of a value; see [`assign`].
    pub fn assign(&self, value: f64) -> usize {
        assign(value, &self.0)
    }
}

impl TryFrom<Vec<f64>> for BinEdges {
    type Error = PipelineError;

    fn try_from(edges: Vec<f64>) -> Result<Self> {
        Self::new(edges)
    }
}

impl From<BinEdges> for Vec<f64> {
    fn from(edges: BinEdges) -> Self {
        edges.0
    }
}

// =============================================================================
// ClassLabel / Binning
// =============================================================================

/// An interval index paired with its rendered label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub index: usize,
    pub label: String,
}

/// Edges plus their labels, produced together and persisted together.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    mode: BinMode,
    edges: BinEdges,
    labels: Vec<ClassLabel>,
}

impl Binning {
    /// Rebuild from persisted edges and labels.
    pub fn from_parts(mode: BinMode, edges: Vec<f64>, labels: Vec<String>) -> Result<Self> {
        let edges = BinEdges::new(edges)?;
        if labels.len() != edges.n_classes() {
            return Err(PipelineError::config(format!(
                "{} class labels for {} intervals",
                labels.len(),
                edges.n_classes()
            )));
        }
        if !all_distinct(&labels) {
            return Err(PipelineError::config(format!("class labels must be unique, got {:?}", labels)));
        }
        let labels = labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| ClassLabel { index, label })
            .collect();
        Ok(Self { mode, edges, labels })
    }

    fn from_edges(mode: BinMode, edges: BinEdges) -> Self {
        let labels = render_labels(edges.as_slice())
            .into_iter()
            .enumerate()
            .map(|(index, label)| ClassLabel { index, label })
            .collect();
        Self { mode, edges, labels }
    }

    pub fn mode(&self) -> BinMode {
        self.mode
    }

    pub fn edges(&self) -> &BinEdges {
        &self.edges
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn label_strings(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.label.clone()).collect()
    }

    /// Realized class count
    pub fn n_classes(&self) -> usize {
        self.edges.n_classes()
    }

    pub fn assign(&self, value: f64) -> usize {
        self.edges.assign(value)
    }

    /// Class label of a value
    pub fn classify(&self, value: f64) -> &ClassLabel {
        &self.labels[self.assign(value)]
    }

    pub fn assign_all(&self, values: &[f64]) -> Vec<usize> {
        values.iter().map(|&v| self.assign(v)).collect()
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Derive bin edges and labels for a target column.
///
/// In fixed mode `fixed_edges` must hold exactly `n_classes + 1`
/// non-decreasing values. In quantile mode the caller must use
/// `Binning::n_classes()` afterwards, which may be below `n_classes`.
pub fn compute_edges(
    values: &[f64],
    mode: BinMode,
    n_classes: usize,
    fixed_edges: Option<&[f64]>,
) -> Result<Binning> {
    if n_classes == 0 {
        return Err(PipelineError::config("n_classes must be at least 1"));
    }

    match mode {
        BinMode::Fixed => {
            let edges = fixed_edges
                .ok_or_else(|| PipelineError::config("fixed bin mode requires explicit edges"))?;
            if edges.len() != n_classes + 1 {
                return Err(PipelineError::config(format!(
                    "fixed bin mode needs {} edges for {} classes, got {}",
                    n_classes + 1,
                    n_classes,
                    edges.len()
                )));
            }
            Ok(Binning::from_edges(mode, BinEdges::new(edges.to_vec())?))
        }
        BinMode::Quantile => {
            if values.is_empty() {
                return Err(PipelineError::EmptyInput("no target values to bin".into()));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::config("target values must be finite"));
            }

            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);

            let mut edges: Vec<f64> = (0..=n_classes)
                .map(|step| quantile(&sorted, step as f64 / n_classes as f64))
                .collect();
            edges.dedup();

            if edges.len() < 2 {
                return Err(PipelineError::DegenerateTarget);
            }
            Ok(Binning::from_edges(mode, BinEdges::new(edges)?))
        }
    }
}

/// Class index of `value` under `edges`, by binary search.
///
/// Interior edges start a new interval, so a value equal to `edges[i]`
/// (`0 < i < N`) lands in interval `i`. The global max lands in the last
/// interval. Out-of-range values clamp; this never panics and never returns
/// an index past the last interval.
pub fn assign(value: f64, edges: &[f64]) -> usize {
    if edges.len() < 3 {
        return 0;
    }
    edges[1..edges.len() - 1].partition_point(|&edge| edge <= value)
}

/// Render `"[a, b)"` labels, closing the final interval with `]`.
///
/// All labels share one precision, starting at [`LABEL_PRECISION`] and raised
/// until no two labels coincide. Past [`MAX_LABEL_PRECISION`] the edges are
/// printed exactly, and intervals repeated by duplicate fixed edges get their
/// index appended, so labels stay 1:1 with intervals.
pub fn render_labels(edges: &[f64]) -> Vec<String> {
    for prec in LABEL_PRECISION..=MAX_LABEL_PRECISION {
        let labels = render_with(edges, |v| format!("{:.prec$}", v, prec = prec));
        if all_distinct(&labels) {
            return labels;
        }
    }

    let mut labels = render_with(edges, |v| format!("{:?}", v));
    let mut seen = HashSet::new();
    for (index, label) in labels.iter_mut().enumerate() {
        if !seen.insert(label.clone()) {
            label.push_str(&format!(" #{}", index));
        }
    }
    labels
}

fn render_with(edges: &[f64], fmt_edge: impl Fn(f64) -> String) -> Vec<String> {
    let n = edges.len().saturating_sub(1);
    edges
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let close = if i + 1 < n { ')' } else { ']' };
            format!("[{}, {}{}", fmt_edge(w[0]), fmt_edge(w[1]), close)
        })
        .collect()
}

fn all_distinct(labels: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(labels.len());
    labels.iter().all(|label| seen.insert(label.as_str()))
}

/// Linear-interpolated quantile of pre-sorted values, `q` in `[0, 1]`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
