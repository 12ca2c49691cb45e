//! Split criteria.
//!
//! A criterion keeps running statistics over a set of samples so that a
//! split sweep can move samples from one side to the other in O(1) each.

/// Running statistics of a split criterion.
pub trait Impurity: Sync {
    type Stats: Clone + Send;

    /// Values stored per leaf
    fn n_outputs(&self) -> usize;

    fn empty(&self) -> Self::Stats;

    fn add(&self, stats: &mut Self::Stats, sample: usize);

    fn remove(&self, stats: &mut Self::Stats, sample: usize);

    fn count(&self, stats: &Self::Stats) -> usize;

    /// Node impurity multiplied by its sample count
    fn weighted(&self, stats: &Self::Stats) -> f64;

    /// Leaf prediction written into `out` (length `n_outputs`)
    fn leaf_value(&self, stats: &Self::Stats, out: &mut [f64]);
}

// =============================================================================
// Variance (regression)
// =============================================================================

/// Sum of squared errors around the mean
pub struct Variance<'a> {
    targets: &'a [f64],
}

impl<'a> Variance<'a> {
    pub fn new(targets: &'a [f64]) -> Self {
        Self { targets }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Moments {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl Impurity for Variance<'_> {
    type Stats = Moments;

    fn n_outputs(&self) -> usize {
        1
    }

    fn empty(&self) -> Moments {
        Moments::default()
    }

    fn add(&self, stats: &mut Moments, sample: usize) {
        let y = self.targets[sample];
        stats.n += 1;
        stats.sum += y;
        stats.sum_sq += y * y;
    }

    fn remove(&self, stats: &mut Moments, sample: usize) {
        let y = self.targets[sample];
        stats.n -= 1;
        stats.sum -= y;
        stats.sum_sq -= y * y;
    }

    fn count(&self, stats: &Moments) -> usize {
        stats.n
    }

    fn weighted(&self, stats: &Moments) -> f64 {
        if stats.n == 0 {
            return 0.0;
        }
        (stats.sum_sq - stats.sum * stats.sum / stats.n as f64).max(0.0)
    }

    fn leaf_value(&self, stats: &Moments, out: &mut [f64]) {
        out[0] = if stats.n == 0 { 0.0 } else { stats.sum / stats.n as f64 };
    }
}

// =============================================================================
// Gini (classification)
// =============================================================================

/// Gini impurity over class labels
pub struct Gini<'a> {
    labels: &'a [usize],
    n_classes: usize,
}

impl<'a> Gini<'a> {
    pub fn new(labels: &'a [usize], n_classes: usize) -> Self {
        Self { labels, n_classes }
    }
}

#[derive(Debug, Clone)]
pub struct ClassCounts {
    n: usize,
    counts: Vec<usize>,
}

impl Impurity for Gini<'_> {
    type Stats = ClassCounts;

    fn n_outputs(&self) -> usize {
        self.n_classes
    }

    fn empty(&self) -> ClassCounts {
        ClassCounts {
            n: 0,
            counts: vec![0; self.n_classes],
        }
    }

    fn add(&self, stats: &mut ClassCounts, sample: usize) {
        stats.n += 1;
        stats.counts[self.labels[sample]] += 1;
    }

    fn remove(&self, stats: &mut ClassCounts, sample: usize) {
        stats.n -= 1;
        stats.counts[self.labels[sample]] -= 1;
    }

    fn count(&self, stats: &ClassCounts) -> usize {
        stats.n
    }

    /// `n - sum(c^2) / n`, i.e. `n * gini`
    fn weighted(&self, stats: &ClassCounts) -> f64 {
        if stats.n == 0 {
            return 0.0;
        }
        let n = stats.n as f64;
        let sum_sq: f64 = stats.counts.iter().map(|&c| (c * c) as f64).sum();
        n - sum_sq / n
    }

    fn leaf_value(&self, stats: &ClassCounts, out: &mut [f64]) {
        let n = stats.n.max(1) as f64;
        for (slot, &c) in out.iter_mut().zip(&stats.counts) {
            *slot = c as f64 / n;
        }
    }
}
