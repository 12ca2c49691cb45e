//! Hyper-parameters for trees and forests.

use crate::error::{ForestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    /// Fraction of the features in `(0, 1]`
    Fraction(f64),
}

impl MaxFeatures {
    /// Concrete count for `n_features` columns, at least 1
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => f.write_str("all"),
            MaxFeatures::Sqrt => f.write_str("sqrt"),
            MaxFeatures::Fraction(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for MaxFeatures {
    type Err = ForestError;

    /// Accepts `all`, `sqrt`, or a fraction such as `0.5`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MaxFeatures::All),
            "sqrt" => Ok(MaxFeatures::Sqrt),
            other => {
                let fraction: f64 = other.parse().map_err(|_| {
                    ForestError::InvalidParameter(format!("max_features '{}' is not all, sqrt or a number", s))
                })?;
                let params = MaxFeatures::Fraction(fraction);
                params.validate()?;
                Ok(params)
            }
        }
    }
}

impl MaxFeatures {
    fn validate(&self) -> Result<()> {
        if let MaxFeatures::Fraction(f) = self {
            if !(*f > 0.0 && *f <= 1.0) {
                return Err(ForestError::InvalidParameter(format!(
                    "max_features fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        Ok(())
    }
}

/// Growth limits of a single CART tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(ForestError::InvalidParameter(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ForestError::InvalidParameter("max_depth must be at least 1".into()));
        }
        self.max_features.validate()
    }
}

/// Bagging setup of a random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    /// Sample rows with replacement for each tree
    pub bootstrap: bool,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: TreeParams::default(),
            bootstrap: true,
            random_state: 42,
        }
    }
}

impl ForestParams {
    /// Defaults for classification: square-root feature subsampling
    pub fn classification() -> Self {
        Self {
            tree: TreeParams {
                max_features: MaxFeatures::Sqrt,
                ..TreeParams::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(ForestError::InvalidParameter("n_trees must be at least 1".into()));
        }
        self.tree.validate()
    }
}
