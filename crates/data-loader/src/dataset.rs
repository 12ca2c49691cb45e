//! Dataset loading and summary statistics.
//!
//! This module builds a cleaned [`Dataset`] from a CSV file and computes
//! the column summaries that end up in the persisted model metadata:
//! - numeric min/max ranges
//! - observed content ratings, most frequent first
//! - observed target range

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Load and clean a movie metadata CSV into a [`Dataset`].
pub fn load_movies(path: impl AsRef<Path>) -> Result<Dataset> {
    Dataset::load_csv(path.as_ref())
}

impl Dataset {
    /// Load and clean a movie metadata CSV.
    ///
    /// Steps:
    /// 1. Read the file (UTF-8, falling back to Latin-1)
    /// 2. Parse rows, dropping those without a numeric target
    /// 3. Validate the result is non-empty and aligned
    pub fn load_csv(path: &Path) -> Result<Self> {
        info!("Loading movie metadata from {:?}", path);
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let text = parser::read_text(path)?;
        let table = parser::parse_movies(&text, &file)?;

        if table.dropped_rows > 0 {
            warn!(
                "Dropped {} rows from {} without a numeric {}",
                table.dropped_rows, file, TARGET_COLUMN
            );
        }

        let dataset = table.dataset;
        if dataset.is_empty() {
            return Err(DataLoadError::EmptyDataset { file });
        }
        dataset.validate()?;

        info!("Loaded {} labeled rows from {}", dataset.len(), file);
        Ok(dataset)
    }

    /// Min and max of the observed (non-missing) values of a numeric field
    pub fn numeric_range(&self, field: NumericField) -> Option<(f64, f64)> {
        min_max(self.records.iter().filter_map(|r| r.numeric(field)))
    }

    /// `[min, max]` of every numeric field, truncated to integers.
    ///
    /// A field with no observed values reports `[0, 0]`.
    pub fn numeric_ranges(&self) -> BTreeMap<String, [i64; 2]> {
        NumericField::ALL
            .iter()
            .map(|&field| {
                let (lo, hi) = self.numeric_range(field).unwrap_or((0.0, 0.0));
                (field.name().to_string(), [lo as i64, hi as i64])
            })
            .collect()
    }

    /// Min and max of the target column
    pub fn target_range(&self) -> Option<(f64, f64)> {
        min_max(self.targets.iter().copied())
    }

    /// Content ratings with their row counts, most frequent first.
    ///
    /// Ties keep the order in which the ratings first appear.
    pub fn content_rating_counts(&self) -> Vec<(String, usize)> {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();

        for rating in self.records.iter().filter_map(|r| r.content_rating()) {
            match first_seen.get(rating) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    first_seen.insert(rating, counts.len());
                    counts.push((rating.to_string(), 1));
                }
            }
        }

        // Stable sort keeps first-appearance order among equal counts
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - every record has a target
    /// - every target is finite
    pub fn validate(&self) -> Result<()> {
        if self.records.len() != self.targets.len() {
            return Err(DataLoadError::ValidationError(format!(
                "{} records but {} targets",
                self.records.len(),
                self.targets.len()
            )));
        }
        if let Some(pos) = self.targets.iter().position(|t| !t.is_finite()) {
            return Err(DataLoadError::ValidationError(format!(
                "non-finite target at row {}",
                pos
            )));
        }
        Ok(())
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
