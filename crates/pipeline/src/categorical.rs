//! One-hot encoding for the content-rating column.
//!
//! Categories are the sorted distinct values seen at fit time. Missing values
//! take the most frequent category. A value never seen at fit time encodes as
//! an all-zero row.

use crate::error::{PipelineError, Result};
use crate::traits::FeatureTransformer;
use data_loader::{CONTENT_RATING_COLUMN, MovieRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Fitted state of the one-hot encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    /// Sorted distinct categories; index is output column
    pub categories: Vec<String>,
    /// Replacement for missing values
    pub fill_value: String,
}

/// Most-frequent imputation followed by one-hot encoding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    table: Option<CategoryTable>,
}

impl CategoricalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> Result<&CategoryTable> {
        self.table
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("CategoricalEncoder"))
    }

    /// Categories in output order
    pub fn categories(&self) -> Result<&[String]> {
        Ok(&self.table()?.categories)
    }

    pub fn is_fitted(&self) -> bool {
        self.table.is_some()
    }

    /// Learn categories and the fill value from a column.
    pub fn fit_column<'a>(&mut self, values: impl IntoIterator<Item = Option<&'a str>>) -> Result<()> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in values.into_iter().flatten() {
            *counts.entry(value).or_default() += 1;
        }
        if counts.is_empty() {
            return Err(PipelineError::EmptyInput(format!(
                "column '{}' has no observed values",
                CONTENT_RATING_COLUMN
            )));
        }

        let mut categories: Vec<String> = counts.keys().map(|c| c.to_string()).collect();
        categories.sort();

        // Highest count wins; ties go to the lexicographically smallest
        let fill_value = categories
            .iter()
            .max_by(|a, b| {
                counts[a.as_str()]
                    .cmp(&counts[b.as_str()])
                    .then_with(|| b.cmp(a))
            })
            .cloned()
            .unwrap_or_default();

        debug!(
            "Fitted {} categories for '{}', fill value '{}'",
            categories.len(),
            CONTENT_RATING_COLUMN,
            fill_value
        );
        self.table = Some(CategoryTable {
            categories,
            fill_value,
        });
        Ok(())
    }

    /// Write the one-hot vector of one value into `out`.
    pub fn encode_value(&self, raw: Option<&str>, out: &mut [f32]) -> Result<()> {
        let table = self.table()?;
        if out.len() != table.categories.len() {
            return Err(PipelineError::WidthMismatch {
                expected: table.categories.len(),
                found: out.len(),
            });
        }

        out.fill(0.0);
        let value = raw.unwrap_or(&table.fill_value);
        if let Ok(idx) = table.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            out[idx] = 1.0;
        }
        Ok(())
    }
}

impl FeatureTransformer for CategoricalEncoder {
    fn name(&self) -> &str {
        CONTENT_RATING_COLUMN
    }

    fn fit(&mut self, rows: &[MovieRecord]) -> Result<()> {
        self.fit_column(rows.iter().map(|row| row.content_rating()))
    }

    fn output_width(&self) -> Result<usize> {
        Ok(self.table()?.categories.len())
    }

    fn feature_names(&self) -> Result<Vec<String>> {
        Ok(self
            .table()?
            .categories
            .iter()
            .map(|c| format!("{}__{}", CONTENT_RATING_COLUMN, c))
            .collect())
    }

    fn encode_into(&self, row: &MovieRecord, out: &mut [f32]) -> Result<()> {
        self.encode_value(row.content_rating(), out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(values: &[Option<&str>]) -> CategoricalEncoder {
        let mut encoder = CategoricalEncoder::new();
        encoder.fit_column(values.iter().copied()).unwrap();
        encoder
    }

    fn encode(encoder: &CategoricalEncoder, raw: Option<&str>) -> Vec<f32> {
        let mut out = vec![0.0; encoder.output_width().unwrap()];
        encoder.encode_value(raw, &mut out).unwrap();
        out
    }

    #[test]
    fn test_categories_sorted() {
        let encoder = fitted(&[Some("R"), Some("PG-13"), Some("G"), Some("R")]);
        assert_eq!(encoder.categories().unwrap(), &["G", "PG-13", "R"]);
        assert_eq!(
            encoder.feature_names().unwrap(),
            vec!["content_rating__G", "content_rating__PG-13", "content_rating__R"]
        );
    }

    #[test]
    fn test_missing_takes_most_frequent() {
        let encoder = fitted(&[Some("R"), Some("PG"), Some("R"), None]);
        assert_eq!(encoder.table().unwrap().fill_value, "R");
        assert_eq!(encode(&encoder, None), vec![0.0, 1.0]);
    }

    #[test]
    fn test_fill_value_tie_breaks_lexicographically() {
        let encoder = fitted(&[Some("R"), Some("G"), Some("PG"), Some("R"), Some("G")]);
        assert_eq!(encoder.table().unwrap().fill_value, "G");
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let encoder = fitted(&[Some("R"), Some("PG")]);
        assert_eq!(encode(&encoder, Some("NC-17")), vec![0.0, 0.0]);
        assert_eq!(encode(&encoder, Some("PG")), vec![1.0, 0.0]);
    }

    #[test]
    fn test_all_missing_is_empty_input() {
        let mut encoder = CategoricalEncoder::new();
        let err = encoder.fit_column([None, None]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput(_)));
    }

    #[test]
    fn test_not_fitted() {
        let encoder = CategoricalEncoder::new();
        assert!(matches!(
            encoder.output_width(),
            Err(PipelineError::NotFitted { .. })
        ));
    }
}
