//! Multi-hot encoding for the pipe-delimited genre column.
//!
//! A raw value such as `"Action| Adventure |Sci-Fi"` is split on `|`, each
//! tag is trimmed, and empty tags are discarded. The encoder fits a bounded
//! [`GenreVocabulary`] and maps every row to a vector with one slot per
//! vocabulary token:
//!
//! - width is always the vocabulary length, whatever the row contains
//! - tokens outside the vocabulary are ignored
//! - repeated tokens set the same slot once (set semantics, not counts)
//!
//! Matching is exact after trimming. `"sci-fi"` and `"Sci-Fi"` are different
//! tokens.

use crate::error::{PipelineError, Result};
use crate::traits::FeatureTransformer;
use data_loader::{GENRES_COLUMN, MovieRecord};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Default cap on the number of genre tokens kept at fit time
pub const DEFAULT_TOP_GENRES: usize = 30;

/// Split a raw genre value into trimmed, non-empty tags.
///
/// Example: " Action||Drama " -> ["Action", "Drama"]
pub fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('|').map(str::trim).filter(|tag| !tag.is_empty())
}

// =============================================================================
// GenreVocabulary
// =============================================================================

/// Ordered, duplicate-free list of genre tokens.
///
/// The index of a token is its output column within the genre block, and
/// never changes once the vocabulary is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct GenreVocabulary {
    tokens: Vec<String>,
    positions: HashMap<String, usize>,
}

impl GenreVocabulary {
    /// Keep the `top_k` most frequent tags of a column.
    ///
    /// Ties are broken by first appearance in the column, so the result
    /// depends only on the data, never on hash ordering.
    pub fn from_frequencies<'a>(
        values: impl IntoIterator<Item = Option<&'a str>>,
        top_k: usize,
    ) -> Self {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, usize)> = Vec::new();

        for tag in values.into_iter().flatten().flat_map(split_tags) {
            match slots.get(tag) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    slots.insert(tag, counts.len());
                    counts.push((tag, 1));
                }
            }
        }

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(top_k);
        counts.into_iter().map(|(tag, _)| tag.to_string()).collect::<Vec<_>>().into()
    }

    /// Use a caller-supplied list, de-duplicated in first-occurrence order.
    pub fn explicit(tokens: Vec<String>, top_k: usize) -> Result<Self> {
        let vocabulary = Self::from(tokens);
        if vocabulary.len() > top_k {
            return Err(PipelineError::config(format!(
                "explicit genre vocabulary has {} tokens but the cap is {}",
                vocabulary.len(),
                top_k
            )));
        }
        Ok(vocabulary)
    }

    /// Tokens in column order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Column of a token within the genre block
    pub fn position(&self, token: &str) -> Option<usize> {
        self.positions.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<String>> for GenreVocabulary {
    fn from(raw: Vec<String>) -> Self {
        let mut tokens = Vec::with_capacity(raw.len());
        let mut positions = HashMap::with_capacity(raw.len());
        for token in raw {
            if !positions.contains_key(&token) {
                positions.insert(token.clone(), tokens.len());
                tokens.push(token);
            }
        }
        Self { tokens, positions }
    }
}

impl From<GenreVocabulary> for Vec<String> {
    fn from(vocabulary: GenreVocabulary) -> Self {
        vocabulary.tokens
    }
}

impl PartialEq for GenreVocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for GenreVocabulary {}

// =============================================================================
// GenresEncoder
// =============================================================================

/// Stateful multi-hot encoder for the genre column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenresEncoder {
    top_k: usize,
    explicit: Option<Vec<String>>,
    vocabulary: Option<GenreVocabulary>,
}

impl GenresEncoder {
    /// Encoder that learns the `top_k` most frequent tags at fit time
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            explicit: None,
            vocabulary: None,
        }
    }

    /// Encoder that adopts a fixed vocabulary at fit time
    pub fn with_vocabulary(tokens: Vec<String>, top_k: usize) -> Self {
        Self {
            top_k,
            explicit: Some(tokens),
            vocabulary: None,
        }
    }

    /// Build the vocabulary from a column of raw genre values.
    pub fn fit_column<'a>(&mut self, values: impl IntoIterator<Item = Option<&'a str>>) -> Result<()> {
        let vocabulary = match &self.explicit {
            Some(tokens) => GenreVocabulary::explicit(tokens.clone(), self.top_k)?,
            None => GenreVocabulary::from_frequencies(values, self.top_k),
        };
        debug!("Fitted genre vocabulary with {} tokens", vocabulary.len());
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    /// The fitted vocabulary
    pub fn vocabulary(&self) -> Result<&GenreVocabulary> {
        self.vocabulary
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("GenresEncoder"))
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// Write the multi-hot vector of one raw value into `out`.
    pub fn encode_value(&self, raw: Option<&str>, out: &mut [f32]) -> Result<()> {
        let vocabulary = self.vocabulary()?;
        if out.len() != vocabulary.len() {
            return Err(PipelineError::WidthMismatch {
                expected: vocabulary.len(),
                found: out.len(),
            });
        }

        out.fill(0.0);
        for tag in raw.into_iter().flat_map(split_tags) {
            if let Some(idx) = vocabulary.position(tag) {
                out[idx] = 1.0;
            }
        }
        Ok(())
    }

    /// Multi-hot vector of one raw value
    pub fn encode(&self, raw: Option<&str>) -> Result<Vec<f32>> {
        let mut out = vec![0.0; self.vocabulary()?.len()];
        self.encode_value(raw, &mut out)?;
        Ok(out)
    }

    /// One multi-hot row per input value, in input order.
    pub fn transform_column<'a>(&self, values: &[Option<&'a str>]) -> Result<Array2<f32>> {
        let vocabulary = self.vocabulary()?;
        let mut matrix = Array2::zeros((values.len(), vocabulary.len()));
        for (mut row, value) in matrix.rows_mut().into_iter().zip(values) {
            for tag in value.iter().flat_map(|raw| split_tags(*raw)) {
                if let Some(idx) = vocabulary.position(tag) {
                    row[idx] = 1.0;
                }
            }
        }
        Ok(matrix)
    }
}

impl Default for GenresEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_GENRES)
    }
}

impl FeatureTransformer for GenresEncoder {
    fn name(&self) -> &str {
        GENRES_COLUMN
    }

    fn fit(&mut self, rows: &[MovieRecord]) -> Result<()> {
        self.fit_column(rows.iter().map(|row| row.genres()))
    }

    fn output_width(&self) -> Result<usize> {
        Ok(self.vocabulary()?.len())
    }

    fn feature_names(&self) -> Result<Vec<String>> {
        Ok(self
            .vocabulary()?
            .tokens()
            .iter()
            .map(|token| format!("genre__{}", token))
            .collect())
    }

    fn encode_into(&self, row: &MovieRecord, out: &mut [f32]) -> Result<()> {
        self.encode_value(row.genres(), out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(column: &[&str]) -> GenresEncoder {
        let mut encoder = GenresEncoder::new(DEFAULT_TOP_GENRES);
        encoder.fit_column(column.iter().map(|v| Some(*v))).unwrap();
        encoder
    }

    #[test]
    fn test_split_tags_trims_and_skips_empty() {
        let tags: Vec<&str> = split_tags(" Action||Drama | ").collect();
        assert_eq!(tags, vec!["Action", "Drama"]);
        assert_eq!(split_tags("").count(), 0);
    }

    #[test]
    fn test_vocabulary_orders_by_frequency_then_first_seen() {
        let encoder = fitted(&["Drama|Comedy", "Action|Comedy", "Action", "Horror|Comedy"]);
        let vocab = encoder.vocabulary().unwrap();
        assert_eq!(vocab.tokens(), &["Comedy", "Action", "Drama", "Horror"]);
    }

    #[test]
    fn test_vocabulary_respects_top_k() {
        let mut encoder = GenresEncoder::new(2);
        encoder
            .fit_column(["A|B|C", "A|B", "A"].iter().map(|v| Some(*v)))
            .unwrap();
        assert_eq!(encoder.vocabulary().unwrap().tokens(), &["A", "B"]);
    }

    #[test]
    fn test_explicit_vocabulary_dedups_and_ignores_data() {
        let mut encoder = GenresEncoder::with_vocabulary(
            vec!["Drama".into(), "Action".into(), "Drama".into()],
            DEFAULT_TOP_GENRES,
        );
        encoder.fit_column([Some("Western")]).unwrap();
        assert_eq!(encoder.vocabulary().unwrap().tokens(), &["Drama", "Action"]);
    }

    #[test]
    fn test_explicit_vocabulary_over_cap_is_rejected() {
        let mut encoder = GenresEncoder::with_vocabulary(vec!["A".into(), "B".into(), "C".into()], 2);
        let err = encoder.fit_column(std::iter::empty()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_transform_before_fit_is_not_fitted() {
        let encoder = GenresEncoder::default();
        assert!(matches!(
            encoder.encode(Some("Action")),
            Err(PipelineError::NotFitted { .. })
        ));
        assert!(matches!(
            encoder.transform_column(&[Some("Action")]),
            Err(PipelineError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_width_is_vocabulary_length_for_any_row() {
        let encoder = fitted(&["Action|Drama", "Comedy"]);
        let width = encoder.vocabulary().unwrap().len();

        for raw in [None, Some(""), Some("Action"), Some("Action|Drama|Comedy|Western|Noir")] {
            assert_eq!(encoder.encode(raw).unwrap().len(), width);
        }
    }

    #[test]
    fn test_unknown_tags_are_ignored() {
        let encoder = fitted(&["Action|Drama"]);
        assert_eq!(encoder.encode(Some("Western|Musical")).unwrap(), vec![0.0, 0.0]);
        assert_eq!(encoder.encode(Some("Western|Drama")).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_duplicates_match_single_occurrence() {
        let encoder = fitted(&["Comedy|Drama"]);
        assert_eq!(
            encoder.encode(Some("Comedy|Comedy")).unwrap(),
            encoder.encode(Some("Comedy")).unwrap()
        );
    }

    #[test]
    fn test_encoding_is_repeatable() {
        let encoder = fitted(&["Action|Drama", "Comedy|Drama"]);
        let first = encoder.encode(Some("Drama|Action")).unwrap();
        let second = encoder.encode(Some("Drama|Action")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let encoder = fitted(&["Sci-Fi"]);
        assert_eq!(encoder.encode(Some("sci-fi")).unwrap(), vec![0.0]);
        assert_eq!(encoder.encode(Some(" Sci-Fi ")).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_transform_column_matches_row_encoding() {
        let encoder = fitted(&["Action|Drama", "Comedy"]);
        let column = [Some("Drama"), None, Some("Comedy|Action")];
        let matrix = encoder.transform_column(&column).unwrap();

        assert_eq!(matrix.nrows(), 3);
        for (row, raw) in matrix.rows().into_iter().zip(column) {
            assert_eq!(row.to_vec(), encoder.encode(raw).unwrap());
        }
    }

    #[test]
    fn test_vocabulary_serde_keeps_order() {
        let encoder = fitted(&["B|A", "A|C", "C|A"]);
        let vocab = encoder.vocabulary().unwrap();
        let json = serde_json::to_string(vocab).unwrap();
        assert_eq!(json, r#"["A","C","B"]"#);

        let restored: GenreVocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, vocab);
        assert_eq!(restored.position("B"), Some(2));
    }

    #[test]
    fn test_feature_names() {
        let encoder = fitted(&["Action|Drama"]);
        assert_eq!(
            encoder.feature_names().unwrap(),
            vec!["genre__Action".to_string(), "genre__Drama".to_string()]
        );
    }
}
