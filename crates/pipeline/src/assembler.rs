//! Composite feature block: numeric, then content rating, then genres.
//!
//! The assembler owns one encoder per block and lays their outputs side by
//! side in that fixed order. After fit it records the concatenated column
//! names; the same list is persisted as `feature_columns` in the metadata
//! and checked again whenever a pipeline is loaded.

use crate::categorical::CategoricalEncoder;
use crate::error::{PipelineError, Result};
use crate::genres::{GenreVocabulary, GenresEncoder};
use crate::numeric::NumericImputer;
use crate::traits::FeatureTransformer;
use data_loader::MovieRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fits and applies every feature block in a fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAssembler {
    numeric: NumericImputer,
    categorical: CategoricalEncoder,
    genres: GenresEncoder,
    columns: Option<Vec<String>>,
}

impl FeatureAssembler {
    pub fn new(numeric: NumericImputer, categorical: CategoricalEncoder, genres: GenresEncoder) -> Self {
        Self {
            numeric,
            categorical,
            genres,
            columns: None,
        }
    }

    /// Assembler whose genre block uses an explicit vocabulary
    pub fn with_genre_vocabulary(tokens: Vec<String>, top_k: usize) -> Self {
        Self::new(
            NumericImputer::default(),
            CategoricalEncoder::new(),
            GenresEncoder::with_vocabulary(tokens, top_k),
        )
    }

    fn blocks(&self) -> [&dyn FeatureTransformer; 3] {
        [&self.numeric, &self.categorical, &self.genres]
    }

    /// Column names recorded at fit
    pub fn column_names(&self) -> Result<&[String]> {
        self.columns
            .as_deref()
            .ok_or_else(|| PipelineError::not_fitted("FeatureAssembler"))
    }

    pub fn is_fitted(&self) -> bool {
        self.columns.is_some()
    }

    pub fn genres_vocabulary(&self) -> Result<&GenreVocabulary> {
        self.genres.vocabulary()
    }

    pub fn content_ratings(&self) -> Result<&[String]> {
        self.categorical.categories()
    }

    pub fn numeric(&self) -> &NumericImputer {
        &self.numeric
    }

    /// Encode a single row into a fresh vector.
    pub fn transform_one(&self, row: &MovieRecord) -> Result<Vec<f32>> {
        let mut out = vec![0.0; self.output_width()?];
        self.encode_into(row, &mut out)?;
        Ok(out)
    }

    /// Fail unless the recorded columns still match what the blocks produce.
    pub fn check_consistency(&self) -> Result<()> {
        let recorded = self.column_names()?;
        let mut produced = Vec::with_capacity(recorded.len());
        for block in self.blocks() {
            produced.extend(block.feature_names()?);
        }
        if produced.len() != recorded.len() {
            return Err(PipelineError::WidthMismatch {
                expected: recorded.len(),
                found: produced.len(),
            });
        }
        if produced != recorded {
            return Err(PipelineError::config(
                "feature columns do not match the fitted encoders",
            ));
        }
        Ok(())
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new(
            NumericImputer::default(),
            CategoricalEncoder::new(),
            GenresEncoder::default(),
        )
    }
}

impl FeatureTransformer for FeatureAssembler {
    fn name(&self) -> &str {
        "assembler"
    }

    fn fit(&mut self, rows: &[MovieRecord]) -> Result<()> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyInput("no rows to fit features on".into()));
        }
        self.numeric.fit(rows)?;
        self.categorical.fit(rows)?;
        self.genres.fit(rows)?;

        let mut columns = Vec::new();
        for block in self.blocks() {
            columns.extend(block.feature_names()?);
        }
        info!(
            "Assembled {} feature columns ({} numeric, {} categorical, {} genre)",
            columns.len(),
            self.numeric.output_width()?,
            self.categorical.output_width()?,
            self.genres.output_width()?
        );
        self.columns = Some(columns);
        Ok(())
    }

    fn output_width(&self) -> Result<usize> {
        Ok(self.column_names()?.len())
    }

    fn feature_names(&self) -> Result<Vec<String>> {
        Ok(self.column_names()?.to_vec())
    }

    fn encode_into(&self, row: &MovieRecord, out: &mut [f32]) -> Result<()> {
        let width = self.output_width()?;
        if out.len() != width {
            return Err(PipelineError::WidthMismatch {
                expected: width,
                found: out.len(),
            });
        }

        let mut rest = out;
        for block in self.blocks() {
            let (head, tail) = rest.split_at_mut(block.output_width()?);
            block.encode_into(row, head)?;
            rest = tail;
        }
        Ok(())
    }
}
