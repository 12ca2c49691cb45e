//! Core traits for feature encoding.
//!
//! This module defines the FeatureTransformer trait that every per-column
//! encoder implements, so the FeatureAssembler can compose them in a
//! declared, named-field order.

use crate::error::Result;
use data_loader::MovieRecord;
use ndarray::Array2;
use rayon::prelude::*;

/// A fit-then-transform encoder over named fields of a MovieRecord.
///
/// ## Design Note
/// - `Send + Sync` lets a fitted encoder be shared across request handlers
///   and used from rayon workers
/// - `encode_into` writes one row into a caller-owned slice, so composite
///   encoders can lay several blocks side by side without copying
/// - `transform` is provided on top of `encode_into` and runs rows in parallel
pub trait FeatureTransformer: Send + Sync {
    /// Returns the name of this encoder (for logging/debugging)
    fn name(&self) -> &str;

    /// Learn encoder state from training rows.
    fn fit(&mut self, rows: &[MovieRecord]) -> Result<()>;

    /// Number of output columns. Fails with `NotFitted` before `fit`.
    fn output_width(&self) -> Result<usize>;

    /// Column names, one per output column, in output order.
    fn feature_names(&self) -> Result<Vec<String>>;

    /// Encode a single row into `out`, which must be exactly `output_width()` long.
    fn encode_into(&self, row: &MovieRecord, out: &mut [f32]) -> Result<()>;

    /// Encode many rows into a dense `rows x output_width()` matrix, in input order.
    fn transform(&self, rows: &[MovieRecord]) -> Result<Array2<f32>> {
        let width = self.output_width()?;
        let mut data = vec![0.0f32; rows.len() * width];

        if width > 0 {
            data.par_chunks_mut(width)
                .zip(rows.par_iter())
                .try_for_each(|(out, row)| self.encode_into(row, out))?;
        }

        Ok(Array2::from_shape_vec((rows.len(), width), data)?)
    }
}
