//! # Data Loader Crate
//!
//! This crate loads and cleans the movie metadata table used to train the
//! audience-score model.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (MovieRecord, NumericField, Dataset)
//! - **parser**: Parse the CSV into Rust structs, cleaning columns on the way
//! - **dataset**: Load a Dataset from disk and summarize its columns
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Dataset, NumericField};
//! use std::path::Path;
//!
//! let dataset = Dataset::load_csv(Path::new("data/movie_metadata.csv"))?;
//! let (min, max) = dataset.numeric_range(NumericField::Duration).unwrap();
//!
//! println!("{} movies, runtimes {}..{}", dataset.len(), min, max);
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod dataset;

// Re-export commonly used types for convenience
pub use dataset::load_movies;
pub use error::{DataLoadError, Result};
pub use types::{
    Dataset, MovieRecord, NumericField, CONTENT_RATING_COLUMN, GENRES_COLUMN, TARGET_COLUMN,
    UNRATED,
};
