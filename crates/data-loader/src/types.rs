//! Core domain types for the movie metadata table.
//!
//! This module defines the row shape every other crate agrees on.
//! Key Rust concepts demonstrated here:
//! - Enums with associated constants for a closed set of fields
//! - `Option<T>` for values that may be missing in the source data
//! - Derive macros for common traits

use serde::{Deserialize, Serialize};

// =============================================================================
// Column names
// =============================================================================

/// Header name of the continuous target column
pub const TARGET_COLUMN: &str = "imdb_score";

/// Header name of the categorical content-rating column
pub const CONTENT_RATING_COLUMN: &str = "content_rating";

/// Header name of the pipe-delimited genre column
pub const GENRES_COLUMN: &str = "genres";

/// Content rating assigned to rows where the source value is missing
pub const UNRATED: &str = "Unrated";

// =============================================================================
// Numeric fields
// =============================================================================

/// The numeric columns of the feature schema.
///
/// The declaration order here is the column order of the numeric block
/// in every assembled feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Duration,
    Budget,
    TitleYear,
}

impl NumericField {
    /// All numeric fields in schema order
    pub const ALL: [NumericField; 3] = [
        NumericField::Duration,
        NumericField::Budget,
        NumericField::TitleYear,
    ];

    /// Column name as it appears in the CSV header and in persisted metadata
    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Duration => "duration",
            NumericField::Budget => "budget",
            NumericField::TitleYear => "title_year",
        }
    }

    /// Look a field up by its column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

// =============================================================================
// MovieRecord
// =============================================================================

/// One raw movie row with named fields.
///
/// Every field is optional: the loader maps unparseable numbers to `None`,
/// and encoders downstream decide how missing values are imputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Runtime in minutes
    pub duration: Option<f64>,
    /// Production budget in the source currency
    pub budget: Option<f64>,
    /// Release year
    pub title_year: Option<f64>,
    /// Content rating such as "PG-13"
    pub content_rating: Option<String>,
    /// Raw pipe-delimited genre tags, e.g. "Action|Adventure|Sci-Fi"
    pub genres: Option<String>,
}

impl MovieRecord {
    /// Read a numeric field by name rather than position
    pub fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Duration => self.duration,
            NumericField::Budget => self.budget,
            NumericField::TitleYear => self.title_year,
        }
    }

    /// Borrow the content rating, if present
    pub fn content_rating(&self) -> Option<&str> {
        self.content_rating.as_deref()
    }

    /// Borrow the raw genre string, if present
    pub fn genres(&self) -> Option<&str> {
        self.genres.as_deref()
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Cleaned training table: feature rows plus the continuous target.
///
/// `records[i]` and `targets[i]` always describe the same movie.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<MovieRecord>,
    pub targets: Vec<f64>,
}

impl Dataset {
    /// Creates a new, empty Dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one labeled row
    pub fn push(&mut self, record: MovieRecord, target: f64) {
        self.records.push(record);
        self.targets.push(target);
    }

    /// Number of labeled rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
