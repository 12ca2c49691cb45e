//! Request validation.
//!
//! Everything here runs before the pipeline sees a row. Numeric bounds are
//! checked first and reported as 422; a content rating the model was not
//! trained on is reported as 400.

use std::ops::RangeInclusive;

use data_loader::MovieRecord;
use pipeline::ModelMetadata;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub const DURATION_RANGE: RangeInclusive<i64> = 1..=400;
pub const TITLE_YEAR_RANGE: RangeInclusive<i64> = 1900..=2030;

/// Body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Runtime in minutes
    pub duration: i64,
    pub budget: i64,
    pub title_year: i64,
    pub genres: Vec<String>,
    pub content_rating: String,
}

impl PredictRequest {
    /// Check the request against declared bounds and the model's metadata,
    /// and turn it into a pipeline row.
    pub fn validate(&self, metadata: &ModelMetadata) -> ApiResult<MovieRecord> {
        check_range("duration", self.duration, &DURATION_RANGE)?;
        if self.budget < 0 {
            return Err(ApiError::validation(format!(
                "budget must be >= 0, got {}",
                self.budget
            )));
        }
        check_range("title_year", self.title_year, &TITLE_YEAR_RANGE)?;

        if !metadata.allows_content_rating(&self.content_rating) {
            return Err(ApiError::bad_request(format!(
                "content_rating '{}' not allowed",
                self.content_rating
            )));
        }

        Ok(MovieRecord {
            duration: Some(self.duration as f64),
            budget: Some(self.budget as f64),
            title_year: Some(self.title_year as f64),
            content_rating: Some(self.content_rating.clone()),
            genres: join_genres(&self.genres),
        })
    }
}

fn check_range(field: &str, value: i64, range: &RangeInclusive<i64>) -> ApiResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "{} must be in [{}, {}], got {}",
            field,
            range.start(),
            range.end(),
            value
        )))
    }
}

/// Trim each tag, drop empty ones and join with `|`; `None` when nothing is left.
pub fn join_genres(genres: &[String]) -> Option<String> {
    let joined = genres
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect::<Vec<_>>()
        .join("|");
    if joined.is_empty() { None } else { Some(joined) }
}
