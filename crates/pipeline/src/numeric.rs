//! Median imputation for the numeric block.
//!
//! Each numeric field is passed through unchanged when present and replaced
//! by the training median when missing. Medians are learned per field name,
//! so the block never depends on column position.

use crate::error::{PipelineError, Result};
use crate::traits::FeatureTransformer;
use data_loader::{MovieRecord, NumericField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Median imputer over a declared list of numeric fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericImputer {
    fields: Vec<NumericField>,
    medians: Option<BTreeMap<String, f64>>,
}

impl NumericImputer {
    pub fn new(fields: Vec<NumericField>) -> Self {
        Self {
            fields,
            medians: None,
        }
    }

    /// Fields in output order
    pub fn fields(&self) -> &[NumericField] {
        &self.fields
    }

    /// Fill value of a field after fit
    pub fn median(&self, field: NumericField) -> Result<f64> {
        let medians = self.medians()?;
        medians
            .get(field.name())
            .copied()
            .ok_or_else(|| PipelineError::config(format!("no median recorded for '{}'", field.name())))
    }

    pub fn medians(&self) -> Result<&BTreeMap<String, f64>> {
        self.medians
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("NumericImputer"))
    }

    pub fn is_fitted(&self) -> bool {
        self.medians.is_some()
    }
}

impl Default for NumericImputer {
    fn default() -> Self {
        Self::new(NumericField::ALL.to_vec())
    }
}

impl FeatureTransformer for NumericImputer {
    fn name(&self) -> &str {
        "numeric"
    }

    fn fit(&mut self, rows: &[MovieRecord]) -> Result<()> {
        let mut medians = BTreeMap::new();
        for &field in &self.fields {
            let mut observed: Vec<f64> = rows
                .iter()
                .filter_map(|row| row.numeric(field))
                .filter(|v| v.is_finite())
                .collect();

            let fill = match median(&mut observed) {
                Some(value) => value,
                None => {
                    warn!("Column '{}' has no observed values; imputing 0.0", field.name());
                    0.0
                }
            };
            debug!("Median for '{}' = {}", field.name(), fill);
            medians.insert(field.name().to_string(), fill);
        }
        self.medians = Some(medians);
        Ok(())
    }

    fn output_width(&self) -> Result<usize> {
        self.medians()?;
        Ok(self.fields.len())
    }

    fn feature_names(&self) -> Result<Vec<String>> {
        self.medians()?;
        Ok(self.fields.iter().map(|f| f.name().to_string()).collect())
    }

    fn encode_into(&self, row: &MovieRecord, out: &mut [f32]) -> Result<()> {
        if out.len() != self.fields.len() {
            return Err(PipelineError::WidthMismatch {
                expected: self.fields.len(),
                found: out.len(),
            });
        }
        for (slot, &field) in out.iter_mut().zip(&self.fields) {
            let value = match row.numeric(field).filter(|v| v.is_finite()) {
                Some(v) => v,
                None => self.median(field)?,
            };
            *slot = value as f32;
        }
        Ok(())
    }
}

/// Median of a sample, averaging the two middle values for even lengths.
pub(crate) fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(duration: Option<f64>, budget: Option<f64>, year: Option<f64>) -> MovieRecord {
        MovieRecord {
            duration,
            budget,
            title_year: year,
            ..Default::default()
        }
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_missing_values_take_training_median() {
        let rows = vec![
            row(Some(90.0), Some(1e6), Some(2000.0)),
            row(Some(120.0), None, Some(2010.0)),
            row(None, Some(3e6), Some(2004.0)),
        ];
        let mut imputer = NumericImputer::default();
        imputer.fit(&rows).unwrap();

        let mut out = [0.0f32; 3];
        imputer.encode_into(&MovieRecord::default(), &mut out).unwrap();
        assert_eq!(out, [105.0, 2e6, 2004.0]);

        imputer.encode_into(&rows[0], &mut out).unwrap();
        assert_eq!(out, [90.0, 1e6, 2000.0]);
    }

    #[test]
    fn test_all_missing_column_imputes_zero() {
        let rows = vec![row(Some(100.0), None, None), row(Some(110.0), None, None)];
        let mut imputer = NumericImputer::default();
        imputer.fit(&rows).unwrap();

        assert_eq!(imputer.median(NumericField::Budget).unwrap(), 0.0);
        let matrix = imputer.transform(&rows).unwrap();
        assert_eq!(matrix.row(1).to_vec(), vec![110.0, 0.0, 0.0]);
    }

    #[test]
    fn test_not_fitted() {
        let imputer = NumericImputer::default();
        assert!(matches!(
            imputer.output_width(),
            Err(PipelineError::NotFitted { .. })
        ));
        let mut out = [0.0f32; 3];
        assert!(imputer.encode_into(&MovieRecord::default(), &mut out).is_err());
    }

    #[test]
    fn test_feature_names_follow_field_order() {
        let mut imputer = NumericImputer::new(vec![NumericField::TitleYear, NumericField::Duration]);
        imputer.fit(&[row(Some(1.0), None, Some(2.0))]).unwrap();
        assert_eq!(imputer.feature_names().unwrap(), vec!["title_year", "duration"]);

        let mut out = [0.0f32; 2];
        imputer.encode_into(&row(Some(1.0), None, Some(2.0)), &mut out).unwrap();
        assert_eq!(out, [2.0, 1.0]);
    }
}
