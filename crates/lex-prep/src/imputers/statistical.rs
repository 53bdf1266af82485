//! Statistical imputation methods.
//!
//! Provides mean, median and mode filling plus row removal on missing cells.
//! Every method works on one column of the current table state.

use polars::prelude::*;

use crate::error::{EngineError, Result};
use crate::profiler::ColumnClassifier;
use crate::types::ColumnKind;
use crate::utils::{
    float_series, mean, median, missing_mask, mode_first_occurrence, numeric_values, round_to,
    string_series, string_values,
};

/// What a fill changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    /// Number of cells that were missing and are now filled.
    pub filled: usize,
    /// Fill value as written into the column.
    pub value: String,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill missing cells with the column mean, rounded to `precision`.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        precision: usize,
    ) -> Result<FillOutcome> {
        Self::fill_with_statistic(df, col_name, "mean", precision, mean)
    }

    /// Fill missing cells with the column median, rounded to `precision`.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        precision: usize,
    ) -> Result<FillOutcome> {
        Self::fill_with_statistic(df, col_name, "median", precision, median)
    }

    /// Fill missing cells with the most frequent value.
    ///
    /// Ties go to the value that occurs first in the column. Numeric columns
    /// stay numeric; any other column is filled as text.
    pub fn apply_mode_imputation(df: &mut DataFrame, col_name: &str) -> Result<FillOutcome> {
        let series = Self::series(df, col_name)?;

        match ColumnClassifier::classify_series(&series) {
            ColumnKind::Numeric => {
                let values = numeric_values(&series)?;
                // -0.0 and 0.0 count as the same value
                let keys = values
                    .iter()
                    .flatten()
                    .map(|v| (if *v == 0.0 { 0.0f64 } else { *v }).to_bits());
                let (bits, _) = mode_first_occurrence(keys)
                    .ok_or_else(|| EngineError::EmptyColumn(col_name.to_string()))?;
                let mode = f64::from_bits(bits);

                let filled = values.iter().filter(|v| v.is_none()).count();
                let replaced: Vec<Option<f64>> =
                    values.into_iter().map(|v| Some(v.unwrap_or(mode))).collect();
                df.replace(col_name, float_series(col_name, replaced))?;

                Ok(FillOutcome {
                    filled,
                    value: mode.to_string(),
                })
            }
            ColumnKind::Categorical => {
                let values = string_values(&series)?;
                let mask = missing_mask(&series)?;
                let (mode, _) = mode_first_occurrence(
                    values
                        .iter()
                        .zip(&mask)
                        .filter(|(_, missing)| !**missing)
                        .filter_map(|(v, _)| v.clone()),
                )
                .ok_or_else(|| EngineError::EmptyColumn(col_name.to_string()))?;

                let filled = mask.iter().filter(|m| **m).count();
                let replaced: Vec<Option<String>> = values
                    .into_iter()
                    .zip(mask)
                    .map(|(v, missing)| if missing { Some(mode.clone()) } else { v })
                    .collect();
                df.replace(col_name, string_series(col_name, replaced))?;

                Ok(FillOutcome {
                    filled,
                    value: mode,
                })
            }
        }
    }

    /// Delete every row where the column is missing. Works for any type.
    ///
    /// Returns the number of rows removed.
    pub fn remove_missing_rows(df: &mut DataFrame, col_name: &str) -> Result<usize> {
        let series = Self::series(df, col_name)?;
        let keep: Vec<bool> = missing_mask(&series)?.into_iter().map(|m| !m).collect();
        let removed = keep.iter().filter(|k| !**k).count();

        if removed > 0 {
            let mask = BooleanChunked::from_slice("mask".into(), &keep);
            *df = df.filter(&mask)?;
        }

        Ok(removed)
    }

    fn fill_with_statistic(
        df: &mut DataFrame,
        col_name: &str,
        method: &str,
        precision: usize,
        statistic: fn(&[f64]) -> Option<f64>,
    ) -> Result<FillOutcome> {
        let series = Self::series(df, col_name)?;

        ColumnClassifier::require_numeric(&series, &format!("{} imputation", method))?;

        let values = numeric_values(&series)?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let fill_value = statistic(&present)
            .map(|v| round_to(v, precision))
            .ok_or_else(|| EngineError::EmptyColumn(col_name.to_string()))?;

        let filled = values.iter().filter(|v| v.is_none()).count();
        let replaced: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| Some(v.unwrap_or(fill_value)))
            .collect();
        df.replace(col_name, float_series(col_name, replaced))?;

        Ok(FillOutcome {
            filled,
            value: fill_value.to_string(),
        })
    }

    fn series(df: &DataFrame, col_name: &str) -> Result<Series> {
        df.column(col_name)
            .map(|c| c.as_materialized_series().clone())
            .map_err(|_| EngineError::ColumnNotFound(col_name.to_string()))
    }
}
