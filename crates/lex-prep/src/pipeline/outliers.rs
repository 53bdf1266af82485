//! Outlier handling module.
//!
//! Removes rows whose value in a numeric column lies outside the IQR fences.

use polars::prelude::*;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::profiler::ColumnClassifier;
use crate::utils::{iqr_fences, numeric_values};

/// Result of one column's outlier pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierOutcome {
    pub removed: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Handles outlier detection and treatment.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Remove rows containing outliers in `col_name` using the IQR method.
    ///
    /// Fences are computed from the column's current values. Rows where the
    /// column is missing are kept.
    pub fn remove_outliers(
        df: &mut DataFrame,
        col_name: &str,
        multiplier: f64,
    ) -> Result<OutlierOutcome> {
        let series = df
            .column(col_name)
            .map_err(|_| EngineError::ColumnNotFound(col_name.to_string()))?
            .as_materialized_series()
            .clone();

        ColumnClassifier::require_numeric(&series, "outlier removal")?;

        let values = numeric_values(&series)?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let (lower, upper) = iqr_fences(&present, multiplier)
            .ok_or_else(|| EngineError::EmptyColumn(col_name.to_string()))?;

        let mask_values: Vec<bool> = values
            .iter()
            .map(|v| match v {
                Some(val) => *val >= lower && *val <= upper,
                None => true, // Keep null values
            })
            .collect();
        let removed = mask_values.iter().filter(|keep| !**keep).count();

        if removed > 0 {
            let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
            *df = df.filter(&mask)?;
        }

        debug!(
            "Outlier fences for {}: [{}, {}], removed {} rows",
            col_name, lower, upper, removed
        );

        Ok(OutlierOutcome {
            removed,
            lower,
            upper,
        })
    }
}
