//! Data profiling module for dataset inspection.
//!
//! This module provides:
//! - Column type inference ([`ColumnClassifier`])
//! - Descriptive statistics for one column
//! - Dataset insights (shape, dtypes, numeric summaries, missing values) and
//!   bounded previews

mod statistics;
mod type_inference;

pub use statistics::{CategoricalSummary, NumericSummary};
pub use type_inference::ColumnClassifier;

use indexmap::IndexMap;
use polars::prelude::*;

use crate::error::Result;
use crate::types::{ColumnKind, DatasetInsights, DatasetPreview};
use crate::utils::{missing_count, string_values};

/// Dataset-level profiling.
pub struct DataProfiler;

impl DataProfiler {
    /// Shape, dtypes, per-column missing counts and a summary of every
    /// column classified as numeric.
    pub fn insights(df: &DataFrame) -> Result<DatasetInsights> {
        let mut column_dtypes = IndexMap::new();
        let mut describe = IndexMap::new();
        let mut missing_values = IndexMap::new();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().to_string();
            column_dtypes.insert(name.clone(), series.dtype().to_string());

            if ColumnClassifier::classify_series(series) == ColumnKind::Numeric {
                let summary = NumericSummary::from_series(series)?;
                describe.insert(name.clone(), summary.describe());
            }

            let missing = missing_count(series)?;
            if missing > 0 {
                missing_values.insert(name, missing);
            }
        }

        Ok(DatasetInsights {
            rows: df.height(),
            columns: df.width(),
            column_dtypes,
            describe,
            missing_values,
        })
    }

    /// First `max_rows` rows rendered as strings.
    pub fn preview(df: &DataFrame, max_rows: usize) -> Result<DatasetPreview> {
        let head = df.head(Some(max_rows));
        let columns: Vec<String> = head
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rendered = Vec::with_capacity(head.width());
        for column in head.get_columns() {
            rendered.push(string_values(column.as_materialized_series())?);
        }

        let rows = (0..head.height())
            .map(|row| {
                rendered
                    .iter()
                    .map(|values| values.get(row).cloned().flatten())
                    .collect()
            })
            .collect();

        Ok(DatasetPreview {
            columns,
            rows,
            total_rows: df.height(),
        })
    }
}
