//! Column type inference.
//!
//! A column is numeric iff it has at least one non-missing cell and every
//! non-missing cell is a number. Anything else is categorical.

use polars::prelude::*;

use crate::error::{EngineError, Result};
use crate::types::{ColumnKind, ColumnTyping};
use crate::utils::{is_numeric_dtype, is_numeric_literal, missing_mask, numeric_values};

/// Partitions dataset columns into numeric and categorical.
pub struct ColumnClassifier;

impl ColumnClassifier {
    /// Classify every column of a dataset. Total: never fails.
    pub fn classify(df: &DataFrame) -> ColumnTyping {
        let mut typing = ColumnTyping::default();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().to_string();
            match Self::classify_series(series) {
                ColumnKind::Numeric => typing.numeric.push(name.clone()),
                ColumnKind::Categorical => typing.categorical.push(name.clone()),
            }
            typing.all.push(name);
        }

        typing
    }

    /// Classify a single column.
    pub fn classify_series(series: &Series) -> ColumnKind {
        if is_numeric_dtype(series.dtype()) {
            // NaN-only float columns carry no numeric evidence either
            let has_value = numeric_values(series)
                .map(|values| values.iter().any(Option::is_some))
                .unwrap_or(false);
            return if has_value {
                ColumnKind::Numeric
            } else {
                ColumnKind::Categorical
            };
        }

        if series.dtype() == &DataType::String
            && let Ok(strings) = series.str()
        {
            let mut seen_value = false;
            for cell in strings.into_iter().flatten() {
                if !is_numeric_literal(cell) {
                    return ColumnKind::Categorical;
                }
                seen_value = true;
            }
            if seen_value {
                return ColumnKind::Numeric;
            }
        }

        ColumnKind::Categorical
    }

    /// Check that `action` can run on the column.
    ///
    /// A column without any value fails with `EmptyColumn`, any other
    /// categorical column with `NotApplicable`.
    pub fn require_numeric(series: &Series, action: &str) -> Result<()> {
        let kind = Self::classify_series(series);
        if kind == ColumnKind::Numeric {
            return Ok(());
        }
        if missing_mask(series)?.iter().all(|m| *m) {
            return Err(EngineError::EmptyColumn(series.name().to_string()));
        }
        Err(EngineError::NotApplicable {
            column: series.name().to_string(),
            action: action.to_string(),
            kind,
        })
    }
}
