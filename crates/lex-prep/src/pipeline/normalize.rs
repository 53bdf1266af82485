//! Min-max normalization of numeric columns.

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::profiler::ColumnClassifier;
use crate::utils::{float_series, numeric_values};

/// Result of normalizing one column.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    /// Number of non-missing cells rescaled.
    pub scaled: usize,
    pub min: f64,
    pub max: f64,
    /// `min == max`, every value was set to 0.
    pub degenerate: bool,
}

/// Scales numeric columns into `[0, 1]`.
pub struct Normalizer;

impl Normalizer {
    /// Rescale `col_name` with `(v - min) / (max - min)`.
    ///
    /// Missing cells stay missing. A zero-variance column maps to 0.
    pub fn min_max(df: &mut DataFrame, col_name: &str) -> Result<NormalizeOutcome> {
        let series = df
            .column(col_name)
            .map_err(|_| EngineError::ColumnNotFound(col_name.to_string()))?
            .as_materialized_series()
            .clone();

        ColumnClassifier::require_numeric(&series, "normalization")?;

        let values = numeric_values(&series)?;
        let present = values.iter().flatten();
        let min = present.clone().copied().fold(f64::INFINITY, f64::min);
        let max = present.clone().copied().fold(f64::NEG_INFINITY, f64::max);
        let scaled = present.count();
        if scaled == 0 {
            return Err(EngineError::EmptyColumn(col_name.to_string()));
        }

        let range = max - min;
        let degenerate = range == 0.0;
        if degenerate {
            warn!("Column {} has zero variance, normalizing to 0", col_name);
        }

        let normalized: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| {
                v.map(|val| {
                    if degenerate {
                        0.0
                    } else {
                        (val - min) / range
                    }
                })
            })
            .collect();
        df.replace(col_name, float_series(col_name, normalized))?;

        debug!("Normalized {} from [{}, {}]", col_name, min, max);

        Ok(NormalizeOutcome {
            scaled,
            min,
            max,
            degenerate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_f64(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_min_max_basic() {
        let mut df = df!["x" => [Some(10.0), Some(20.0), None, Some(30.0)]].unwrap();

        let outcome = Normalizer::min_max(&mut df, "x").unwrap();

        assert_eq!(outcome.scaled, 3);
        assert_eq!(outcome.min, 10.0);
        assert_eq!(outcome.max, 30.0);
        assert!(!outcome.degenerate);
        assert_eq!(
            column_f64(&df, "x"),
            vec![Some(0.0), Some(0.5), None, Some(1.0)]
        );
    }

    #[test]
    fn test_min_max_zero_variance() {
        let mut df = df!["x" => [7.0, 7.0, 7.0]].unwrap();

        let outcome = Normalizer::min_max(&mut df, "x").unwrap();

        assert!(outcome.degenerate);
        assert_eq!(column_f64(&df, "x"), vec![Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_min_max_idempotent() {
        let mut df = df!["x" => [0.0, 0.25, 1.0]].unwrap();

        Normalizer::min_max(&mut df, "x").unwrap();
        let once = column_f64(&df, "x");
        Normalizer::min_max(&mut df, "x").unwrap();
        let twice = column_f64(&df, "x");

        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a.unwrap() - b.unwrap()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_min_max_categorical_not_applicable() {
        let mut df = df!["color" => ["red", "blue"]].unwrap();

        let err = Normalizer::min_max(&mut df, "color").unwrap_err();
        assert!(matches!(err, EngineError::NotApplicable { .. }));
        assert_eq!(
            df.column("color").unwrap().dtype(),
            &DataType::String
        );
    }

    #[test]
    fn test_min_max_integer_column_becomes_float() {
        let mut df = df!["x" => [1i64, 3, 5]].unwrap();

        Normalizer::min_max(&mut df, "x").unwrap();
        assert_eq!(
            column_f64(&df, "x"),
            vec![Some(0.0), Some(0.5), Some(1.0)]
        );
    }
}
