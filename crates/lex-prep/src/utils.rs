//! Shared utilities for the engine.
//!
//! Numeric parsing, value extraction from polars series, quantiles and
//! number formatting used by the classifier, the pipeline and the analysis
//! engine alike.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashMap;

use crate::error::{EngineError, Result};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

// Plain decimal or scientific literal with optional sign. No currency,
// grouping separators, percent signs or inf/nan words.
static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
        .expect("Invalid regex: numeric literal")
});

/// Parse a cell as a number, trimming surrounding whitespace.
///
/// ```rust,ignore
/// assert_eq!(parse_numeric_literal(" 42 "), Some(42.0));
/// assert_eq!(parse_numeric_literal("$42"), None);
/// ```
pub fn parse_numeric_literal(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if !NUMERIC_LITERAL.is_match(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Check if a string is a plain numeric literal.
pub fn is_numeric_literal(s: &str) -> bool {
    parse_numeric_literal(s).is_some()
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Extract a series as optional floats, `None` marking missing cells.
///
/// Native numeric columns are cast (NaN counts as missing); string columns
/// are parsed cell by cell and fail on the first non-numeric value.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        let casted = series.cast(&DataType::Float64)?;
        return Ok(casted
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect());
    }

    if series.dtype() == &DataType::String {
        let mut values = Vec::with_capacity(series.len());
        for cell in series.str()?.into_iter() {
            match cell {
                None => values.push(None),
                Some(raw) => match parse_numeric_literal(raw) {
                    Some(v) => values.push(Some(v)),
                    None => {
                        return Err(EngineError::InvalidAction(format!(
                            "column '{}' holds non-numeric value '{}'",
                            series.name(),
                            raw
                        )));
                    }
                },
            }
        }
        return Ok(values);
    }

    if series.null_count() == series.len() {
        return Ok(vec![None; series.len()]);
    }

    Err(EngineError::InvalidAction(format!(
        "column '{}' of type {} is not numeric",
        series.name(),
        series.dtype()
    )))
}

/// Per-row missing flags. NaN in a float column counts as missing.
pub fn missing_mask(series: &Series) -> Result<Vec<bool>> {
    if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        return Ok(numeric_values(series)?.iter().map(Option::is_none).collect());
    }
    Ok(series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect())
}

/// Number of missing cells in a series.
pub fn missing_count(series: &Series) -> Result<usize> {
    Ok(missing_mask(series)?.into_iter().filter(|m| *m).count())
}

/// Non-missing numeric values of a series, in row order.
pub fn present_numeric_values(series: &Series) -> Result<Vec<f64>> {
    Ok(numeric_values(series)?.into_iter().flatten().collect())
}

/// Extract a series as optional strings, `None` marking missing cells.
pub fn string_values(series: &Series) -> Result<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Build a Float64 series from optional values.
pub fn float_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

/// Build a String series from optional values.
pub fn string_series(name: &str, values: Vec<Option<String>>) -> Series {
    Series::new(name.into(), values)
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Sort a copy of the values ascending. NaN never reaches here.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Quantile of sorted values using linear interpolation between ranks.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

/// Lower and upper outlier fences `Q1 - k*IQR` and `Q3 + k*IQR`.
///
/// Returns `None` for an empty slice.
pub fn iqr_fences(values: &[f64], multiplier: f64) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted_copy(values);
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(quantile_sorted(&sorted_copy(values), 0.5))
    }
}

/// Sample standard deviation (n - 1). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

/// Most frequent value, ties broken by first occurrence.
pub fn mode_first_occurrence<T, I>(values: I) -> Option<(T, usize)>
where
    T: Clone + Eq + std::hash::Hash,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut order: Vec<T> = Vec::new();
    for value in values {
        let count = counts.entry(value.clone()).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut best: Option<(T, usize)> = None;
    for value in order {
        let count = counts[&value];
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((value, count));
        }
    }
    best
}

/// Frequencies sorted by count descending, ties alphabetical.
pub fn value_counts_sorted(values: &[String]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    let mut entries: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, precision: usize) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Marker for a statistic that is undefined for the input.
pub const NOT_AVAILABLE: &str = "n/a";

/// Insert thousands separators into the integer part of a digit string.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Format a number with a fixed precision and thousands separators.
///
/// ```rust,ignore
/// assert_eq!(format_number(1234.567, 2), "1,234.57");
/// ```
pub fn format_number(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let formatted = format!("{:.*}", precision, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };
    // -0.00 prints as 0.00
    let is_negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');

    let mut out = String::new();
    if is_negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a count with thousands separators.
pub fn format_count(count: usize) -> String {
    group_thousands(&count.to_string())
}

/// Format an optional number, `n/a` when absent.
pub fn format_optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format_number(v, precision))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_parse_numeric_literal() {
        assert_eq!(parse_numeric_literal("42"), Some(42.0));
        assert_eq!(parse_numeric_literal("  -3.5 "), Some(-3.5));
        assert_eq!(parse_numeric_literal("+.5"), Some(0.5));
        assert_eq!(parse_numeric_literal("1e3"), Some(1000.0));
        assert_eq!(parse_numeric_literal("2.5E-1"), Some(0.25));
        assert_eq!(parse_numeric_literal("7."), Some(7.0));
    }

    #[test]
    fn test_parse_numeric_literal_rejects_formatted() {
        assert_eq!(parse_numeric_literal("$42"), None);
        assert_eq!(parse_numeric_literal("€100"), None);
        assert_eq!(parse_numeric_literal("1,234"), None);
        assert_eq!(parse_numeric_literal("42%"), None);
        assert_eq!(parse_numeric_literal("inf"), None);
        assert_eq!(parse_numeric_literal("NaN"), None);
        assert_eq!(parse_numeric_literal(""), None);
        assert_eq!(parse_numeric_literal("abc"), None);
        assert_eq!(parse_numeric_literal("true"), None);
    }

    #[test]
    fn test_numeric_values_from_strings() {
        let series = Series::new("x".into(), &[Some(" 1 "), None, Some("2.5")]);
        let values = numeric_values(&series).unwrap();
        assert_eq!(values, vec![Some(1.0), None, Some(2.5)]);
    }

    #[test]
    fn test_numeric_values_rejects_text() {
        let series = Series::new("x".into(), &["1", "abc"]);
        assert!(numeric_values(&series).is_err());
    }

    #[test]
    fn test_numeric_values_native_ints() {
        let series = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(
            present_numeric_values(&series).unwrap(),
            vec![1.0, 3.0]
        );
    }

    #[test]
    fn test_quantile_sorted_linear() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_eq!(quantile_sorted(&values, 0.25), 2.0);
        assert_eq!(quantile_sorted(&values, 0.5), 3.0);
        assert_eq!(quantile_sorted(&values, 0.75), 4.0);
        assert_eq!(quantile_sorted(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile_sorted(&[], 0.5), 0.0);
    }

    #[test]
    fn test_iqr_fences() {
        let (lower, upper) = iqr_fences(&[1.0, 2.0, 3.0, 4.0, 100.0], 1.5).unwrap();
        assert_eq!(lower, -1.0);
        assert_eq!(upper, 7.0);
        assert!(iqr_fences(&[], 1.5).is_none());
    }

    #[test]
    fn test_mean_median_std() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(mean(&values), Some(3.0));
        assert_eq!(median(&values), Some(3.0));
        // Variance = 10 / 4 = 2.5
        assert!((sample_std(&values).unwrap() - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[5.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mode_first_occurrence_ties() {
        let values = vec!["b", "a", "a", "b", "c"];
        assert_eq!(mode_first_occurrence(values), Some(("b", 2)));
        assert_eq!(mode_first_occurrence(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_value_counts_sorted_ties_alphabetical() {
        let values: Vec<String> = ["pear", "apple", "pear", "fig", "apple", "kiwi"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let counts = value_counts_sorted(&values);
        assert_eq!(
            counts,
            vec![
                ("apple".to_string(), 2),
                ("pear".to_string(), 2),
                ("fig".to_string(), 1),
                ("kiwi".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.567, 2), "1,234.57");
        assert_eq!(format_number(0.5, 2), "0.50");
        assert_eq!(format_number(-1234567.0, 0), "-1,234,567");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(f64::NAN, 2), "n/a");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(12), "12");
        assert_eq!(format_optional(None, 2), "n/a");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(30.123456, 4), 30.1235);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
