//! Descriptive statistics for a single column.

use polars::prelude::*;

use crate::error::Result;
use crate::types::NumericDescription;
use crate::utils::{
    iqr_fences, missing_count, present_numeric_values, quantile_sorted, sample_std, sorted_copy,
    string_values, value_counts_sorted,
};

/// Raw statistics of a numeric column. Value statistics are `None` when the
/// column has no non-missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation, needs at least two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub sum: f64,
    /// Non-missing values sorted ascending.
    pub sorted: Vec<f64>,
}

impl NumericSummary {
    pub fn from_series(series: &Series) -> Result<Self> {
        let values = present_numeric_values(series)?;
        let missing = series.len() - values.len();
        Ok(Self::from_values(&values, missing))
    }

    pub fn from_values(values: &[f64], missing: usize) -> Self {
        let sorted = sorted_copy(values);
        let count = sorted.len();
        let has_values = count > 0;
        let sum: f64 = sorted.iter().sum();

        Self {
            count,
            missing,
            mean: has_values.then(|| sum / count as f64),
            median: has_values.then(|| quantile_sorted(&sorted, 0.5)),
            std: sample_std(&sorted),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            q1: has_values.then(|| quantile_sorted(&sorted, 0.25)),
            q3: has_values.then(|| quantile_sorted(&sorted, 0.75)),
            sum,
            sorted,
        }
    }

    pub fn describe(&self) -> NumericDescription {
        NumericDescription {
            count: self.count,
            mean: self.mean,
            std: self.std,
            min: self.min,
            q1: self.q1,
            median: self.median,
            q3: self.q3,
            max: self.max,
        }
    }

    /// Outlier fences for the given IQR multiplier.
    pub fn fences(&self, multiplier: f64) -> Option<(f64, f64)> {
        iqr_fences(&self.sorted, multiplier)
    }

    /// Values outside the fences, ascending.
    pub fn outliers(&self, multiplier: f64) -> Vec<f64> {
        match self.fences(multiplier) {
            Some((lower, upper)) => self
                .sorted
                .iter()
                .copied()
                .filter(|v| *v < lower || *v > upper)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Raw statistics of a categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    pub count: usize,
    pub missing: usize,
    /// Distinct values with frequencies, count descending then alphabetical.
    pub frequencies: Vec<(String, usize)>,
}

impl CategoricalSummary {
    pub fn from_series(series: &Series) -> Result<Self> {
        let missing = missing_count(series)?;
        let values: Vec<String> = string_values(series)?.into_iter().flatten().collect();
        Ok(Self {
            count: values.len(),
            missing,
            frequencies: value_counts_sorted(&values),
        })
    }

    pub fn distinct(&self) -> usize {
        self.frequencies.len()
    }

    /// Most frequent value and its frequency.
    pub fn top(&self) -> Option<(&str, usize)> {
        self.frequencies
            .first()
            .map(|(value, count)| (value.as_str(), *count))
    }
}
