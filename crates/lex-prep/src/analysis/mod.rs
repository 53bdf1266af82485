//! Column analysis: statistics plus a chart specification.
//!
//! Analysis never mutates the dataset and never returns partial results.
//! A request whose chart kind does not fit the column's inferred type fails
//! with [`EngineError::TypeMismatch`].

mod charts;

use indexmap::IndexMap;
use polars::prelude::*;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::profiler::{CategoricalSummary, ColumnClassifier, NumericSummary};
use crate::types::{AnalysisRequest, AnalysisResult, ColumnKind, PlotType};
use crate::utils::{format_count, format_number, format_optional, NOT_AVAILABLE};

/// Computes per-column statistics and chart specifications.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    config: EngineConfig,
}

static_assertions::assert_impl_all!(AnalysisEngine: Send, Sync);

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, df: &DataFrame, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let series = df
            .column(&request.column)
            .map_err(|_| EngineError::ColumnNotFound(request.column.clone()))?
            .as_materialized_series();

        let kind = ColumnClassifier::classify_series(series);
        if kind != request.plot_type.required_kind() {
            return Err(EngineError::TypeMismatch {
                column: request.column.clone(),
                plot_type: request.plot_type,
                kind,
            });
        }

        info!(
            "Analyzing {} ({}) with a {} plot",
            request.column, kind, request.plot_type
        );

        let column = request.column.as_str();
        let (stats, chart) = match request.plot_type {
            PlotType::Histogram | PlotType::Boxplot => {
                let summary = NumericSummary::from_series(series)?;
                let chart = if request.plot_type == PlotType::Histogram {
                    charts::histogram(column, &summary, self.config.histogram_bins)
                } else {
                    charts::boxplot(column, &summary, self.config.iqr_multiplier)
                };
                (self.numeric_stats(&summary), chart)
            }
            PlotType::Count => {
                let summary = CategoricalSummary::from_series(series)?;
                let chart = charts::count(column, &summary, self.config.count_chart_limit);
                (Self::categorical_stats(&summary), chart)
            }
        };

        debug!("Computed {} statistics for {}", stats.len(), column);

        Ok(AnalysisResult {
            column: request.column.clone(),
            kind,
            stats,
            chart,
        })
    }

    fn numeric_stats(&self, summary: &NumericSummary) -> IndexMap<String, String> {
        let precision = self.config.stat_precision;
        let sum = if summary.count == 0 {
            NOT_AVAILABLE.to_string()
        } else {
            format_number(summary.sum, precision)
        };

        let mut stats = IndexMap::new();
        stats.insert("Count".to_string(), format_count(summary.count));
        stats.insert("Mean".to_string(), format_optional(summary.mean, precision));
        stats.insert("Median".to_string(), format_optional(summary.median, precision));
        stats.insert("Std Deviation".to_string(), format_optional(summary.std, precision));
        stats.insert("Min".to_string(), format_optional(summary.min, precision));
        stats.insert("Max".to_string(), format_optional(summary.max, precision));
        stats.insert("Total (Sum)".to_string(), sum);
        stats.insert("Missing".to_string(), format_count(summary.missing));
        stats
    }

    fn categorical_stats(summary: &CategoricalSummary) -> IndexMap<String, String> {
        let (top_value, top_frequency) = match summary.top() {
            Some((value, count)) => (value.to_string(), format_count(count)),
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };

        let mut stats = IndexMap::new();
        stats.insert("Count".to_string(), format_count(summary.count));
        stats.insert("Unique Values".to_string(), format_count(summary.distinct()));
        stats.insert("Top Value".to_string(), top_value);
        stats.insert("Top Frequency".to_string(), top_frequency);
        stats.insert("Missing".to_string(), format_count(summary.missing));
        stats
    }
}
