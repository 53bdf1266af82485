//! Preprocessing executor module.
//!
//! Runs a [`PreprocessingActions`] set against a dataset snapshot in three
//! fixed stages: missing values, outliers, normalization.

use polars::prelude::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::imputers::{FillOutcome, StatisticalImputer};
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::outliers::OutlierHandler;
use crate::types::{MissingValueMethod, PreprocessReport, PreprocessingActions};
use crate::utils::missing_count;

/// Applies cleaning actions to a dataset and reports what changed.
///
/// The input frame is never mutated; `apply` works on its own copy and
/// returns it alongside the report.
#[derive(Debug, Clone, Default)]
pub struct PreprocessingPipeline {
    config: EngineConfig,
}

static_assertions::assert_impl_all!(PreprocessingPipeline: Send, Sync);

impl PreprocessingPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every requested action and return the cleaned snapshot.
    ///
    /// Fails only when an action names a column the dataset does not have.
    /// Per-column problems (empty column, action not applicable to the
    /// column type) are logged and the action is skipped.
    pub fn apply(
        &self,
        df: &DataFrame,
        actions: &PreprocessingActions,
    ) -> Result<(DataFrame, PreprocessReport)> {
        let start = Instant::now();
        Self::validate_columns(df, actions)?;

        let mut working = df.clone();
        let mut report = PreprocessReport::new(df.height());

        info!(
            "Preprocessing {} rows x {} columns",
            df.height(),
            df.width()
        );

        if actions.is_empty() {
            report.record("No preprocessing actions selected");
            return Ok((working, report));
        }

        info!("Stage 1: missing values");
        self.handle_missing_values(&mut working, actions, &mut report)?;

        info!("Stage 2: outliers");
        self.handle_outliers(&mut working, &actions.outliers, &mut report)?;

        info!("Stage 3: normalization");
        self.handle_normalization(&mut working, &actions.normalize, &mut report)?;

        report.rows_after = working.height();
        info!(
            "Preprocessing finished in {:.2?}: {} -> {} rows, {} skipped",
            start.elapsed(),
            report.rows_before,
            report.rows_after,
            report.skipped.len()
        );

        Ok((working, report))
    }

    /// Every referenced column must exist before anything runs.
    fn validate_columns(df: &DataFrame, actions: &PreprocessingActions) -> Result<()> {
        let names: HashSet<&str> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.as_str())
            .collect();

        match actions.referenced_columns().find(|c| !names.contains(c)) {
            Some(missing) => Err(EngineError::ColumnNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    fn handle_missing_values(
        &self,
        df: &mut DataFrame,
        actions: &PreprocessingActions,
        report: &mut PreprocessReport,
    ) -> Result<()> {
        // Dataset declaration order, not request order
        let ordered: Vec<(String, MissingValueMethod)> = df
            .get_column_names()
            .iter()
            .filter_map(|name| {
                actions
                    .missing_values
                    .get(name.as_str())
                    .map(|method| (name.to_string(), *method))
            })
            .collect();

        for (col_name, method) in ordered {
            let missing = missing_count(df.column(&col_name)?.as_materialized_series())?;
            debug!("Missing values in {}: {} ({})", col_name, missing, method);

            let outcome = match method {
                MissingValueMethod::Remove => {
                    StatisticalImputer::remove_missing_rows(df, &col_name).map(|removed| {
                        report.rows_removed += removed;
                        format!(
                            "Removed {} with missing '{}'",
                            plural(removed, "row"),
                            col_name
                        )
                    })
                }
                MissingValueMethod::Mean => {
                    StatisticalImputer::apply_numeric_mean(df, &col_name, self.config.fill_precision)
                        .map(|fill| fill_entry(report, &col_name, method, fill))
                }
                MissingValueMethod::Median => StatisticalImputer::apply_numeric_median(
                    df,
                    &col_name,
                    self.config.fill_precision,
                )
                .map(|fill| fill_entry(report, &col_name, method, fill)),
                MissingValueMethod::Mode => StatisticalImputer::apply_mode_imputation(df, &col_name)
                    .map(|fill| fill_entry(report, &col_name, method, fill)),
            };

            let action = match method {
                MissingValueMethod::Remove => "missing-row removal".to_string(),
                other => format!("{} imputation", other),
            };
            Self::settle(outcome, &col_name, &action, report)?;
        }

        Ok(())
    }

    fn handle_outliers(
        &self,
        df: &mut DataFrame,
        columns: &[String],
        report: &mut PreprocessReport,
    ) -> Result<()> {
        for col_name in dedup(columns) {
            let outcome =
                OutlierHandler::remove_outliers(df, col_name, self.config.iqr_multiplier).map(
                    |outcome| {
                        report.rows_removed += outcome.removed;
                        if outcome.removed == 0 {
                            format!(
                                "No outliers in '{}' (fences {} to {})",
                                col_name, outcome.lower, outcome.upper
                            )
                        } else {
                            format!(
                                "Removed {} with outliers in '{}' (outside {} to {})",
                                plural(outcome.removed, "row"),
                                col_name,
                                outcome.lower,
                                outcome.upper
                            )
                        }
                    },
                );
            Self::settle(outcome, col_name, "outlier removal", report)?;
        }

        Ok(())
    }

    fn handle_normalization(
        &self,
        df: &mut DataFrame,
        columns: &[String],
        report: &mut PreprocessReport,
    ) -> Result<()> {
        for col_name in dedup(columns) {
            let outcome = Normalizer::min_max(df, col_name).map(|outcome| {
                report.columns_normalized += 1;
                if outcome.degenerate {
                    format!(
                        "Normalized '{}': zero variance (all values {}), set to 0",
                        col_name, outcome.min
                    )
                } else {
                    format!(
                        "Normalized {} in '{}' to [0, 1] (min {}, max {})",
                        plural(outcome.scaled, "value"),
                        col_name,
                        outcome.min,
                        outcome.max
                    )
                }
            });
            Self::settle(outcome, col_name, "normalization", report)?;
        }

        Ok(())
    }

    /// Log a successful step, or record a recoverable failure as a skip.
    fn settle(
        outcome: Result<String>,
        col_name: &str,
        action: &str,
        report: &mut PreprocessReport,
    ) -> Result<()> {
        match outcome {
            Ok(entry) => {
                debug!("{}", entry);
                report.record(entry);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                let reason = match &e {
                    EngineError::EmptyColumn(_) => "empty column, skipped".to_string(),
                    EngineError::NotApplicable { kind, .. } => {
                        format!("not applicable to {} column, skipped", kind)
                    }
                    other => other.to_string(),
                };
                warn!("Skipping {} on {}: {}", action, col_name, reason);
                report.skip(col_name, action, e.error_code(), reason);
                Ok(())
            }
            Err(e) => Err(e.with_context(format!("{} on '{}'", action, col_name))),
        }
    }
}

fn fill_entry(
    report: &mut PreprocessReport,
    col_name: &str,
    method: MissingValueMethod,
    fill: FillOutcome,
) -> String {
    report.cells_filled += fill.filled;
    if fill.filled == 0 {
        format!("No missing values in '{}', {} fill not needed", col_name, method)
    } else {
        format!(
            "Filled {} in '{}' using {} ({})",
            plural(fill.filled, "missing cell"),
            col_name,
            method,
            fill.value
        )
    }
}

/// First occurrence of each name, order kept.
fn dedup(columns: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .map(String::as_str)
        .filter(|c| seen.insert(*c))
        .collect()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
