use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

// ============================================================================
// Column Typing
// ============================================================================

/// Semantic type of a column as inferred from its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Partition of a dataset's columns into numeric and categorical.
///
/// Every list keeps the dataset's column declaration order. A column appears
/// in exactly one of `numeric` and `categorical`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTyping {
    pub all: Vec<String>,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnTyping {
    /// Kind of the named column, or `None` if the column is unknown.
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        if self.numeric.iter().any(|c| c == column) {
            Some(ColumnKind::Numeric)
        } else if self.categorical.iter().any(|c| c == column) {
            Some(ColumnKind::Categorical)
        } else {
            None
        }
    }
}

// ============================================================================
// Preprocessing Actions
// ============================================================================

/// How missing cells of a column are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueMethod {
    /// Fill with the mean of the non-missing values (numeric only).
    Mean,
    /// Fill with the median of the non-missing values (numeric only).
    Median,
    /// Fill with the most frequent non-missing value.
    Mode,
    /// Delete every row where the column is missing.
    Remove,
}

impl fmt::Display for MissingValueMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingValueMethod::Mean => "mean",
            MissingValueMethod::Median => "median",
            MissingValueMethod::Mode => "mode",
            MissingValueMethod::Remove => "remove",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for MissingValueMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(MissingValueMethod::Mean),
            "median" => Ok(MissingValueMethod::Median),
            "mode" => Ok(MissingValueMethod::Mode),
            "remove" => Ok(MissingValueMethod::Remove),
            other => Err(EngineError::InvalidAction(format!(
                "unknown missing-value method '{}'",
                other
            ))),
        }
    }
}

/// The set of cleaning actions requested for one pipeline run.
///
/// Missing-value handling runs in the dataset's column declaration order,
/// outlier removal and normalization run in the order columns are listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingActions {
    #[serde(default)]
    pub missing_values: IndexMap<String, MissingValueMethod>,
    #[serde(default)]
    pub outliers: Vec<String>,
    #[serde(default)]
    pub normalize: Vec<String>,
}

impl PreprocessingActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request missing-value handling for a column.
    pub fn with_missing(mut self, column: impl Into<String>, method: MissingValueMethod) -> Self {
        self.missing_values.insert(column.into(), method);
        self
    }

    /// Request IQR outlier removal for a column.
    pub fn with_outliers(mut self, column: impl Into<String>) -> Self {
        self.outliers.push(column.into());
        self
    }

    /// Request min-max normalization for a column.
    pub fn with_normalize(mut self, column: impl Into<String>) -> Self {
        self.normalize.push(column.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.missing_values.is_empty() && self.outliers.is_empty() && self.normalize.is_empty()
    }

    /// Every column name referenced by any action.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        self.missing_values
            .keys()
            .chain(self.outliers.iter())
            .chain(self.normalize.iter())
            .map(String::as_str)
    }
}

/// An action that was skipped without failing the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAction {
    pub column: String,
    pub action: String,
    pub reason: String,
    /// Error code of the recoverable error behind the skip.
    pub code: String,
}

/// Outcome of one pipeline run, alongside the human-readable log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessReport {
    /// One entry per sub-step, in execution order.
    pub log: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub cells_filled: usize,
    pub rows_removed: usize,
    pub columns_normalized: usize,
    pub skipped: Vec<SkippedAction>,
}

impl PreprocessReport {
    pub fn new(rows_before: usize) -> Self {
        Self {
            rows_before,
            rows_after: rows_before,
            ..Self::default()
        }
    }

    /// Append a log entry.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    /// Record a recoverable skip both in the log and in `skipped`.
    pub fn skip(
        &mut self,
        column: &str,
        action: &str,
        code: &str,
        reason: impl Into<String>,
    ) {
        let reason = reason.into();
        self.log.push(format!("{} on '{}': {}", action, column, reason));
        self.skipped.push(SkippedAction {
            column: column.to_string(),
            action: action.to_string(),
            reason,
            code: code.to_string(),
        });
    }

    /// Percentage of rows removed by the run.
    pub fn rows_removed_percentage(&self) -> f64 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed as f64 / self.rows_before as f64) * 100.0
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Chart kind requested for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotType {
    /// Numeric columns only.
    Histogram,
    /// Numeric columns only.
    Boxplot,
    /// Categorical columns only.
    Count,
}

impl PlotType {
    /// Column kind this chart can be drawn for.
    pub fn required_kind(&self) -> ColumnKind {
        match self {
            PlotType::Histogram | PlotType::Boxplot => ColumnKind::Numeric,
            PlotType::Count => ColumnKind::Categorical,
        }
    }

    /// Capitalized name used in chart titles.
    pub fn title_name(&self) -> &'static str {
        match self {
            PlotType::Histogram => "Histogram",
            PlotType::Boxplot => "Boxplot",
            PlotType::Count => "Count",
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlotType::Histogram => "histogram",
            PlotType::Boxplot => "boxplot",
            PlotType::Count => "count",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PlotType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "histogram" => Ok(PlotType::Histogram),
            "boxplot" => Ok(PlotType::Boxplot),
            "count" => Ok(PlotType::Count),
            other => Err(EngineError::InvalidAction(format!(
                "unknown plot type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub column: String,
    pub plot_type: PlotType,
}

impl AnalysisRequest {
    pub fn new(column: impl Into<String>, plot_type: PlotType) -> Self {
        Self {
            column: column.into(),
            plot_type,
        }
    }
}

/// Single histogram bucket, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Five-number summary plus the fences used to flag outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxPlotSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

/// Declarative, renderer-agnostic chart description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Histogram {
        title: String,
        x_label: String,
        y_label: String,
        bins: Vec<HistogramBin>,
    },
    BoxPlot {
        title: String,
        x_label: String,
        /// `None` when the column has no values.
        summary: Option<BoxPlotSummary>,
        outliers: Vec<f64>,
    },
    Count {
        title: String,
        x_label: String,
        y_label: String,
        categories: Vec<CategoryCount>,
        /// Distinct values in the column, including those not drawn.
        total_categories: usize,
    },
}

impl ChartSpec {
    pub fn plot_type(&self) -> PlotType {
        match self {
            ChartSpec::Histogram { .. } => PlotType::Histogram,
            ChartSpec::BoxPlot { .. } => PlotType::Boxplot,
            ChartSpec::Count { .. } => PlotType::Count,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ChartSpec::Histogram { title, .. }
            | ChartSpec::BoxPlot { title, .. }
            | ChartSpec::Count { title, .. } => title,
        }
    }
}

/// Statistics and chart for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub column: String,
    pub kind: ColumnKind,
    /// Statistic name to formatted value, in display order.
    pub stats: IndexMap<String, String>,
    pub chart: ChartSpec,
}

// ============================================================================
// Dataset Views
// ============================================================================

/// Bounded head of a dataset, rendered as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPreview {
    pub columns: Vec<String>,
    /// `None` marks a missing cell.
    pub rows: Vec<Vec<Option<String>>>,
    pub total_rows: usize,
}

/// `describe()`-style summary of one numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericDescription {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

/// Shape, dtypes, numeric summaries and missing-value counts of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInsights {
    pub rows: usize,
    pub columns: usize,
    pub column_dtypes: IndexMap<String, String>,
    /// Numeric columns only, in declaration order.
    pub describe: IndexMap<String, NumericDescription>,
    /// Only columns with at least one missing cell.
    pub missing_values: IndexMap<String, usize>,
}

impl DatasetInsights {
    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }
}

/// What a caller gets back after uploading or opening a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedDataset {
    pub handle: String,
    pub saved_at: DateTime<Local>,
    pub columns: ColumnTyping,
    pub preview: DatasetPreview,
    pub insights: DatasetInsights,
}

/// What a caller gets back after preprocessing a stored dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessOutcome {
    pub cleaned_handle: String,
    pub log: Vec<String>,
    pub preview: DatasetPreview,
    /// Typing of the cleaned snapshot.
    pub columns: ColumnTyping,
    pub report: PreprocessReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_typing_kind_of() {
        let typing = ColumnTyping {
            all: vec!["age".to_string(), "color".to_string()],
            numeric: vec!["age".to_string()],
            categorical: vec!["color".to_string()],
        };
        assert_eq!(typing.kind_of("age"), Some(ColumnKind::Numeric));
        assert_eq!(typing.kind_of("color"), Some(ColumnKind::Categorical));
        assert_eq!(typing.kind_of("missing"), None);
    }

    #[test]
    fn test_missing_value_method_from_str() {
        assert_eq!(
            "Median".parse::<MissingValueMethod>().unwrap(),
            MissingValueMethod::Median
        );
        assert_eq!(
            " remove ".parse::<MissingValueMethod>().unwrap(),
            MissingValueMethod::Remove
        );
        let err = "interpolate".parse::<MissingValueMethod>().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ACTION");
    }

    #[test]
    fn test_plot_type_required_kind() {
        assert_eq!(PlotType::Histogram.required_kind(), ColumnKind::Numeric);
        assert_eq!(PlotType::Boxplot.required_kind(), ColumnKind::Numeric);
        assert_eq!(PlotType::Count.required_kind(), ColumnKind::Categorical);
        assert_eq!("BOXPLOT".parse::<PlotType>().unwrap(), PlotType::Boxplot);
        assert!("pie".parse::<PlotType>().is_err());
    }

    #[test]
    fn test_actions_from_json() {
        // Shape sent by the upload form
        let json = r#"{
            "missing_values": {"age": "mean", "city": "mode"},
            "outliers": ["income"],
            "normalize": ["age"]
        }"#;

        let actions: PreprocessingActions = serde_json::from_str(json).unwrap();
        assert_eq!(actions.missing_values["age"], MissingValueMethod::Mean);
        assert_eq!(actions.missing_values["city"], MissingValueMethod::Mode);
        assert_eq!(actions.outliers, vec!["income".to_string()]);
        assert_eq!(actions.normalize, vec!["age".to_string()]);

        let referenced: Vec<&str> = actions.referenced_columns().collect();
        assert_eq!(referenced, vec!["age", "city", "income", "age"]);
    }

    #[test]
    fn test_actions_partial_json_defaults() {
        let actions: PreprocessingActions =
            serde_json::from_str(r#"{"outliers": ["x"]}"#).unwrap();
        assert!(actions.missing_values.is_empty());
        assert!(actions.normalize.is_empty());
        assert!(!actions.is_empty());
    }

    #[test]
    fn test_unknown_method_rejected_in_json() {
        let result: Result<PreprocessingActions, _> =
            serde_json::from_str(r#"{"missing_values": {"age": "knn"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_report_skip_records_log_and_entry() {
        let mut report = PreprocessReport::new(3);
        report.skip("x", "median imputation", "EMPTY_COLUMN", "empty column, skipped");

        assert_eq!(report.log.len(), 1);
        assert!(report.log[0].contains("empty column, skipped"));
        assert_eq!(report.skipped[0].code, "EMPTY_COLUMN");
        assert_eq!(report.rows_after, 3);
    }

    #[test]
    fn test_chart_spec_serializes_with_kind_tag() {
        let chart = ChartSpec::Count {
            title: "Count Plot of color".to_string(),
            x_label: "color".to_string(),
            y_label: "count".to_string(),
            categories: vec![],
            total_categories: 0,
        };
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "count");
        assert_eq!(chart.plot_type(), PlotType::Count);
    }
}
