//! Dataset Preprocessing & Analysis Library
//!
//! Cleans a tabular dataset with per-column rules and describes a single
//! column with statistics and a renderer-agnostic chart, built on Polars.
//!
//! # Overview
//!
//! - **Column Classification**: every column is either numeric or categorical
//! - **Preprocessing**: missing-value handling, IQR outlier removal and
//!   min-max normalization, always applied in that order
//! - **Analysis**: descriptive statistics plus a histogram, box plot or count
//!   chart specification
//! - **Storage**: handle-based dataset snapshots in memory or as CSV files
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_prep::{
//!     AnalysisEngine, AnalysisRequest, MissingValueMethod, PlotType,
//!     PreprocessingActions, PreprocessingPipeline,
//! };
//!
//! let df = lex_prep::store::read_csv("data.csv".as_ref())?;
//!
//! let actions = PreprocessingActions::new()
//!     .with_missing("age", MissingValueMethod::Mean)
//!     .with_outliers("income")
//!     .with_normalize("age");
//!
//! let (cleaned, report) = PreprocessingPipeline::default().apply(&df, &actions)?;
//! for entry in &report.log {
//!     println!("{entry}");
//! }
//!
//! let result = AnalysisEngine::default()
//!     .analyze(&cleaned, &AnalysisRequest::new("income", PlotType::Boxplot))?;
//! println!("{:?}", result.stats);
//! ```
//!
//! # Errors
//!
//! Only structural problems fail a pipeline call (for example an action that
//! names a column the dataset does not have). Per-column problems such as an
//! empty column or a mean fill on a categorical column are recorded in
//! [`PreprocessReport::skipped`] and the run continues. Analysis either fully
//! succeeds or fails, see [`EngineError::TypeMismatch`].
//!
//! # Storage
//!
//! [`Workbench`] ties a [`DatasetStore`] to the pipeline and the analysis
//! engine so callers can work with handles instead of frames:
//!
//! ```rust,ignore
//! use lex_prep::{MemoryDatasetStore, Workbench};
//!
//! let workbench = Workbench::new(MemoryDatasetStore::new());
//! let loaded = workbench.upload("data.csv", df)?;
//! let outcome = workbench.preprocess(&loaded.handle, &actions)?;
//! assert_eq!(outcome.cleaned_handle, "cleaned_data.csv");
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod store;
pub mod types;
pub mod utils;
pub mod workbench;

// Re-exports for convenient access
pub use analysis::AnalysisEngine;
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder};
pub use error::{EngineError, Result as EngineResult, ResultExt};
pub use imputers::StatisticalImputer;
pub use pipeline::{Normalizer, OutlierHandler, PreprocessingPipeline};
pub use profiler::{ColumnClassifier, DataProfiler};
pub use store::{DatasetStore, FileDatasetStore, MemoryDatasetStore};
pub use types::{
    AnalysisRequest, AnalysisResult, BoxPlotSummary, CategoryCount, ChartSpec, ColumnKind,
    ColumnTyping, DatasetInsights, DatasetPreview, HistogramBin, LoadedDataset,
    MissingValueMethod, NumericDescription, PlotType, PreprocessOutcome, PreprocessReport,
    PreprocessingActions, SkippedAction,
};
pub use utils::{format_count, format_number, parse_numeric_literal};
pub use workbench::Workbench;
