//! Handle-based facade over the store, the pipeline and the analysis engine.
//!
//! Every call names its dataset by handle and gets a full response back; the
//! workbench holds no per-session state beyond the store itself.

use polars::prelude::DataFrame;
use tracing::info;

use crate::analysis::AnalysisEngine;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result, ResultExt};
use crate::pipeline::PreprocessingPipeline;
use crate::profiler::{ColumnClassifier, DataProfiler};
use crate::store::DatasetStore;
use crate::types::{
    AnalysisRequest, AnalysisResult, LoadedDataset, PreprocessOutcome, PreprocessingActions,
};

/// Prefix of the handle a cleaned snapshot is stored under.
pub const CLEANED_PREFIX: &str = "cleaned_";

pub struct Workbench<S: DatasetStore> {
    store: S,
    config: EngineConfig,
    pipeline: PreprocessingPipeline,
    engine: AnalysisEngine,
}

impl<S: DatasetStore> Workbench<S> {
    /// Workbench with the default configuration.
    pub fn new(store: S) -> Self {
        let config = EngineConfig::default();
        Self {
            store,
            pipeline: PreprocessingPipeline::new(config.clone()),
            engine: AnalysisEngine::new(config.clone()),
            config,
        }
    }

    /// Workbench with a custom configuration, validated first.
    pub fn with_config(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            pipeline: PreprocessingPipeline::new(config.clone()),
            engine: AnalysisEngine::new(config.clone()),
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Store an uploaded dataset under `name` and describe it.
    pub fn upload(&self, name: &str, df: DataFrame) -> Result<LoadedDataset> {
        self.store.save_as(name, &df)?;
        info!("Stored {} ({} rows x {} columns)", name, df.height(), df.width());
        self.describe(name, &df)
    }

    /// Describe a dataset that is already stored.
    pub fn open(&self, handle: &str) -> Result<LoadedDataset> {
        let df = self.store.load(handle)?;
        self.describe(handle, &df)
    }

    /// Clean the dataset under `handle` and store the result next to it.
    ///
    /// The original snapshot is left untouched; the cleaned one is stored
    /// under `cleaned_<handle>`.
    pub fn preprocess(
        &self,
        handle: &str,
        actions: &PreprocessingActions,
    ) -> Result<PreprocessOutcome> {
        let df = self.store.load(handle)?;
        let (cleaned, report) = self
            .pipeline
            .apply(&df, actions)
            .context(format!("Preprocessing {}", handle))?;

        let cleaned_handle = format!("{}{}", CLEANED_PREFIX, handle);
        self.store.save_as(&cleaned_handle, &cleaned)?;
        info!("Stored cleaned snapshot as {}", cleaned_handle);

        Ok(PreprocessOutcome {
            cleaned_handle,
            log: report.log.clone(),
            preview: DataProfiler::preview(&cleaned, self.config.preview_rows)?,
            columns: ColumnClassifier::classify(&cleaned),
            report,
        })
    }

    pub fn analyze(&self, handle: &str, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let df = self.store.load(handle)?;
        self.engine.analyze(&df, request)
    }

    /// Drop a stored snapshot.
    pub fn discard(&self, handle: &str) -> Result<()> {
        if !self.store.contains(handle) {
            return Err(EngineError::DatasetNotFound(handle.to_string()));
        }
        self.store.remove(handle)
    }

    fn describe(&self, handle: &str, df: &DataFrame) -> Result<LoadedDataset> {
        Ok(LoadedDataset {
            handle: handle.to_string(),
            saved_at: self.store.saved_at(handle)?,
            columns: ColumnClassifier::classify(df),
            preview: DataProfiler::preview(df, self.config.preview_rows)?,
            insights: DataProfiler::insights(df)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDatasetStore;
    use crate::types::{MissingValueMethod, PlotType};
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn workbench() -> Workbench<MemoryDatasetStore> {
        Workbench::new(MemoryDatasetStore::new())
    }

    fn people() -> DataFrame {
        df![
            "age" => [Some(25.0), None, Some(35.0)],
            "city" => [Some("Oslo"), Some("Lima"), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_upload_describes_dataset() {
        let wb = workbench();
        let loaded = wb.upload("people.csv", people()).unwrap();

        assert_eq!(loaded.handle, "people.csv");
        assert_eq!(loaded.saved_at, wb.store().saved_at("people.csv").unwrap());
        assert_eq!(loaded.insights.describe["age"].mean, Some(30.0));
        assert_eq!(loaded.columns.numeric, vec!["age"]);
        assert_eq!(loaded.columns.categorical, vec!["city"]);
        assert_eq!(loaded.preview.rows.len(), 3);
        assert_eq!(loaded.insights.total_missing(), 2);
    }

    #[test]
    fn test_preprocess_stores_cleaned_copy() {
        let wb = workbench();
        wb.upload("people.csv", people()).unwrap();
        let actions = PreprocessingActions::new()
            .with_missing("age", MissingValueMethod::Mean)
            .with_missing("city", MissingValueMethod::Mode);

        let outcome = wb.preprocess("people.csv", &actions).unwrap();

        assert_eq!(outcome.cleaned_handle, "cleaned_people.csv");
        assert_eq!(outcome.log.len(), 2);
        assert_eq!(outcome.report.cells_filled, 2);
        assert_eq!(outcome.columns.numeric, vec!["age"]);
        // Original snapshot unchanged
        let original = wb.open("people.csv").unwrap();
        assert_eq!(original.insights.total_missing(), 2);
        let cleaned = wb.open("cleaned_people.csv").unwrap();
        assert_eq!(cleaned.insights.total_missing(), 0);
    }

    #[test]
    fn test_analyze_by_handle() {
        let wb = workbench();
        wb.upload("people.csv", people()).unwrap();

        let result = wb
            .analyze("people.csv", &AnalysisRequest::new("age", PlotType::Boxplot))
            .unwrap();
        assert_eq!(result.stats["Mean"], "30.00");
    }

    #[test]
    fn test_unknown_handle() {
        let wb = workbench();
        let err = wb
            .preprocess("ghost.csv", &PreprocessingActions::new())
            .unwrap_err();
        assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
        assert!(matches!(wb.open("ghost.csv"), Err(EngineError::DatasetNotFound(_))));
        assert!(wb.discard("ghost.csv").is_err());
    }

    #[test]
    fn test_structural_error_stores_nothing() {
        let wb = workbench();
        wb.upload("people.csv", people()).unwrap();
        let actions = PreprocessingActions::new().with_outliers("salary");

        let err = wb.preprocess("people.csv", &actions).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(!wb.store().contains("cleaned_people.csv"));
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = EngineConfig {
            histogram_bins: 0,
            ..EngineConfig::default()
        };
        let result = Workbench::with_config(MemoryDatasetStore::new(), config);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
