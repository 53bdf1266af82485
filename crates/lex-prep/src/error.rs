//! Error types for the preprocessing and analysis engine.
//!
//! Errors fall into two groups. Structural errors (unknown column, malformed
//! action, unknown dataset handle) abort the whole call. Recoverable errors
//! (`EmptyColumn`, `NotApplicable`) are raised by a single column/action pair
//! and turned into log entries by the pipeline.
//!
//! Errors are serializable so they can be handed to a frontend or printed as
//! JSON by the CLI.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::types::{ColumnKind, PlotType};

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in the dataset")]
    ColumnNotFound(String),

    /// Requested chart kind does not fit the column's inferred type.
    #[error("Cannot draw a {plot_type} plot for {kind} column '{column}'")]
    TypeMismatch {
        column: String,
        plot_type: PlotType,
        kind: ColumnKind,
    },

    /// Column has no non-missing values to compute a fill value from.
    #[error("Column '{0}' has no non-missing values")]
    EmptyColumn(String),

    /// Action does not apply to a column of this type.
    #[error("Cannot apply {action} to {kind} column '{column}'")]
    NotApplicable {
        column: String,
        action: String,
        kind: ColumnKind,
    },

    /// Malformed action request.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// No dataset is stored under the handle.
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    /// Handle cannot be used as a dataset name.
    #[error("Invalid dataset handle '{0}'")]
    InvalidHandle(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::EmptyColumn(_) => "EMPTY_COLUMN",
            Self::NotApplicable { .. } => "NOT_APPLICABLE",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::DatasetNotFound(_) => "DATASET_NOT_FOUND",
            Self::InvalidHandle(_) => "INVALID_HANDLE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error only affects a single column/action pair.
    ///
    /// The pipeline logs recoverable errors and moves on to the next action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EmptyColumn(_) | Self::NotApplicable { .. } => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EngineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EngineError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            EngineError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            EngineError::EmptyColumn("age".to_string()).error_code(),
            "EMPTY_COLUMN"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(EngineError::EmptyColumn("x".to_string()).is_recoverable());
        assert!(
            EngineError::NotApplicable {
                column: "color".to_string(),
                action: "normalization".to_string(),
                kind: ColumnKind::Categorical,
            }
            .is_recoverable()
        );
        assert!(!EngineError::ColumnNotFound("x".to_string()).is_recoverable());
        assert!(
            !EngineError::TypeMismatch {
                column: "color".to_string(),
                plot_type: PlotType::Histogram,
                kind: ColumnKind::Categorical,
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let error = EngineError::TypeMismatch {
            column: "color".to_string(),
            plot_type: PlotType::Histogram,
            kind: ColumnKind::Categorical,
        };
        assert_eq!(
            error.to_string(),
            "Cannot draw a histogram plot for categorical column 'color'"
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = EngineError::ColumnNotFound("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = EngineError::EmptyColumn("x".to_string()).with_context("median imputation");
        assert!(error.to_string().contains("median imputation"));
        assert_eq!(error.error_code(), "EMPTY_COLUMN");
        assert!(error.is_recoverable());
    }
}
