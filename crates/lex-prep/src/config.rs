//! Configuration for the preprocessing and analysis engine.
//!
//! Use [`EngineConfig::builder()`] for a validated configuration with a
//! fluent API, or [`EngineConfig::default()`] for the stock settings.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tunables shared by the pipeline, the analysis engine and the workbench.
///
/// # Example
///
/// ```rust,ignore
/// use lex_prep::config::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .histogram_bins(20)
///     .stat_precision(3)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of equal-width histogram bins.
    /// Default: 10
    pub histogram_bins: usize,

    /// Decimal places used when formatting statistics.
    /// Default: 2
    pub stat_precision: usize,

    /// Decimal places a mean/median fill value is rounded to.
    /// Default: 4
    pub fill_precision: usize,

    /// Fence multiplier for the IQR outlier rule, in both preprocessing
    /// and box plots.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Maximum number of categories drawn in a count chart.
    /// Default: 15
    pub count_chart_limit: usize,

    /// Number of rows in a dataset preview.
    /// Default: 5
    pub preview_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 10,
            stat_precision: 2,
            fill_precision: 4,
            iqr_multiplier: 1.5,
            count_chart_limit: 15,
            preview_rows: 5,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.histogram_bins == 0 {
            return Err(ConfigValidationError::InvalidBinCount(self.histogram_bins));
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier <= 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(self.iqr_multiplier));
        }

        if self.count_chart_limit == 0 {
            return Err(ConfigValidationError::InvalidLimit {
                field: "count_chart_limit".to_string(),
                value: self.count_chart_limit,
            });
        }

        if self.stat_precision > 12 || self.fill_precision > 12 {
            return Err(ConfigValidationError::InvalidPrecision(
                self.stat_precision.max(self.fill_precision),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid histogram bin count: {0} (must be at least 1)")]
    InvalidBinCount(usize),

    #[error("Invalid IQR multiplier: {0} (must be a positive finite number)")]
    InvalidMultiplier(f64),

    #[error("Invalid value for '{field}': {value} (must be at least 1)")]
    InvalidLimit { field: String, value: usize },

    #[error("Invalid precision: {0} (must be at most 12 decimal places)")]
    InvalidPrecision(usize),
}

impl From<ConfigValidationError> for EngineError {
    fn from(err: ConfigValidationError) -> Self {
        EngineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    histogram_bins: Option<usize>,
    stat_precision: Option<usize>,
    fill_precision: Option<usize>,
    iqr_multiplier: Option<f64>,
    count_chart_limit: Option<usize>,
    preview_rows: Option<usize>,
}

impl EngineConfigBuilder {
    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set the decimal places for formatted statistics.
    pub fn stat_precision(mut self, precision: usize) -> Self {
        self.stat_precision = Some(precision);
        self
    }

    /// Set the decimal places mean/median fill values are rounded to.
    pub fn fill_precision(mut self, precision: usize) -> Self {
        self.fill_precision = Some(precision);
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the maximum number of categories in a count chart.
    pub fn count_chart_limit(mut self, limit: usize) -> Self {
        self.count_chart_limit = Some(limit);
        self
    }

    /// Set the number of preview rows.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            stat_precision: self.stat_precision.unwrap_or(defaults.stat_precision),
            fill_precision: self.fill_precision.unwrap_or(defaults.fill_precision),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            count_chart_limit: self.count_chart_limit.unwrap_or(defaults.count_chart_limit),
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.histogram_bins, 10);
        assert_eq!(config.stat_precision, 2);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.count_chart_limit, 15);
        assert_eq!(config.preview_rows, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .histogram_bins(20)
            .stat_precision(3)
            .iqr_multiplier(3.0)
            .preview_rows(10)
            .build()
            .unwrap();

        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.stat_precision, 3);
        assert_eq!(config.iqr_multiplier, 3.0);
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.fill_precision, 4);
    }

    #[test]
    fn test_validation_zero_bins() {
        let result = EngineConfig::builder().histogram_bins(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidBinCount(0)
        ));
    }

    #[test]
    fn test_validation_bad_multiplier() {
        assert!(EngineConfig::builder().iqr_multiplier(0.0).build().is_err());
        assert!(EngineConfig::builder().iqr_multiplier(-1.5).build().is_err());
        assert!(
            EngineConfig::builder()
                .iqr_multiplier(f64::NAN)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_validation_error_converts_to_engine_error() {
        let err: EngineError = EngineConfig::builder()
            .count_chart_limit(0)
            .build()
            .unwrap_err()
            .into();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"histogram_bins": 25}"#).unwrap();
        assert_eq!(config.histogram_bins, 25);
        assert_eq!(config.stat_precision, 2);
    }
}
