//! Imputation methods for handling missing values.

mod statistical;

pub use statistical::{FillOutcome, StatisticalImputer};
