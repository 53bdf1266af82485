//! Preprocessing pipeline.
//!
//! - [`PreprocessingPipeline`]: runs a full action set in stage order
//! - [`outliers`]: IQR outlier removal
//! - [`normalize`]: min-max scaling

mod executor;
pub mod normalize;
pub mod outliers;

pub use executor::PreprocessingPipeline;
pub use normalize::{NormalizeOutcome, Normalizer};
pub use outliers::{OutlierHandler, OutlierOutcome};
