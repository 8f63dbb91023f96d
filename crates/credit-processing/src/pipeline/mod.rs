//! Pipeline module.
//!
//! This module provides the feature pipeline orchestrator and the row-wise
//! steps that only it composes.

mod builder;
pub mod features;
pub mod outliers;

pub use builder::{FeaturePipeline, FeaturePipelineBuilder, PipelineOutput};
pub use features::FeatureDeriver;
pub use outliers::OutlierClamper;
