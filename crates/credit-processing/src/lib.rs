//! Credit-Risk Feature Pipeline Library
//!
//! The deterministic, stateful transformation that turns raw loan-application
//! records into the fixed feature vector of the credit-scoring model, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! The same step implementations run in two modes:
//!
//! - **Fit** (training): parse currency strings, impute nulls, correct
//!   free-text professions, clamp outliers, derive the requested/total ratio,
//!   then fit, persist and apply per-column scalers and encoders.
//! - **Transform** (inference): validate the input, derive the ratio if it is
//!   absent, then apply the persisted scalers and encoders. Nothing is
//!   imputed or corrected; nulls, unknown categories and missing artifacts
//!   are errors.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use credit_processing::{FeaturePipeline, PipelineConfig};
//! use credit_processing::io::read_table;
//!
//! let pipeline = FeaturePipeline::builder()
//!     .config(PipelineConfig::default())
//!     .artifact_dir("objects")
//!     .build()?;
//!
//! // Training: writes objects/scaler_<col>.json and objects/label_encoder_<col>.json
//! let (train, _state) = pipeline.fit(read_table("data/raw/base_treinamento.parquet")?)?;
//!
//! // Serving: load once, then transform each request
//! let state = pipeline.load_state()?;
//! let features = pipeline.transform(request_df, &state)?;
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to change column lists, vocabularies, outlier bounds
//! or the zero-denominator policy of the ratio feature:
//!
//! ```rust,ignore
//! use credit_processing::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .artifact_dir("objects/v2")
//!     .outlier_bounds(vec![OutlierBounds::new("idade", 18.0, 100.0)])
//!     .zero_division(ZeroDivisionPolicy::Error)
//!     .build()?;
//! ```
//!
//! Bounds, vocabularies and column lists are not persisted with the
//! artifacts; every run against the same artifacts must use the same config.

pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{parse_currency, CategoricalCorrector, CurrencyNormalizer, CurrencyParseError};
pub use config::{
    CanonicalVocabulary, ConfigValidationError, OutlierBounds, PipelineConfig,
    PipelineConfigBuilder, RatioFeature, ZeroDivisionPolicy,
};
pub use dataset::{age_from_birthdate, DatasetAssembler, SourceTables};
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use imputers::NullImputer;
pub use pipeline::{
    FeatureDeriver, FeaturePipeline, FeaturePipelineBuilder, OutlierClamper, PipelineOutput,
};
pub use store::{ArtifactStore, EncoderState, EncoderStore, FittedState, ScalerState, ScalerStore};
pub use types::{ActionType, PipelineAction, PipelineMode, PipelineSummary};
