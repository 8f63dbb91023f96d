//! credit-learning: training and scoring on top of the credit feature pipeline.
//!
//! This crate turns the processed feature table produced by
//! [`credit_processing`] into a persisted binary classifier, and serves it.
//!
//! # Features
//!
//! - **Attribute selection**: recursive elimination down to a fixed number of attributes
//! - **Logistic classifier**: mini-batch gradient descent with L2 and early stopping
//! - **Evaluation**: accuracy, per-class precision/recall/F1 and a confusion matrix
//! - **Scoring service**: validates requests, replays the persisted transform,
//!   returns `{probabilidade, classe}` per row
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use credit_learning::{ScoringService, Trainer, TrainingConfig};
//! use credit_processing::FeaturePipeline;
//!
//! let pipeline = FeaturePipeline::builder().artifact_dir("objects").build()?;
//! let trainer = Trainer::builder()
//!     .config(TrainingConfig::builder().seed(41).build()?)
//!     .pipeline(pipeline)
//!     .build()?;
//!
//! let result = trainer.train(raw_df)?;
//! println!("accuracy: {:.3}", result.report.accuracy);
//!
//! // In the serving process
//! let service = ScoringService::load("objects")?;
//! let response = service.handle_json(r#"{"profissao": ["Advogado"], ...}"#);
//! ```
//!
//! # Architecture
//!
//! ```text
//!  raw table ──► FeaturePipeline::clean ──► train/test split
//!                                              │
//!                     fit_state (train rows) ◄─┘──► transform (test rows)
//!                              │
//!                              ▼
//!               AttributeSelector ──► LogisticModel ──► ClassificationReport
//!
//!  objects/: scaler_<col>.json, label_encoder_<col>.json, selector.json, model.json
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]. Feature
//! pipeline failures are wrapped in [`LearningError::Processing`] and keep
//! their own codes:
//!
//! - [`LearningError::InvalidConfig`] - Invalid training configuration
//! - [`LearningError::TargetNotFound`] - Label column absent
//! - [`LearningError::ModelNotFound`] - No trained model in the artifact directory
//! - [`LearningError::InferenceError`] - Artifacts disagree or input width is wrong
//!
//! # Thread Safety
//!
//! [`ScoringService`] is immutable after loading and is `Send + Sync`; share
//! it behind an `Arc` to score from several threads.

mod config;
pub mod data;
mod error;
mod model;
mod pipeline;
mod selector;
mod service;
mod types;

// Re-export public API
//
// Configuration types
pub use config::{TrainingConfig, TrainingConfigBuilder};
// Error types
pub use error::{LearningError, Result};
// Model and selector
pub use model::{LogisticModel, MODEL_FILE};
pub use selector::{AttributeSelector, SELECTOR_FILE};
// Training job
pub use pipeline::{Trainer, TrainerBuilder};
// Scoring boundary
pub use service::{ErrorPayload, ScoreRequest, ScoringService, ServiceResponse};
// Result and metrics types
pub use types::{
    ClassMetrics, ClassificationReport, ConfusionMatrix, Prediction, TrainingHistory,
    TrainingResult,
};
