//! Error types for the credit-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Error Handling
//!
//! Errors are designed to be:
//! - **Descriptive**: Each variant includes context about what went wrong
//! - **Coded**: [`LearningError::error_code()`] returns a stable string; feature
//!   pipeline failures keep their own code (`SCHEMA_ERROR`, `UNKNOWN_CATEGORY`, ...)
//! - **Serializable**: errors serialize as `{code, message}` for the scoring boundary
//!
//! # Example
//!
//! ```no_run
//! use credit_learning::{LearningError, TrainingConfig};
//!
//! fn configure() -> Result<TrainingConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = TrainingConfig::builder().test_size(0.25).build()?;
//!     Ok(config)
//! }
//! ```

use credit_processing::PipelineError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for credit-learning operations.
///
/// This enum covers all error conditions that can occur during:
/// - Training configuration and validation
/// - Attribute selection and model training
/// - Artifact loading
/// - Request validation and scoring
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the trainer.
    ///
    /// Check the error message for details on which configuration value is invalid
    /// and what values are accepted.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or scoring.
    ///
    /// Common causes:
    /// - Too few rows to split into train and test parts
    /// - Label values outside the configured label mapping
    /// - Feature matrix containing nulls
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The label column was not found in the training table.
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// Training could not produce a model.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// The model artifact was not found.
    ///
    /// Train a model first (`credit-scoring train`) or check the artifact directory.
    #[error("Model not found: {path}")]
    ModelNotFound {
        /// The path that was not found.
        path: String,
    },

    /// An error occurred during inference.
    ///
    /// Common causes:
    /// - Selector and model artifacts come from different training runs
    /// - Feature matrix does not match the model's expected width
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// A failure inside the feature pipeline.
    ///
    /// The pipeline's own error code is preserved by [`LearningError::error_code()`].
    #[error(transparent)]
    Processing(#[from] PipelineError),

    /// I/O error during artifact or request file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a request or artifact.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl LearningError {
    /// Stable error code for clients of the scoring boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::InferenceError(_) => "INFERENCE_ERROR",
            Self::Processing(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }

    /// Shorthand for a schema error raised at the scoring boundary.
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Processing(PipelineError::Schema(message.into()))
    }
}

impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_forwards_pipeline_code() {
        let err = LearningError::from(PipelineError::UnknownCategory {
            column: "profissao".to_string(),
            value: "Astronauta".to_string(),
        });
        assert_eq!(err.error_code(), "UNKNOWN_CATEGORY");
        assert_eq!(LearningError::schema("bad").error_code(), "SCHEMA_ERROR");
        assert_eq!(
            LearningError::TargetNotFound("classe".to_string()).error_code(),
            "TARGET_NOT_FOUND"
        );
    }

    #[test]
    fn test_serializes_code_and_message() {
        let err = LearningError::ModelNotFound {
            path: "objects/model.json".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "MODEL_NOT_FOUND");
        assert_eq!(json["message"], "Model not found: objects/model.json");
    }
}
