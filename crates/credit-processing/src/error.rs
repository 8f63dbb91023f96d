//! Error types for the feature transformation pipeline.
//!
//! Every failure the pipeline can surface to a caller is a [`PipelineError`].
//! Errors are serializable as `{code, message}` so the scoring boundary can
//! hand them back to clients as a structured payload.
//!
//! Unparseable currency cells are not represented here: they are recovered
//! locally by the currency normalizer (see [`crate::cleaner::CurrencyParseError`]).

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the feature pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Column was not found in the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Input batch does not match the expected schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A required column carries nulls where the pipeline cannot fill them.
    #[error("Column '{column}' has {count} null value(s); nulls are not accepted here")]
    NullValue { column: String, count: usize },

    /// No persisted state exists for a requested column.
    #[error("No persisted {kind} state for column '{column}' (expected at {})", path.display())]
    MissingState {
        kind: &'static str,
        column: String,
        path: PathBuf,
    },

    /// A categorical value was never observed when the encoder was fit.
    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    /// Ratio denominator was zero under the `Error` policy.
    #[error("Division by zero deriving '{column}' at row {row}")]
    ZeroDivision { column: String, row: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

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
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for clients of the scoring boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Schema(_) => "SCHEMA_ERROR",
            Self::NullValue { .. } => "SCHEMA_ERROR",
            Self::MissingState { .. } => "MISSING_STATE",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::ZeroDivision { .. } => "ZERO_DIVISION",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True for schema problems detected before any transformation runs.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::Schema(_) | Self::NullValue { .. } | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }

    /// True when persisted state is absent or does not cover the input.
    pub fn is_state_error(&self) -> bool {
        match self {
            Self::MissingState { .. } | Self::UnknownCategory { .. } => true,
            Self::WithContext { source, .. } => source.is_state_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

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
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::ColumnNotFound("renda".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            PipelineError::UnknownCategory {
                column: "profissao".to_string(),
                value: "Astronauta".to_string(),
            }
            .error_code(),
            "UNKNOWN_CATEGORY"
        );
        assert_eq!(
            PipelineError::NullValue {
                column: "renda".to_string(),
                count: 1
            }
            .error_code(),
            "SCHEMA_ERROR"
        );
    }

    #[test]
    fn test_error_classification() {
        let missing = PipelineError::MissingState {
            kind: "scaler",
            column: "renda".to_string(),
            path: PathBuf::from("objects/scaler_renda.json"),
        };
        assert!(missing.is_state_error());
        assert!(!missing.is_schema_error());

        let schema = PipelineError::Schema("length mismatch".to_string());
        assert!(schema.is_schema_error());
        assert!(!schema.is_state_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::UnknownCategory {
            column: "profissao".to_string(),
            value: "Astronauta".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNKNOWN_CATEGORY"));
        assert!(json.contains("Astronauta"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::MissingState {
            kind: "encoder",
            column: "produto".to_string(),
            path: PathBuf::from("objects/label_encoder_produto.json"),
        }
        .with_context("Loading fitted state");
        assert!(error.to_string().contains("Loading fitted state"));
        // Preserves original code and classification
        assert_eq!(error.error_code(), "MISSING_STATE");
        assert!(error.is_state_error());
    }
}
