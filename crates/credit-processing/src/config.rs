//! Configuration types for the feature pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! The defaults reproduce the production credit-scoring setup; any change
//! to bounds, vocabularies or column lists must be made before fitting and
//! kept for the lifetime of the fitted artifacts.

use crate::schema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the ratio feature does when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ZeroDivisionPolicy {
    /// Emit 0.0 for the row.
    #[default]
    Zero,
    /// Emit null for the row.
    Null,
    /// Fail the whole call.
    Error,
}

/// Inclusive valid range of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl OutlierBounds {
    pub fn new(column: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            column: column.into(),
            min,
            max,
        }
    }

    /// Check whether a value lies within `[min, max]`.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ordered list of accepted values for a free-text categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalVocabulary {
    pub column: String,
    pub values: Vec<String>,
}

impl CanonicalVocabulary {
    pub fn new<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A derived `numerator / denominator` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioFeature {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

impl Default for RatioFeature {
    fn default() -> Self {
        Self {
            name: schema::PROPORCAO_SOLICITADO_TOTAL.to_string(),
            numerator: schema::VALOR_SOLICITADO.to_string(),
            denominator: schema::VALOR_TOTAL_BEM.to_string(),
        }
    }
}

/// Configuration for the feature pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use credit_processing::config::{PipelineConfig, ZeroDivisionPolicy};
///
/// let config = PipelineConfig::builder()
///     .artifact_dir("objects")
///     .zero_division(ZeroDivisionPolicy::Error)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the persisted scaler and encoder artifacts.
    /// Default: "objects"
    pub artifact_dir: PathBuf,

    /// Columns holding locale-formatted currency strings.
    pub currency_columns: Vec<String>,

    /// Numeric columns to standardize (ratio column included).
    pub numeric_columns: Vec<String>,

    /// Categorical columns to integer-encode.
    pub categorical_columns: Vec<String>,

    /// Training label column. Never scaled, encoded or imputed.
    /// Default: "classe"
    pub label_column: String,

    /// Free-text columns corrected against a canonical vocabulary.
    /// Default: profession only.
    pub corrections: Vec<CanonicalVocabulary>,

    /// Valid ranges for outlier clamping.
    /// Default: tempoprofissao [0, 70], idade [0, 110]
    pub outlier_bounds: Vec<OutlierBounds>,

    /// The derived ratio feature.
    pub ratio: RatioFeature,

    /// Behaviour of the ratio feature on a zero denominator.
    /// Default: Zero
    pub zero_division: ZeroDivisionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("objects"),
            currency_columns: to_strings(&schema::CURRENCY_COLUMNS),
            numeric_columns: to_strings(&schema::NUMERIC_COLUMNS),
            categorical_columns: to_strings(&schema::CATEGORICAL_COLUMNS),
            label_column: schema::CLASSE.to_string(),
            corrections: vec![CanonicalVocabulary::new(
                schema::PROFISSAO,
                schema::PROFESSIONS,
            )],
            outlier_bounds: vec![
                OutlierBounds::new(schema::TEMPO_PROFISSAO, 0.0, 70.0),
                OutlierBounds::new(schema::IDADE, 0.0, 110.0),
            ],
            ratio: RatioFeature::default(),
            zero_division: ZeroDivisionPolicy::default(),
        }
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for bounds in &self.outlier_bounds {
            if !bounds.min.is_finite() || !bounds.max.is_finite() || bounds.min > bounds.max {
                return Err(ConfigValidationError::InvalidBounds {
                    column: bounds.column.clone(),
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }

        for vocab in &self.corrections {
            if vocab.values.is_empty() {
                return Err(ConfigValidationError::EmptyVocabulary(vocab.column.clone()));
            }
        }

        if let Some(col) = self
            .numeric_columns
            .iter()
            .find(|c| self.categorical_columns.contains(c))
        {
            return Err(ConfigValidationError::OverlappingColumn(col.clone()));
        }

        if self.numeric_columns.contains(&self.label_column)
            || self.categorical_columns.contains(&self.label_column)
        {
            return Err(ConfigValidationError::LabelIsFeature(
                self.label_column.clone(),
            ));
        }

        Ok(())
    }

    /// All columns the fitted state covers, numeric first.
    pub fn feature_columns(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .cloned()
            .collect()
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid outlier bounds for '{column}': [{min}, {max}]")]
    InvalidBounds { column: String, min: f64, max: f64 },

    #[error("Canonical vocabulary for '{0}' is empty")]
    EmptyVocabulary(String),

    #[error("Column '{0}' is listed as both numeric and categorical")]
    OverlappingColumn(String),

    #[error("Label column '{0}' cannot also be a feature")]
    LabelIsFeature(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    artifact_dir: Option<PathBuf>,
    currency_columns: Option<Vec<String>>,
    numeric_columns: Option<Vec<String>>,
    categorical_columns: Option<Vec<String>>,
    label_column: Option<String>,
    corrections: Option<Vec<CanonicalVocabulary>>,
    outlier_bounds: Option<Vec<OutlierBounds>>,
    ratio: Option<RatioFeature>,
    zero_division: Option<ZeroDivisionPolicy>,
}

impl PipelineConfigBuilder {
    /// Set the directory for persisted artifacts.
    pub fn artifact_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(path.into());
        self
    }

    /// Set the currency-string columns.
    pub fn currency_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currency_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the numeric columns to standardize.
    pub fn numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the categorical columns to encode.
    pub fn categorical_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the label column.
    pub fn label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    /// Replace the canonical vocabularies used by the corrector.
    pub fn corrections(mut self, corrections: Vec<CanonicalVocabulary>) -> Self {
        self.corrections = Some(corrections);
        self
    }

    /// Replace the outlier bounds.
    pub fn outlier_bounds(mut self, bounds: Vec<OutlierBounds>) -> Self {
        self.outlier_bounds = Some(bounds);
        self
    }

    /// Set the derived ratio feature.
    pub fn ratio(mut self, ratio: RatioFeature) -> Self {
        self.ratio = Some(ratio);
        self
    }

    /// Set the zero-denominator policy of the ratio feature.
    pub fn zero_division(mut self, policy: ZeroDivisionPolicy) -> Self {
        self.zero_division = Some(policy);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            artifact_dir: self.artifact_dir.unwrap_or(defaults.artifact_dir),
            currency_columns: self.currency_columns.unwrap_or(defaults.currency_columns),
            numeric_columns: self.numeric_columns.unwrap_or(defaults.numeric_columns),
            categorical_columns: self
                .categorical_columns
                .unwrap_or(defaults.categorical_columns),
            label_column: self.label_column.unwrap_or(defaults.label_column),
            corrections: self.corrections.unwrap_or(defaults.corrections),
            outlier_bounds: self.outlier_bounds.unwrap_or(defaults.outlier_bounds),
            ratio: self.ratio.unwrap_or(defaults.ratio),
            zero_division: self.zero_division.unwrap_or(defaults.zero_division),
        };

        config.validate()?;
        Ok(config)
    }
}
