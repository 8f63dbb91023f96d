//! Configuration for the training job.
//!
//! This module provides [`TrainingConfig`] and its builder.
//!
//! # Example
//!
//! ```
//! use credit_learning::TrainingConfig;
//!
//! let config = TrainingConfig::builder()
//!     .test_size(0.2)
//!     .n_features_to_select(10)
//!     .seed(41)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use serde::{Deserialize, Serialize};

/// Configuration for attribute selection, classifier training and evaluation.
///
/// Use [`TrainingConfig::builder()`] to construct a configuration with the builder pattern.
/// Every stochastic step (train/test split, mini-batch shuffling, weight
/// initialisation) draws from its own generator seeded with `seed`.
///
/// # Validation
///
/// The builder validates the following constraints on [`build()`](TrainingConfigBuilder::build):
/// - `test_size` and `validation_split` must be in range `(0.0, 1.0)`
/// - `n_features_to_select`, `rfe_step`, `epochs`, `batch_size` and `patience` must be at least 1
/// - `learning_rate` must be positive, `l2` non-negative
/// - `decision_threshold` must be in `[0.0, 1.0]`
/// - the two class labels must differ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation (default: 0.2).
    pub test_size: f64,

    /// Number of attributes kept by the selector (default: 10).
    ///
    /// Capped at the number of available feature columns.
    pub n_features_to_select: usize,

    /// Attributes eliminated per selection round (default: 1).
    pub rfe_step: usize,

    /// Maximum training epochs (default: 500).
    pub epochs: usize,

    /// Gradient descent step size (default: 0.05).
    pub learning_rate: f64,

    /// L2 penalty on the weights (default: 0.01).
    pub l2: f64,

    /// Mini-batch size (default: 10).
    pub batch_size: usize,

    /// Trailing fraction of the training rows used for early stopping (default: 0.2).
    pub validation_split: f64,

    /// Epochs without validation-loss improvement before stopping (default: 10).
    pub patience: usize,

    /// A row is classified positive iff its probability is strictly above this (default: 0.5).
    pub decision_threshold: f64,

    /// Seed for every stochastic step (default: 41).
    pub seed: u64,

    /// Label mapped to 0 (default: "ruim").
    pub negative_label: String,

    /// Label mapped to 1 (default: "bom").
    pub positive_label: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            n_features_to_select: 10,
            rfe_step: 1,
            epochs: 500,
            learning_rate: 0.05,
            l2: 0.01,
            batch_size: 10,
            validation_split: 0.2,
            patience: 10,
            decision_threshold: 0.5,
            seed: 41,
            negative_label: "ruim".to_string(),
            positive_label: "bom".to_string(),
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Map a label to its class index, if it is one of the two configured labels.
    pub fn label_index(&self, label: &str) -> Option<f64> {
        if label == self.positive_label {
            Some(1.0)
        } else if label == self.negative_label {
            Some(0.0)
        } else {
            None
        }
    }

    /// Check every constraint listed on [`TrainingConfig`].
    pub fn validate(&self) -> Result<(), LearningError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(LearningError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }
        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(LearningError::InvalidConfig(
                "validation_split must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        for (name, value) in [
            ("n_features_to_select", self.n_features_to_select),
            ("rfe_step", self.rfe_step),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("patience", self.patience),
        ] {
            if value == 0 {
                return Err(LearningError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(LearningError::InvalidConfig(
                "learning_rate must be positive".to_string(),
            ));
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err(LearningError::InvalidConfig(
                "l2 must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(LearningError::InvalidConfig(
                "decision_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.positive_label == self.negative_label {
            return Err(LearningError::InvalidConfig(format!(
                "positive and negative labels must differ (both '{}')",
                self.positive_label
            )));
        }
        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. All setters return `self` to allow
/// method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the test fraction (default: 0.2).
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the number of attributes to keep (default: 10).
    #[must_use]
    pub fn n_features_to_select(mut self, n: usize) -> Self {
        self.config.n_features_to_select = n;
        self
    }

    /// Set the number of attributes eliminated per round (default: 1).
    #[must_use]
    pub fn rfe_step(mut self, step: usize) -> Self {
        self.config.rfe_step = step;
        self
    }

    /// Set the maximum number of epochs (default: 500).
    #[must_use]
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.config.epochs = epochs;
        self
    }

    /// Set the learning rate (default: 0.05).
    #[must_use]
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.config.learning_rate = lr;
        self
    }

    /// Set the L2 penalty (default: 0.01).
    #[must_use]
    pub fn l2(mut self, l2: f64) -> Self {
        self.config.l2 = l2;
        self
    }

    /// Set the mini-batch size (default: 10).
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the early-stopping validation fraction (default: 0.2).
    #[must_use]
    pub fn validation_split(mut self, split: f64) -> Self {
        self.config.validation_split = split;
        self
    }

    /// Set the early-stopping patience (default: 10).
    #[must_use]
    pub fn patience(mut self, patience: usize) -> Self {
        self.config.patience = patience;
        self
    }

    /// Set the decision threshold (default: 0.5).
    #[must_use]
    pub fn decision_threshold(mut self, threshold: f64) -> Self {
        self.config.decision_threshold = threshold;
        self
    }

    /// Set the random seed (default: 41).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the two class labels.
    #[must_use]
    pub fn labels(mut self, negative: impl Into<String>, positive: impl Into<String>) -> Self {
        self.config.negative_label = negative.into();
        self.config.positive_label = positive.into();
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any constraint listed on
    /// [`TrainingConfig`] is violated.
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
