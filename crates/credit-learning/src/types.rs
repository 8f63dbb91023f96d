//! Common types used throughout the credit-learning crate.
//!
//! This module defines result types, metrics, and other data structures
//! returned by the trainer, the classifier and the scoring service.
//!
//! # Overview
//!
//! - [`TrainingResult`]: Complete result from [`Trainer::train()`](crate::Trainer::train)
//! - [`TrainingHistory`]: Per-epoch losses and the early-stopping outcome
//! - [`ClassificationReport`]: Accuracy, per-class metrics and confusion matrix
//! - [`Prediction`]: One scored row, as returned to clients

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a training run.
///
/// Returned by [`Trainer::train()`](crate::Trainer::train). All artifacts are
/// already persisted under `artifact_dir` when this is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingResult {
    /// Rows the scalers, encoders, selector and model were fitted on.
    pub train_rows: usize,

    /// Rows evaluated.
    ///
    /// Test rows with a category never seen in training are dropped before
    /// evaluation and reported in `warnings`.
    pub test_rows: usize,

    /// Attributes kept by the selector, in training order.
    pub selected_features: Vec<String>,

    /// Evaluation on the test part.
    pub report: ClassificationReport,

    /// Loss curves and early-stopping outcome.
    pub history: TrainingHistory,

    /// Directory holding every persisted artifact.
    pub artifact_dir: PathBuf,

    /// Total training time in seconds.
    pub training_time_seconds: f64,

    /// Non-fatal issues that occurred during training.
    pub warnings: Vec<String>,
}

/// Loss curves of one classifier fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Epochs actually run (early stopping may end before the configured maximum).
    pub epochs_run: usize,

    /// 1-based epoch whose weights were kept.
    pub best_epoch: usize,

    /// Validation loss of the kept weights.
    pub best_val_loss: f64,

    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of true rows of this class.
    pub support: usize,
}

/// Binary confusion matrix; rows are actual classes, columns predicted,
/// negative class first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    /// Count outcomes of 0/1 predictions against 0/1 truth.
    pub fn from_predictions(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut matrix = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1.0, p == 1.0) {
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (true, true) => matrix.true_positive += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// `[[tn, fp], [fn, tp]]`
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

/// Evaluation of a binary classifier on held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Fraction of correct predictions. Range: [0.0, 1.0].
    pub accuracy: f64,

    /// Negative class first, then positive.
    pub classes: Vec<ClassMetrics>,

    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    /// Build the report from 0/1 truth and predictions.
    ///
    /// Undefined ratios (no predicted or no true rows of a class) are 0.
    pub fn from_predictions(
        y_true: &[f64],
        y_pred: &[f64],
        negative_label: &str,
        positive_label: &str,
    ) -> Self {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
        let total = cm.total();
        let accuracy = ratio(cm.true_positive + cm.true_negative, total);

        let negative = class_metrics(
            negative_label,
            cm.true_negative,
            cm.false_negative,
            cm.false_positive,
        );
        let positive = class_metrics(
            positive_label,
            cm.true_positive,
            cm.false_positive,
            cm.false_negative,
        );

        Self {
            accuracy,
            classes: vec![negative, positive],
            confusion_matrix: cm,
        }
    }

    /// Metrics of one class by label.
    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

fn class_metrics(label: &str, hits: usize, false_claims: usize, misses: usize) -> ClassMetrics {
    let precision = ratio(hits, hits + false_claims);
    let recall = ratio(hits, hits + misses);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        label: label.to_string(),
        precision,
        recall,
        f1_score,
        support: hits + misses,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// One scored row.
///
/// Field names follow the wire format of the scoring boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of the positive class. Range: [0.0, 1.0].
    #[serde(rename = "probabilidade")]
    pub probability: f64,

    /// `bom` iff `probability` is strictly above the decision threshold.
    #[serde(rename = "classe")]
    pub class: String,
}
