//! Binary logistic-regression classifier.
//!
//! This module provides [`LogisticModel`], the scoring model of the credit
//! pipeline:
//!
//! - **Training** via [`fit()`](LogisticModel::fit): seeded mini-batch gradient
//!   descent with an L2 penalty, early stopping on a trailing validation split
//!   and restoration of the best weights
//! - **Inference** via [`predict_proba()`](LogisticModel::predict_proba) and
//!   [`classify()`](LogisticModel::classify)
//! - **Serialization** via [`save()`](LogisticModel::save) and
//!   [`load()`](LogisticModel::load) (`model.json`)
//!
//! The persisted model carries the attribute names it expects, the decision
//! threshold and both class labels, so a scorer needs nothing else to turn a
//! probability into `bom` / `ruim`.
//!
//! # Example
//!
//! ```rust,ignore
//! use credit_learning::{LogisticModel, TrainingConfig};
//!
//! let config = TrainingConfig::default();
//! let (model, history) = LogisticModel::fit(&x_train, &y_train, feature_names, &config)?;
//! println!("stopped after {} epochs", history.epochs_run);
//!
//! let probabilities = model.predict_proba(&x_test)?;
//! ```

use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use crate::types::TrainingHistory;
use credit_processing::ArtifactStore;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const MODEL_FILE: &str = "model.json";

/// Probabilities are clipped to `[EPS, 1 - EPS]` inside the log loss.
const EPS: f64 = 1e-7;

/// Half-width of the uniform weight initialisation.
const INIT_SCALE: f64 = 0.01;

/// A trained logistic-regression model ready for inference.
///
/// Immutable once trained or loaded; `Send + Sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Attribute names, in the column order of the input matrix.
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    /// A row is positive iff its probability is strictly above this.
    pub threshold: f64,
    pub positive_label: String,
    pub negative_label: String,
}

static_assertions::assert_impl_all!(LogisticModel: Send, Sync);

impl LogisticModel {
    /// Train on `x` (rows × attributes) against a 0/1 target.
    ///
    /// The last `validation_split` fraction of the rows is held out for early
    /// stopping. Training stops after `patience` epochs without a lower
    /// validation loss and the best weights seen are kept.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        feature_names: Vec<String>,
        config: &TrainingConfig,
    ) -> Result<(Self, TrainingHistory)> {
        let (n_rows, n_features) = x.dim();
        if feature_names.len() != n_features {
            return Err(LearningError::InvalidData(format!(
                "{} attribute names for a matrix with {} columns",
                feature_names.len(),
                n_features
            )));
        }
        if y.len() != n_rows {
            return Err(LearningError::InvalidData(format!(
                "target has {} rows, matrix has {}",
                y.len(),
                n_rows
            )));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(LearningError::InvalidData(
                "target must contain only 0 and 1".to_string(),
            ));
        }

        // Keras-style split: the trailing rows validate
        let n_val = (n_rows as f64 * config.validation_split).floor() as usize;
        let n_fit = n_rows - n_val;
        if n_fit == 0 {
            return Err(LearningError::TrainingFailed(format!(
                "no training rows left after a {:.0}% validation split of {} rows",
                config.validation_split * 100.0,
                n_rows
            )));
        }

        let x_fit = x.slice(ndarray::s![..n_fit, ..]).to_owned();
        let y_fit = y.slice(ndarray::s![..n_fit]).to_owned();
        let (x_val, y_val) = if n_val > 0 {
            (
                x.slice(ndarray::s![n_fit.., ..]).to_owned(),
                y.slice(ndarray::s![n_fit..]).to_owned(),
            )
        } else {
            debug!("No validation rows; early stopping monitors the training loss");
            (x_fit.clone(), y_fit.clone())
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut model = Self {
            feature_names,
            weights: (0..n_features)
                .map(|_| rng.gen_range(-INIT_SCALE..INIT_SCALE))
                .collect(),
            bias: 0.0,
            threshold: config.decision_threshold,
            positive_label: config.positive_label.clone(),
            negative_label: config.negative_label.clone(),
        };

        let mut weights = Array1::from(model.weights.clone());
        let mut bias = 0.0;
        let mut best = (weights.clone(), bias);
        let mut history = TrainingHistory::default();
        let mut best_val = f64::INFINITY;
        let mut wait = 0;

        let mut order: Vec<usize> = (0..n_fit).collect();
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);

            for batch in order.chunks(config.batch_size) {
                let xb = x_fit.select(Axis(0), batch);
                let yb = y_fit.select(Axis(0), batch);
                let m = batch.len() as f64;

                let errors = sigmoid(&(xb.dot(&weights) + bias)) - &yb;
                let grad_w = xb.t().dot(&errors) / m + config.l2 * &weights;
                let grad_b = errors.sum() / m;

                weights = weights - config.learning_rate * grad_w;
                bias -= config.learning_rate * grad_b;
            }

            let train_loss = loss(&x_fit, &y_fit, &weights, bias, config.l2);
            let val_loss = loss(&x_val, &y_val, &weights, bias, config.l2);
            history.train_loss.push(train_loss);
            history.val_loss.push(val_loss);
            history.epochs_run = epoch + 1;

            if val_loss < best_val {
                best_val = val_loss;
                best = (weights.clone(), bias);
                history.best_epoch = epoch + 1;
                wait = 0;
            } else {
                wait += 1;
                if wait >= config.patience {
                    debug!("Early stopping at epoch {} (best {})", epoch + 1, history.best_epoch);
                    break;
                }
            }
        }

        if !best_val.is_finite() {
            return Err(LearningError::TrainingFailed(
                "validation loss never became finite".to_string(),
            ));
        }

        history.best_val_loss = best_val;
        model.weights = best.0.to_vec();
        model.bias = best.1;

        info!(
            "Trained on {} rows ({} validation): {} epochs, best val_loss {:.4} at epoch {}",
            n_fit, n_val, history.epochs_run, history.best_val_loss, history.best_epoch
        );
        Ok((model, history))
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.weights.len() {
            return Err(LearningError::InferenceError(format!(
                "model expects {} attributes, got {}",
                self.weights.len(),
                x.ncols()
            )));
        }
        let weights = Array1::from(self.weights.clone());
        Ok(sigmoid(&(x.dot(&weights) + self.bias)))
    }

    /// Class label for a probability.
    pub fn classify(&self, probability: f64) -> &str {
        if probability > self.threshold {
            &self.positive_label
        } else {
            &self.negative_label
        }
    }

    pub fn save(&self, store: &ArtifactStore) -> Result<PathBuf> {
        Ok(store.save_json(MODEL_FILE, self)?)
    }

    /// Load `model.json`. An absent file is [`LearningError::ModelNotFound`].
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        let path = store.dir().join(MODEL_FILE);
        if !path.is_file() {
            return Err(LearningError::ModelNotFound {
                path: path.display().to_string(),
            });
        }
        let model: Self = store.load_json(MODEL_FILE, "model", "classifier")?;
        if model.weights.len() != model.feature_names.len() {
            return Err(LearningError::InferenceError(format!(
                "corrupt model: {} weights for {} attributes",
                model.weights.len(),
                model.feature_names.len()
            )));
        }
        Ok(model)
    }
}

fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
    z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

/// Mean binary cross-entropy plus `l2 / 2 · ‖w‖²`.
fn loss(x: &Array2<f64>, y: &Array1<f64>, weights: &Array1<f64>, bias: f64, l2: f64) -> f64 {
    let p = sigmoid(&(x.dot(weights) + bias));
    let n = y.len().max(1) as f64;
    let bce = p
        .iter()
        .zip(y.iter())
        .map(|(&p, &t)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / n;
    bce + 0.5 * l2 * weights.dot(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    /// Separable on the first attribute; the second is noise.
    fn separable() -> (Array2<f64>, Array1<f64>) {
        let mut rows = Vec::new();
        let mut target = Vec::new();
        for i in 0..40 {
            let positive = i % 2 == 0;
            let signal = if positive { 1.5 } else { -1.5 } + (i % 5) as f64 * 0.1;
            rows.extend_from_slice(&[signal, ((i * 7) % 11) as f64 / 11.0 - 0.5]);
            target.push(if positive { 1.0 } else { 0.0 });
        }
        (
            Array2::from_shape_vec((40, 2), rows).unwrap(),
            Array1::from(target),
        )
    }

    fn names() -> Vec<String> {
        vec!["renda".to_string(), "dependentes".to_string()]
    }

    fn config() -> TrainingConfig {
        TrainingConfig::builder()
            .epochs(200)
            .learning_rate(0.1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = separable();
        let (model, history) = LogisticModel::fit(&x, &y, names(), &config()).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));

        let correct = proba
            .iter()
            .zip(y.iter())
            .filter(|&(&p, &t)| (p > 0.5) == (t == 1.0))
            .count();
        assert_eq!(correct, 40);
        assert!(model.weights[0] > 0.0);
        assert!(history.epochs_run >= history.best_epoch);
        assert_eq!(history.train_loss.len(), history.epochs_run);
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let (x, y) = separable();
        let (a, _) = LogisticModel::fit(&x, &y, names(), &config()).unwrap();
        let (b, _) = LogisticModel::fit(&x, &y, names(), &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_early_stopping_restores_best_epoch() {
        let (x, y) = separable();
        let config = TrainingConfig::builder()
            .epochs(500)
            .patience(3)
            .build()
            .unwrap();
        let (_, history) = LogisticModel::fit(&x, &y, names(), &config).unwrap();

        let best = history.val_loss[history.best_epoch - 1];
        assert_eq!(best, history.best_val_loss);
        assert!(history.val_loss.iter().all(|&l| l >= best));
        assert!(history.epochs_run <= history.best_epoch + 3);
    }

    #[test]
    fn test_rejects_non_binary_target() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 2.0];
        let err = LogisticModel::fit(&x, &y, vec!["a".to_string()], &config()).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));
    }

    #[test]
    fn test_classify_is_strictly_above_threshold() {
        let model = LogisticModel {
            feature_names: vec!["a".to_string()],
            weights: vec![0.0],
            bias: 0.0,
            threshold: 0.5,
            positive_label: "bom".to_string(),
            negative_label: "ruim".to_string(),
        };
        assert_eq!(model.classify(0.5), "ruim");
        assert_eq!(model.classify(0.5001), "bom");

        // Zero weights give exactly 0.5
        let p = model.predict_proba(&array![[3.0]]).unwrap();
        assert_eq!(p[0], 0.5);
        assert!(model.predict_proba(&array![[3.0, 1.0]]).is_err());
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            LogisticModel::load(&store).unwrap_err(),
            LearningError::ModelNotFound { .. }
        ));

        let (x, y) = separable();
        let (model, _) = LogisticModel::fit(&x, &y, names(), &config()).unwrap();
        model.save(&store).unwrap();
        assert_eq!(LogisticModel::load(&store).unwrap(), model);
    }
}
