//! Training job orchestration.
//!
//! This module provides [`Trainer`], which runs the whole offline job on a raw
//! training table:
//!
//! 1. Clean the whole table (currency, imputation, correction, outliers, ratio)
//! 2. Seeded train/test split
//! 3. Fit scalers and encoders on the training rows only and persist them
//! 4. Transform the test rows with that persisted state
//! 5. Fit and persist the attribute selector
//! 6. Train and persist the classifier
//! 7. Evaluate on the test rows
//!
//! # Example
//!
//! ```rust,ignore
//! use credit_learning::{Trainer, TrainingConfig};
//! use credit_processing::FeaturePipeline;
//!
//! let trainer = Trainer::builder()
//!     .config(TrainingConfig::default())
//!     .pipeline(FeaturePipeline::builder().artifact_dir("objects").build()?)
//!     .build()?;
//!
//! let result = trainer.train(raw_df)?;
//! println!("accuracy: {:.3}", result.report.accuracy);
//! ```

use crate::config::TrainingConfig;
use crate::data::{feature_matrix, retain_columns, target_vector, train_test_split};
use crate::error::{LearningError, Result};
use crate::model::LogisticModel;
use crate::selector::AttributeSelector;
use crate::types::{ClassificationReport, TrainingResult};
use credit_processing::{
    FeaturePipeline, FittedState, PipelineConfig, PipelineMode, PipelineSummary,
};
use polars::prelude::*;
use std::time::Instant;
use tracing::{info, warn};

/// The offline training job.
///
/// Use [`Trainer::builder()`] to create one. Artifacts are written to the
/// feature pipeline's artifact directory.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    pipeline: FeaturePipeline,
}

impl Trainer {
    /// Create a new trainer builder.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    /// Run the training job on a raw table.
    ///
    /// # Errors
    ///
    /// - [`LearningError::TargetNotFound`] if the label column is absent
    /// - [`LearningError::InvalidData`] for unknown labels or too few rows
    /// - [`LearningError::TrainingFailed`] if no test row survives or the
    ///   classifier cannot be fitted
    /// - [`LearningError::Processing`] for any feature pipeline failure
    pub fn train(&self, raw: DataFrame) -> Result<TrainingResult> {
        let start = Instant::now();
        let label = self.pipeline.config().label_column.clone();
        let store = self.pipeline.store();
        let mut warnings = Vec::new();

        if raw.column(&label).is_err() {
            return Err(LearningError::TargetNotFound(label));
        }

        let (raw, dropped) = retain_columns(raw, &input_columns(self.pipeline.config()))?;
        if !dropped.is_empty() {
            let message = format!(
                "column(s) outside the feature set ignored: {}",
                dropped.join(", ")
            );
            warn!("{}", message);
            warnings.push(message);
        }

        info!("Step 1: Cleaning {} raw rows...", raw.height());
        let cleaned = self.pipeline.clean(raw)?.data;

        info!("Step 2: Splitting train/test (test_size = {})...", self.config.test_size);
        let (mut train, test) = train_test_split(&cleaned, self.config.test_size, self.config.seed)?;

        info!("Step 3: Fitting scalers and encoders on {} training rows...", train.height());
        let mut summary = PipelineSummary::new(PipelineMode::Fit, train.height(), train.width());
        let state = self.pipeline.fit_state(&mut train, &mut summary)?;

        info!("Step 4: Transforming {} test rows with persisted state...", test.height());
        let (test, dropped) =
            drop_unseen_categories(test, &state, &self.pipeline.config().categorical_columns)?;
        if dropped > 0 {
            let message = format!(
                "{} test row(s) with categories unseen in training excluded from evaluation",
                dropped
            );
            warn!("{}", message);
            warnings.push(message);
        }
        if test.height() == 0 {
            return Err(LearningError::TrainingFailed(
                "no test rows left to evaluate".to_string(),
            ));
        }
        let test = self.pipeline.transform(test, &state)?.data;

        info!("Step 5: Selecting attributes...");
        let names = self.pipeline.config().feature_columns();
        let x_train = feature_matrix(&train, &names)?;
        let y_train = target_vector(&train, &self.config, &label)?;
        if y_train.iter().all(|&v| v == y_train[0]) {
            let message = "training rows contain a single class".to_string();
            warn!("{}", message);
            warnings.push(message);
        }

        let selector = AttributeSelector::fit(
            &x_train,
            &y_train,
            &names,
            self.config.n_features_to_select,
            self.config.rfe_step,
        )?;
        selector.save(store)?;

        info!("Step 6: Training classifier...");
        let x_train = feature_matrix(&selector.transform(&train)?, selector.selected())?;
        let (model, history) = LogisticModel::fit(
            &x_train,
            &y_train,
            selector.selected().to_vec(),
            &self.config,
        )?;
        model.save(store)?;

        info!("Step 7: Evaluating on {} test rows...", test.height());
        let x_test = feature_matrix(&selector.transform(&test)?, selector.selected())?;
        let y_test = target_vector(&test, &self.config, &label)?;
        let y_pred: Vec<f64> = model
            .predict_proba(&x_test)?
            .iter()
            .map(|&p| if p > model.threshold { 1.0 } else { 0.0 })
            .collect();

        let report = ClassificationReport::from_predictions(
            &y_test.to_vec(),
            &y_pred,
            &self.config.negative_label,
            &self.config.positive_label,
        );

        let training_time_seconds = start.elapsed().as_secs_f64();
        info!(
            "Training complete in {:.2}s: accuracy {:.3} on {} test rows",
            training_time_seconds,
            report.accuracy,
            test.height()
        );

        Ok(TrainingResult {
            train_rows: train.height(),
            test_rows: test.height(),
            selected_features: selector.selected().to_vec(),
            report,
            history,
            artifact_dir: store.dir().to_path_buf(),
            training_time_seconds,
            warnings,
        })
    }
}

/// Raw columns the training job consumes: every feature, the ratio inputs
/// and the label. The ratio itself is kept when the table already carries it.
fn input_columns(config: &PipelineConfig) -> Vec<String> {
    let mut columns = config.feature_columns();
    for name in [
        &config.ratio.numerator,
        &config.ratio.denominator,
        &config.label_column,
    ] {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}

/// Remove rows whose categorical values have no code in `state`.
fn drop_unseen_categories(
    df: DataFrame,
    state: &FittedState,
    columns: &[String],
) -> Result<(DataFrame, usize)> {
    let mut keep = vec![true; df.height()];

    for col in columns {
        // Absent columns are reported by the transform's schema check
        let Ok(column) = df.column(col) else {
            continue;
        };
        let encoder = state.encoder(col)?;
        let values = column.as_materialized_series().cast(&DataType::String)?;
        for (row, value) in values.str()?.into_iter().enumerate() {
            if let Some(value) = value
                && encoder.encode(value).is_err()
            {
                keep[row] = false;
            }
        }
    }

    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped == 0 {
        return Ok((df, 0));
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((df.filter(&mask)?, dropped))
}

/// Builder for [`Trainer`].
#[derive(Debug, Default)]
pub struct TrainerBuilder {
    config: Option<TrainingConfig>,
    pipeline: Option<FeaturePipeline>,
}

impl TrainerBuilder {
    /// Set the training configuration (default: [`TrainingConfig::default()`]).
    #[must_use]
    pub fn config(mut self, config: TrainingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the feature pipeline (default: the default pipeline writing to `objects/`).
    #[must_use]
    pub fn pipeline(mut self, pipeline: FeaturePipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build the trainer.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if either configuration is invalid.
    pub fn build(self) -> Result<Trainer> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => FeaturePipeline::builder()
                .build()
                .map_err(|e| LearningError::InvalidConfig(e.to_string()))?,
        };

        Ok(Trainer { config, pipeline })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_processing::EncoderState;

    #[test]
    fn test_builder_defaults() {
        let trainer = Trainer::builder().build().unwrap();
        assert_eq!(trainer.config().seed, 41);
        assert_eq!(
            trainer.pipeline().store().dir(),
            std::path::Path::new("objects")
        );
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = TrainingConfig::default();
        config.test_size = 1.0;
        assert!(Trainer::builder().config(config).build().is_err());
    }

    #[test]
    fn test_missing_label_is_target_not_found() {
        let trainer = Trainer::builder().build().unwrap();
        let df = df!["renda" => [1.0, 2.0]].unwrap();
        let err = trainer.train(df).unwrap_err();
        assert_eq!(err.error_code(), "TARGET_NOT_FOUND");
    }

    #[test]
    fn test_input_columns_cover_features_ratio_inputs_and_label() {
        let mut config = PipelineConfig::default();
        config.numeric_columns = vec!["renda".to_string(), "proporcaosolicitadototal".to_string()];
        config.categorical_columns = vec!["produto".to_string()];

        assert_eq!(
            input_columns(&config),
            vec![
                "renda",
                "proporcaosolicitadototal",
                "produto",
                "valorsolicitado",
                "valortotalbem",
                "classe",
            ]
        );
    }

    #[test]
    fn test_drop_unseen_categories() {
        let state = FittedState::from_parts(
            "objects",
            Vec::new(),
            vec![EncoderState::fit("produto", ["DoubleDuty", "TrioTech"])],
        );
        let df = df![
            "produto" => ["DoubleDuty", "UltraSecure", "TrioTech"],
            "renda" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let (kept, dropped) = drop_unseen_categories(df, &state, &["produto".to_string()]).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(kept.height(), 2);
    }
}
