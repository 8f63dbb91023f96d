//! The feature pipeline and its builder.
//!
//! Both modes share the same step implementations:
//!
//! - **Fit**: currency → impute → correct → clamp → derive → fit scalers →
//!   fit encoders. State is persisted as it is fitted. Ratio nulls left by
//!   the `Null` zero-division policy are imputed right after derivation.
//! - **Transform**: validate → derive (if the ratio column is absent) →
//!   stored scalers → stored encoders. No imputation, no text correction.

use crate::cleaner::{CategoricalCorrector, CurrencyNormalizer};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::imputers::NullImputer;
use crate::pipeline::features::FeatureDeriver;
use crate::pipeline::outliers::OutlierClamper;
use crate::store::{ArtifactStore, EncoderStore, FittedState, ScalerStore};
use crate::types::{ActionType, PipelineAction, PipelineMode, PipelineSummary};
use crate::utils::{ensure_no_nulls, is_numeric_dtype, require_series};
use polars::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// A table produced by one pipeline run, with its run summary.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub data: DataFrame,
    pub summary: PipelineSummary,
}

/// The feature transformation pipeline.
///
/// Use [`FeaturePipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use credit_processing::FeaturePipeline;
///
/// let pipeline = FeaturePipeline::builder().artifact_dir("objects").build()?;
///
/// // Training
/// let (train, state) = pipeline.fit(raw_df)?;
///
/// // Serving
/// let state = pipeline.load_state()?;
/// let features = pipeline.transform(request_df, &state)?;
/// ```
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    store: ArtifactStore,
}

static_assertions::assert_impl_all!(FeaturePipeline: Send, Sync);

impl FeaturePipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> FeaturePipelineBuilder {
        FeaturePipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Load the persisted state for every configured feature column.
    pub fn load_state(&self) -> Result<FittedState> {
        FittedState::load(
            &self.store,
            &self.config.numeric_columns,
            &self.config.categorical_columns,
        )
    }

    /// Run the FIT sequence on a raw table.
    pub fn fit(&self, df: DataFrame) -> Result<(PipelineOutput, FittedState)> {
        let start = Instant::now();
        info!("Starting pipeline in fit mode ({} rows)", df.height());

        let cleaned = self.clean(df)?;
        let mut summary = cleaned.summary;
        let mut df = cleaned.data;

        let state = self.fit_state(&mut df, &mut summary)?;

        summary.columns_after = df.width();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!("Fit complete in {}ms", summary.duration_ms);
        Ok((PipelineOutput { data: df, summary }, state))
    }

    /// The cleaning half of FIT: currency parsing, imputation, correction,
    /// outlier clamping and feature derivation. Nothing is persisted.
    pub fn clean(&self, mut df: DataFrame) -> Result<PipelineOutput> {
        let start = Instant::now();
        let mut summary = PipelineSummary::new(PipelineMode::Fit, df.height(), df.width());
        let mut steps = Vec::new();

        info!("Step 1: Parsing currency columns...");
        CurrencyNormalizer::normalize_columns(&mut df, &self.config.currency_columns, &mut steps)?;
        for col in &self.config.currency_columns {
            summary.add_action(PipelineAction::new(
                ActionType::CurrencyParsed,
                col,
                "Parsed locale-formatted amounts",
            ));
        }

        info!("Step 2: Imputing nulls...");
        let before = steps.len();
        NullImputer::impute_all(&mut df, &mut steps)?;
        for step in &steps[before..] {
            summary.add_action(PipelineAction::new(
                ActionType::ValueImputed,
                "dataset",
                step.clone(),
            ));
        }

        info!("Step 3: Correcting categorical values...");
        for vocab in &self.config.corrections {
            let before = steps.len();
            CategoricalCorrector::correct_column(&mut df, vocab, &mut steps)?;
            if steps.len() > before {
                summary.add_action(PipelineAction::new(
                    ActionType::CategoryCorrected,
                    &vocab.column,
                    steps[before].clone(),
                ));
            }
        }

        info!("Step 4: Clamping outliers...");
        for bounds in &self.config.outlier_bounds {
            let replaced = OutlierClamper::clamp_column(&mut df, bounds, &mut steps)?;
            if replaced > 0 {
                summary.add_action(
                    PipelineAction::new(
                        ActionType::OutlierHandled,
                        &bounds.column,
                        format!("Replaced {} out-of-range value(s)", replaced),
                    )
                    .with_details(format!("bounds [{}, {}]", bounds.min, bounds.max)),
                );
            }
        }

        info!("Step 5: Deriving features...");
        self.derive(&mut df, &mut summary, &mut steps)?;
        // Under the Null policy a zero denominator leaves a hole that step 2
        // has already passed; fill it the same way
        let ratio = &self.config.ratio.name;
        if NullImputer::impute_column(&mut df, ratio, &mut steps)? {
            summary.add_action(PipelineAction::new(
                ActionType::ValueImputed,
                ratio,
                "Filled ratio rows with a zero denominator with the median",
            ));
        }

        summary.processing_steps = steps;
        summary.columns_after = df.width();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(PipelineOutput { data: df, summary })
    }

    /// Fit, persist and apply scalers and encoders to a cleaned table.
    pub fn fit_state(&self, df: &mut DataFrame, summary: &mut PipelineSummary) -> Result<FittedState> {
        info!("Step 6: Fitting scalers...");
        let scalers = ScalerStore::fit_transform(
            df,
            &self.config.numeric_columns,
            &self.store,
            &mut summary.processing_steps,
        )?;
        summary.add_action(PipelineAction::new(
            ActionType::DataNormalized,
            "dataset",
            format!("Standardized {} numeric column(s)", scalers.len()),
        ));

        info!("Step 7: Fitting encoders...");
        let encoders = EncoderStore::fit_transform(
            df,
            &self.config.categorical_columns,
            &self.store,
            &mut summary.processing_steps,
        )?;
        summary.add_action(PipelineAction::new(
            ActionType::CategoriesEncoded,
            "dataset",
            format!("Encoded {} categorical column(s)", encoders.len()),
        ));

        Ok(FittedState::from_parts(self.store.dir(), scalers, encoders))
    }

    /// Run the TRANSFORM sequence with loaded state.
    ///
    /// The input must already be clean: canonical categories, numeric
    /// columns parsed, no nulls. Schema problems and missing state are
    /// reported before any column is modified.
    pub fn transform(&self, mut df: DataFrame, state: &FittedState) -> Result<PipelineOutput> {
        let start = Instant::now();
        let mut summary = PipelineSummary::new(PipelineMode::Transform, df.height(), df.width());
        let mut steps = Vec::new();

        if let Err(e) = self.validate_transform_input(&df, state) {
            error!("Rejected transform input: {}", e);
            return Err(e);
        }

        let ratio = &self.config.ratio;
        if !df.get_column_names().iter().any(|c| c.as_str() == ratio.name) {
            self.derive(&mut df, &mut summary, &mut steps)?;
            ensure_no_nulls(&df, &ratio.name)?;
        }

        ScalerStore::transform(&mut df, &self.config.numeric_columns, state, &mut steps)?;
        EncoderStore::transform(&mut df, &self.config.categorical_columns, state, &mut steps)?;

        summary.processing_steps = steps;
        summary.columns_after = df.width();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Transformed {} row(s) in {}ms",
            summary.rows, summary.duration_ms
        );
        Ok(PipelineOutput { data: df, summary })
    }

    fn derive(
        &self,
        df: &mut DataFrame,
        summary: &mut PipelineSummary,
        steps: &mut Vec<String>,
    ) -> Result<()> {
        let ratio = &self.config.ratio;
        FeatureDeriver::derive_ratio(df, ratio, self.config.zero_division, steps)?;
        summary.add_action(PipelineAction::new(
            ActionType::FeatureDerived,
            &ratio.name,
            format!("{} / {}", ratio.numerator, ratio.denominator),
        ));
        Ok(())
    }

    /// Columns the transform path reads, given whether the ratio must be
    /// derived first.
    fn required_columns(&self, df: &DataFrame) -> Vec<String> {
        let ratio = &self.config.ratio;
        let has_ratio = df
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == ratio.name);

        let mut required: Vec<String> = Vec::new();
        for col in self
            .config
            .numeric_columns
            .iter()
            .chain(self.config.categorical_columns.iter())
        {
            if *col == ratio.name && !has_ratio {
                continue;
            }
            if !required.contains(col) {
                required.push(col.clone());
            }
        }
        if !has_ratio {
            for col in [&ratio.numerator, &ratio.denominator] {
                if !required.contains(col) {
                    required.push(col.clone());
                }
            }
        }
        required
    }

    fn validate_transform_input(&self, df: &DataFrame, state: &FittedState) -> Result<()> {
        let required = self.required_columns(df);

        let missing: Vec<&str> = required
            .iter()
            .filter(|c| require_series(df, c).is_err())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Schema(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let numeric_inputs = self
            .config
            .numeric_columns
            .iter()
            .chain([&self.config.ratio.numerator, &self.config.ratio.denominator]);
        for col in numeric_inputs {
            if let Ok(series) = require_series(df, col)
                && !is_numeric_dtype(series.dtype())
            {
                return Err(PipelineError::Schema(format!(
                    "column '{}' must be numeric, found {}",
                    col,
                    series.dtype()
                )));
            }
        }

        for col in &required {
            ensure_no_nulls(df, col)?;
        }

        for col in &self.config.numeric_columns {
            state.scaler(col)?;
        }
        for col in &self.config.categorical_columns {
            state.encoder(col)?;
        }
        Ok(())
    }
}

/// Builder for [`FeaturePipeline`].
#[derive(Debug, Default)]
pub struct FeaturePipelineBuilder {
    config: Option<PipelineConfig>,
    artifact_dir: Option<PathBuf>,
}

impl FeaturePipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the configuration's artifact directory.
    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<FeaturePipeline, ConfigValidationError> {
        let mut config = self.config.unwrap_or_default();
        if let Some(dir) = self.artifact_dir {
            config.artifact_dir = dir;
        }
        config.validate()?;

        let store = ArtifactStore::new(&config.artifact_dir);
        Ok(FeaturePipeline { config, store })
    }
}
