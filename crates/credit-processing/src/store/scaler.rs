//! Per-column standardization state.

use crate::error::{PipelineError, Result};
use crate::store::{ArtifactStore, FittedState};
use crate::utils::numeric_series;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fitted `(mean, std)` of one numeric column.
///
/// `std` is the population standard deviation; a constant column stores 1.0
/// so transform never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub column: String,
    pub mean: f64,
    pub std: f64,
}

impl ScalerState {
    /// Fit on the non-null values of a numeric Series.
    pub fn fit(column: impl Into<String>, series: &Series) -> Result<Self> {
        let column = column.into();
        let values = series.cast(&DataType::Float64)?;

        let (Some(mean), Some(std)) = (values.mean(), values.f64()?.std(0)) else {
            return Err(PipelineError::NoValidValues(column));
        };
        if !mean.is_finite() || !std.is_finite() {
            return Err(PipelineError::NoValidValues(column));
        }
        let std = if std > 0.0 { std } else { 1.0 };

        Ok(Self { column, mean, std })
    }

    #[inline]
    pub fn transform_value(&self, x: f64) -> f64 {
        (x - self.mean) / self.std
    }

    #[inline]
    pub fn inverse_value(&self, z: f64) -> f64 {
        z * self.std + self.mean
    }

    /// Standardize a Series. Nulls stay null.
    pub fn transform_series(&self, series: &Series) -> PolarsResult<Series> {
        let as_f64 = series.cast(&DataType::Float64)?;
        let scaled: Float64Chunked = as_f64
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| self.transform_value(x)))
            .collect();
        Ok(scaled.with_name(series.name().clone()).into_series())
    }

    /// Undo [`transform_series`](Self::transform_series).
    pub fn inverse_series(&self, series: &Series) -> PolarsResult<Series> {
        let as_f64 = series.cast(&DataType::Float64)?;
        let restored: Float64Chunked = as_f64
            .f64()?
            .into_iter()
            .map(|v| v.map(|z| self.inverse_value(z)))
            .collect();
        Ok(restored.with_name(series.name().clone()).into_series())
    }
}

/// Fits, persists and applies numeric scalers.
pub struct ScalerStore;

impl ScalerStore {
    /// Fit a scaler per column, persist each one, and standardize the table.
    pub fn fit_transform(
        df: &mut DataFrame,
        columns: &[String],
        store: &ArtifactStore,
        processing_steps: &mut Vec<String>,
    ) -> Result<Vec<ScalerState>> {
        info!("Fitting scalers for {} column(s)", columns.len());

        let mut states = Vec::with_capacity(columns.len());
        for col in columns {
            let series = numeric_series(df, col)?;
            let state = ScalerState::fit(col, &series)?;
            let path = store.save_scaler(&state)?;
            debug!(
                "Scaler '{}': mean={:.4}, std={:.4} -> {}",
                col,
                state.mean,
                state.std,
                path.display()
            );

            df.replace(col, state.transform_series(&series)?)?;
            states.push(state);
        }

        processing_steps.push(format!("Fitted and applied {} scaler(s)", states.len()));
        Ok(states)
    }

    /// Standardize with previously fitted state.
    ///
    /// Every column's state is looked up before any value is touched, so a
    /// missing artifact fails the call without partial output.
    pub fn transform(
        df: &mut DataFrame,
        columns: &[String],
        state: &FittedState,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let scalers = columns
            .iter()
            .map(|col| state.scaler(col))
            .collect::<Result<Vec<_>>>()?;

        for scaler in scalers {
            let series = numeric_series(df, &scaler.column)?;
            df.replace(&scaler.column, scaler.transform_series(&series)?)?;
        }

        debug!("Applied {} stored scaler(s)", columns.len());
        processing_steps.push(format!("Applied {} stored scaler(s)", columns.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renda(values: &[f64]) -> Series {
        Series::new("renda".into(), values)
    }

    #[test]
    fn test_fit_population_std() {
        let state =
            ScalerState::fit("renda", &renda(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])).unwrap();
        assert_eq!(state.mean, 5.0);
        assert_eq!(state.std, 2.0);
    }

    #[test]
    fn test_constant_column_uses_unit_std() {
        let series = Series::new("dependentes".into(), [3i64, 3, 3]);
        let state = ScalerState::fit("dependentes", &series).unwrap();
        assert_eq!(state.std, 1.0);
        assert_eq!(state.transform_value(3.0), 0.0);
    }

    #[test]
    fn test_fit_empty_fails() {
        let series = Series::new("renda".into(), [Option::<f64>::None, None]);
        let err = ScalerState::fit("renda", &series).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidValues(_)));
    }

    #[test]
    fn test_fit_ignores_nulls() {
        let series = Series::new("renda".into(), [Some(2.0), None, Some(4.0), None]);
        let state = ScalerState::fit("renda", &series).unwrap();
        assert_eq!(state.mean, 3.0);
        assert_eq!(state.std, 1.0);
    }

    #[test]
    fn test_inverse_recovers_fit_values() {
        let values = [20860.0, 1500.0, 98000.5, 4300.0, 0.0];
        let state = ScalerState::fit("renda", &renda(&values)).unwrap();
        for x in values {
            let back = state.inverse_value(state.transform_value(x));
            assert!((back - x).abs() < 1e-6, "{x} -> {back}");
        }
    }

    #[test]
    fn test_transform_series_keeps_nulls() {
        let state = ScalerState {
            column: "idade".into(),
            mean: 40.0,
            std: 10.0,
        };
        let series = Series::new("idade".into(), &[Some(50.0), None, Some(30.0)]);
        let scaled = state.transform_series(&series).unwrap();
        let values: Vec<Option<f64>> = scaled.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.0), None, Some(-1.0)]);
        assert_eq!(scaled.name().as_str(), "idade");
    }
}
