//! Outlier handling module.
//!
//! Values outside a column's inclusive bounds are replaced with the median of
//! the values inside them. The bounds are configuration, not fitted state, so
//! every replay of this step must use the same literal bounds.

use crate::config::OutlierBounds;
use crate::error::{PipelineError, Result};
use crate::utils::numeric_series;
use polars::prelude::*;
use tracing::{debug, info};

/// Replaces out-of-range numeric values with the in-range median.
pub struct OutlierClamper;

impl OutlierClamper {
    /// Clamp one column in place. Returns the number of replaced cells.
    ///
    /// Nulls are neither counted as outliers nor used for the median. A
    /// column with outliers but no in-bound value fails with `NoValidValues`.
    pub fn clamp_column(
        df: &mut DataFrame,
        bounds: &OutlierBounds,
        processing_steps: &mut Vec<String>,
    ) -> Result<usize> {
        let series = numeric_series(df, &bounds.column)?;
        let values = series.f64()?;

        let outliers = values
            .into_iter()
            .flatten()
            .filter(|v| !bounds.contains(*v))
            .count();
        if outliers == 0 {
            debug!(
                "No values outside [{}, {}] in '{}'",
                bounds.min, bounds.max, bounds.column
            );
            return Ok(0);
        }

        let in_range = &values.gt_eq(bounds.min) & &values.lt_eq(bounds.max);
        let median = values
            .filter(&in_range)?
            .into_series()
            .median()
            .ok_or_else(|| {
                PipelineError::NoValidValues(format!(
                    "'{}' has no values within [{}, {}]",
                    bounds.column, bounds.min, bounds.max
                ))
            })?;

        let clamped: Float64Chunked = values
            .into_iter()
            .map(|opt| opt.map(|v| if bounds.contains(v) { v } else { median }))
            .collect();
        df.replace(
            &bounds.column,
            clamped.with_name(series.name().clone()).into_series(),
        )?;

        info!(
            "Replaced {} outlier(s) in '{}' with in-range median {}",
            outliers, bounds.column, median
        );
        processing_steps.push(format!(
            "Replaced {} value(s) outside [{}, {}] in '{}' with median {:.2}",
            outliers, bounds.min, bounds.max, bounds.column, median
        ));
        Ok(outliers)
    }

    /// Clamp every bounded column in order.
    pub fn clamp_all(
        df: &mut DataFrame,
        bounds: &[OutlierBounds],
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        for b in bounds {
            Self::clamp_column(df, b, processing_steps)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_out_of_bound_values_take_inbound_median() {
        let mut df = df!["idade" => [30.0, 150.0, 40.0, -3.0, 50.0]].unwrap();
        let bounds = OutlierBounds::new("idade", 0.0, 110.0);
        let mut steps = Vec::new();

        let replaced = OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap();

        assert_eq!(replaced, 2);
        assert_eq!(
            values(&df, "idade"),
            vec![Some(30.0), Some(40.0), Some(40.0), Some(40.0), Some(50.0)]
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut df = df!["tempoprofissao" => [0.0, 70.0, 71.0]].unwrap();
        let bounds = OutlierBounds::new("tempoprofissao", 0.0, 70.0);
        let mut steps = Vec::new();

        OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap();
        assert_eq!(
            values(&df, "tempoprofissao"),
            vec![Some(0.0), Some(70.0), Some(35.0)]
        );
    }

    #[test]
    fn test_clamping_is_idempotent() {
        let mut df = df!["idade" => [25.0, 999.0, 33.0, 41.0, -10.0, 60.0]].unwrap();
        let bounds = OutlierBounds::new("idade", 0.0, 110.0);
        let mut steps = Vec::new();

        OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap();
        let once = values(&df, "idade");
        let replaced = OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap();

        assert_eq!(replaced, 0);
        assert_eq!(values(&df, "idade"), once);
    }

    #[test]
    fn test_nulls_pass_through() {
        let mut df = df!["idade" => [Some(20.0), None, Some(500.0)]].unwrap();
        let bounds = OutlierBounds::new("idade", 0.0, 110.0);
        let mut steps = Vec::new();

        OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap();
        assert_eq!(values(&df, "idade"), vec![Some(20.0), None, Some(20.0)]);
    }

    #[test]
    fn test_integer_column_is_widened() {
        let mut df = df!["idade" => [20i64, 200, 40]].unwrap();
        let bounds = OutlierBounds::new("idade", 0.0, 110.0);
        let mut steps = Vec::new();

        OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap();
        assert_eq!(values(&df, "idade"), vec![Some(20.0), Some(30.0), Some(40.0)]);
    }

    #[test]
    fn test_no_inbound_values() {
        let mut df = df!["idade" => [200.0, 300.0]].unwrap();
        let bounds = OutlierBounds::new("idade", 0.0, 110.0);
        let mut steps = Vec::new();

        let err = OutlierClamper::clamp_column(&mut df, &bounds, &mut steps).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidValues(_)));
    }
}
