//! Derived ratio features.

use crate::config::{RatioFeature, ZeroDivisionPolicy};
use crate::error::{PipelineError, Result};
use crate::utils::numeric_series;
use polars::prelude::*;
use tracing::{info, warn};

/// Computes `numerator / denominator` columns.
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Divide two values under `policy`. `Ok(None)` is a null result.
    ///
    /// `column` and `row` only label the error raised by
    /// [`ZeroDivisionPolicy::Error`].
    #[inline]
    pub fn divide(
        numerator: f64,
        denominator: f64,
        policy: ZeroDivisionPolicy,
        column: &str,
        row: usize,
    ) -> Result<Option<f64>> {
        if denominator != 0.0 {
            return Ok(Some(numerator / denominator));
        }
        match policy {
            ZeroDivisionPolicy::Zero => Ok(Some(0.0)),
            ZeroDivisionPolicy::Null => Ok(None),
            ZeroDivisionPolicy::Error => Err(PipelineError::ZeroDivision {
                column: column.to_string(),
                row,
            }),
        }
    }

    /// Add (or overwrite) the ratio column.
    ///
    /// A null in either input yields a null ratio for that row.
    pub fn derive_ratio(
        df: &mut DataFrame,
        feature: &RatioFeature,
        policy: ZeroDivisionPolicy,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let numerator = numeric_series(df, &feature.numerator)?;
        let denominator = numeric_series(df, &feature.denominator)?;

        let mut zero_rows = Vec::new();
        let mut ratio = Vec::with_capacity(df.height());
        for (row, (n, d)) in numerator
            .f64()?
            .into_iter()
            .zip(denominator.f64()?.into_iter())
            .enumerate()
        {
            let value = match (n, d) {
                (Some(n), Some(d)) => {
                    if d == 0.0 {
                        zero_rows.push(row);
                    }
                    Self::divide(n, d, policy, &feature.denominator, row)?
                }
                _ => None,
            };
            ratio.push(value);
        }

        if !zero_rows.is_empty() {
            warn!(
                "'{}' is zero in {} row(s) (first: {}); '{}' set per {:?} policy",
                feature.denominator,
                zero_rows.len(),
                zero_rows[0],
                feature.name,
                policy
            );
        }

        let chunked: Float64Chunked = ratio.into_iter().collect();
        df.with_column(chunked.with_name(feature.name.as_str().into()).into_series())?;

        info!(
            "Derived '{}' = '{}' / '{}'",
            feature.name, feature.numerator, feature.denominator
        );
        processing_steps.push(format!(
            "Derived '{}' from '{}' / '{}'",
            feature.name, feature.numerator, feature.denominator
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PROPORCAO_SOLICITADO_TOTAL, VALOR_SOLICITADO, VALOR_TOTAL_BEM};

    fn ratio_values(df: &DataFrame) -> Vec<Option<f64>> {
        df.column(PROPORCAO_SOLICITADO_TOTAL)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn table(requested: &[f64], total: &[f64]) -> DataFrame {
        df![
            VALOR_SOLICITADO => requested,
            VALOR_TOTAL_BEM => total,
        ]
        .unwrap()
    }

    #[test]
    fn test_half_ratio_is_exact() {
        let mut df = table(&[100.0], &[200.0]);
        let mut steps = Vec::new();

        FeatureDeriver::derive_ratio(
            &mut df,
            &RatioFeature::default(),
            ZeroDivisionPolicy::Zero,
            &mut steps,
        )
        .unwrap();

        assert_eq!(ratio_values(&df), vec![Some(0.5)]);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_zero_policy() {
        let mut df = table(&[100.0, 50.0], &[0.0, 100.0]);
        let mut steps = Vec::new();

        FeatureDeriver::derive_ratio(
            &mut df,
            &RatioFeature::default(),
            ZeroDivisionPolicy::Zero,
            &mut steps,
        )
        .unwrap();
        assert_eq!(ratio_values(&df), vec![Some(0.0), Some(0.5)]);
    }

    #[test]
    fn test_null_policy() {
        let mut df = table(&[100.0], &[0.0]);
        let mut steps = Vec::new();

        FeatureDeriver::derive_ratio(
            &mut df,
            &RatioFeature::default(),
            ZeroDivisionPolicy::Null,
            &mut steps,
        )
        .unwrap();
        assert_eq!(ratio_values(&df), vec![None]);
    }

    #[test]
    fn test_error_policy_reports_row() {
        let mut df = table(&[1.0, 2.0, 3.0], &[1.0, 1.0, 0.0]);
        let mut steps = Vec::new();

        let err = FeatureDeriver::derive_ratio(
            &mut df,
            &RatioFeature::default(),
            ZeroDivisionPolicy::Error,
            &mut steps,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ZeroDivision { row: 2, .. }));
    }

    #[test]
    fn test_overwrites_existing_ratio() {
        let mut df = df![
            VALOR_SOLICITADO => [139244.0],
            VALOR_TOTAL_BEM => [320000.0],
            PROPORCAO_SOLICITADO_TOTAL => [99.0],
        ]
        .unwrap();
        let mut steps = Vec::new();

        FeatureDeriver::derive_ratio(
            &mut df,
            &RatioFeature::default(),
            ZeroDivisionPolicy::Zero,
            &mut steps,
        )
        .unwrap();

        let ratio = ratio_values(&df)[0].unwrap();
        assert!((ratio - 0.435).abs() < 1e-3);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_divide() {
        let div = |n, d, p| FeatureDeriver::divide(n, d, p, VALOR_TOTAL_BEM, 0);
        assert_eq!(div(1.0, 4.0, ZeroDivisionPolicy::Error).unwrap(), Some(0.25));
        assert_eq!(div(1.0, 0.0, ZeroDivisionPolicy::Zero).unwrap(), Some(0.0));
        assert_eq!(div(1.0, 0.0, ZeroDivisionPolicy::Null).unwrap(), None);
        assert!(div(1.0, 0.0, ZeroDivisionPolicy::Error).is_err());
    }
}
