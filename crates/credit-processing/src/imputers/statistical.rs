//! Statistical null imputation.
//!
//! Text columns take their mode, numeric columns their median. Fill values
//! are computed from the table being imputed and are never persisted.

use crate::error::Result;
use crate::utils::{
    fill_numeric_nulls, fill_string_nulls, is_numeric_dtype, is_text_dtype, string_mode,
};
use polars::prelude::*;
use tracing::{debug, info};

/// Fills nulls column by column with a type-appropriate statistic.
pub struct NullImputer;

impl NullImputer {
    /// Impute every column of the table.
    ///
    /// Columns of other types (booleans, dates) and columns that are entirely
    /// null are left untouched.
    pub fn impute_all(df: &mut DataFrame, processing_steps: &mut Vec<String>) -> Result<()> {
        info!("Imputing nulls across {} column(s)", df.width());

        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        for name in names {
            Self::impute_column(df, &name, processing_steps)?;
        }
        Ok(())
    }

    /// Impute a single column. Returns whether anything was filled.
    pub fn impute_column(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<bool> {
        let series = crate::utils::require_series(df, col_name)?;
        let null_count = series.null_count();
        if null_count == 0 {
            return Ok(false);
        }

        let dtype = series.dtype().clone();
        if is_text_dtype(&dtype) {
            let Some(mode_val) = string_mode(series) else {
                debug!("Column '{}' is entirely null, no mode to fill with", col_name);
                return Ok(false);
            };
            let filled = fill_string_nulls(series, &mode_val)?;
            df.replace(col_name, filled)?;

            debug!("Filled {} null(s) in '{}' with mode '{}'", null_count, col_name, mode_val);
            processing_steps.push(format!(
                "Filled {} null(s) in '{}' with mode: '{}'",
                null_count, col_name, mode_val
            ));
            Ok(true)
        } else if is_numeric_dtype(&dtype) {
            let as_f64 = series.cast(&DataType::Float64)?;
            let Some(median_val) = as_f64.median() else {
                debug!("Column '{}' is entirely null, no median to fill with", col_name);
                return Ok(false);
            };
            let filled = fill_numeric_nulls(&as_f64, median_val)?;
            df.replace(col_name, filled)?;

            debug!("Filled {} null(s) in '{}' with median {}", null_count, col_name, median_val);
            processing_steps.push(format!(
                "Filled {} null(s) in '{}' with median: {:.2}",
                null_count, col_name, median_val
            ));
            Ok(true)
        } else {
            debug!("Skipping imputation of '{}' ({})", col_name, dtype);
            Ok(false)
        }
    }
}
