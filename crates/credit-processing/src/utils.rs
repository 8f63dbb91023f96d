//! Shared utilities for the feature pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Fetch a column as a materialized Series, mapping absence to `ColumnNotFound`.
pub fn require_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))
}

/// Fetch a column cast to Float64.
///
/// Integer columns are widened; text columns fail with a schema error since
/// numeric parsing is the currency normalizer's job.
pub fn numeric_series(df: &DataFrame, name: &str) -> Result<Series> {
    let series = require_series(df, name)?;
    if !is_numeric_dtype(series.dtype()) {
        return Err(PipelineError::Schema(format!(
            "Column '{}' must be numeric, found {}",
            name,
            series.dtype()
        )));
    }
    Ok(series.cast(&DataType::Float64)?)
}

/// Fetch a column cast to String.
pub fn text_series(df: &DataFrame, name: &str) -> Result<Series> {
    let series = require_series(df, name)?;
    Ok(series.cast(&DataType::String)?)
}

/// Fail with `NullValue` if the column carries any null.
pub fn ensure_no_nulls(df: &DataFrame, name: &str) -> Result<()> {
    let series = require_series(df, name)?;
    let count = series.null_count();
    if count > 0 {
        return Err(PipelineError::NullValue {
            column: name.to_string(),
            count,
        });
    }
    Ok(())
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Calculate the mode (most frequent value) of a text Series.
///
/// Nulls are ignored. Ties go to the value encountered first.
pub fn string_mode(series: &Series) -> Option<String> {
    let str_series = series.cast(&DataType::String).ok()?;
    let str_chunked = str_series.str().ok()?;

    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for val in str_chunked.into_iter().flatten() {
        match index.get(val) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(val, order.len());
                order.push((val, 1));
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (val, count) in order {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((val, count));
        }
    }
    best.map(|(val, _)| val.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let as_f64 = series.cast(&DataType::Float64)?;
    let filled: Float64Chunked = as_f64
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.with_name(series.name().clone()).into_series())
}

/// Fill null values in a text Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let as_str = series.cast(&DataType::String)?;
    let filled: StringChunked = as_str
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.with_name(series.name().clone()).into_series())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_string_mode() {
        let series = Series::new("test".into(), &["a", "b", "a", "c", "a"]);
        assert_eq!(string_mode(&series), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_tie_goes_to_first_encountered() {
        let series = Series::new("test".into(), &[Some("b"), None, Some("a"), Some("a"), Some("b")]);
        assert_eq!(string_mode(&series), Some("b".to_string()));
    }

    #[test]
    fn test_string_mode_all_null() {
        let series = Series::new("test".into(), &[Option::<&str>::None, None]);
        assert_eq!(string_mode(&series), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("test".into(), &[Some("x"), None]);
        let filled = fill_string_nulls(&series, "y").unwrap();
        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("x"), Some("y")]);
    }

    #[test]
    fn test_numeric_series_rejects_text() {
        let df = df!["renda" => ["alta"]].unwrap();
        assert!(matches!(
            numeric_series(&df, "renda"),
            Err(PipelineError::Schema(_))
        ));
        assert!(matches!(
            numeric_series(&df, "idade"),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_ensure_no_nulls() {
        let df = df!["renda" => [Some(1.0), None]].unwrap();
        let err = ensure_no_nulls(&df, "renda").unwrap_err();
        assert!(matches!(err, PipelineError::NullValue { count: 1, .. }));
    }
}
