//! Locale-formatted currency parsing.
//!
//! Source amounts look like `R$ 139.244,00`: dots group digits and the comma
//! marks decimals. Everything that is not a digit or a comma is stripped, the
//! first comma becomes the decimal point, and the rest is parsed as `f64`.

use crate::error::Result;
use crate::utils::{is_numeric_dtype, require_series};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

static NON_CURRENCY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9,]").expect("Invalid regex: non-currency characters"));

/// A single cell that could not be read as an amount.
///
/// Never fatal: the normalizer turns it into a null for that row.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot parse '{raw}' as a currency amount")]
pub struct CurrencyParseError {
    pub raw: String,
}

/// Parse one locale-formatted amount.
pub fn parse_currency(raw: &str) -> std::result::Result<f64, CurrencyParseError> {
    let stripped = NON_CURRENCY_CHARS.replace_all(raw, "");
    let normalized = stripped.replacen(',', ".", 1);
    normalized.parse::<f64>().map_err(|_| CurrencyParseError {
        raw: raw.to_string(),
    })
}

/// Converts currency-string columns into Float64 columns.
pub struct CurrencyNormalizer;

impl CurrencyNormalizer {
    /// Parse a whole Series. Unparseable cells become null.
    ///
    /// Returns the parsed Series and the number of cells that failed to parse.
    pub fn normalize_series(series: &Series) -> PolarsResult<(Series, usize)> {
        if is_numeric_dtype(series.dtype()) {
            return Ok((series.cast(&DataType::Float64)?, 0));
        }

        let as_str = series.cast(&DataType::String)?;
        let mut failures = 0usize;
        let parsed: Float64Chunked = as_str
            .str()?
            .into_iter()
            .map(|opt| {
                opt.and_then(|raw| match parse_currency(raw) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        debug!("{}", e);
                        failures += 1;
                        None
                    }
                })
            })
            .collect();

        Ok((parsed.with_name(series.name().clone()).into_series(), failures))
    }

    /// Normalize the named columns of a table in place.
    pub fn normalize_columns(
        df: &mut DataFrame,
        columns: &[String],
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        for col in columns {
            let series = require_series(df, col)?;
            let (parsed, failures) = Self::normalize_series(series)?;
            df.replace(col, parsed)?;

            info!("Normalized currency column '{}'", col);
            if failures > 0 {
                debug!("{} unparseable value(s) in '{}' set to null", failures, col);
                processing_steps.push(format!(
                    "Parsed currency column '{}' ({} unparseable value(s) nulled)",
                    col, failures
                ));
            } else {
                processing_steps.push(format!("Parsed currency column '{}'", col));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_parse_currency_locale_format() {
        assert_eq!(parse_currency("R$ 139.244,00"), Ok(139244.0));
        assert_eq!(parse_currency("320.000,50"), Ok(320000.5));
        assert_eq!(parse_currency("1500"), Ok(1500.0));
        assert_eq!(parse_currency("0,75"), Ok(0.75));
    }

    #[test]
    fn test_parse_currency_failures() {
        assert!(parse_currency("").is_err());
        assert!(parse_currency("R$ --").is_err());
        // Two decimal commas cannot be disambiguated
        assert!(parse_currency("1,234,56").is_err());
    }

    #[test]
    fn test_normalize_series_nulls_bad_cells() {
        let series = Series::new(
            "valorsolicitado".into(),
            &[Some("R$ 1.000,00"), Some("abc"), None, Some("2.500,5")],
        );
        let (parsed, failures) = CurrencyNormalizer::normalize_series(&series).unwrap();

        assert_eq!(parsed.dtype(), &DataType::Float64);
        assert_eq!(failures, 1);
        assert_eq!(
            values(&parsed),
            vec![Some(1000.0), None, None, Some(2500.5)]
        );
    }

    #[test]
    fn test_normalize_series_numeric_passthrough() {
        let series = Series::new("valortotalbem".into(), &[320000i64, 15000]);
        let (parsed, failures) = CurrencyNormalizer::normalize_series(&series).unwrap();

        assert_eq!(failures, 0);
        assert_eq!(values(&parsed), vec![Some(320000.0), Some(15000.0)]);
    }

    #[test]
    fn test_normalize_columns_preserves_row_count() {
        let mut df = df![
            "valorsolicitado" => ["10,00", "x", "30,00"],
            "renda" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let mut steps = Vec::new();

        CurrencyNormalizer::normalize_columns(
            &mut df,
            &["valorsolicitado".to_string()],
            &mut steps,
        )
        .unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.column("valorsolicitado").unwrap().null_count(), 1);
        assert!(steps[0].contains("1 unparseable"));
    }

    #[test]
    fn test_normalize_columns_missing_column() {
        let mut df = df!["renda" => [1.0]].unwrap();
        let mut steps = Vec::new();
        let result = CurrencyNormalizer::normalize_columns(
            &mut df,
            &["valortotalbem".to_string()],
            &mut steps,
        );
        assert!(result.is_err());
    }
}
