//! Canonical-vocabulary correction of free-text categorical columns.

use crate::cleaner::fuzzy;
use crate::config::CanonicalVocabulary;
use crate::error::Result;
use crate::utils::require_series;
use polars::prelude::*;
use tracing::{debug, info};

/// Snaps free-text values onto a fixed vocabulary.
pub struct CategoricalCorrector;

impl CategoricalCorrector {
    /// Correct one value.
    ///
    /// Exact members of `vocabulary` come back unchanged; anything else is
    /// replaced by its best fuzzy match. An empty vocabulary leaves the value
    /// as is.
    pub fn correct_value(value: &str, vocabulary: &[String]) -> String {
        if vocabulary.iter().any(|v| v == value) {
            return value.to_string();
        }
        match fuzzy::best_match(value, vocabulary) {
            Some((matched, score)) => {
                debug!("Corrected '{}' -> '{}' (score {})", value, matched, score);
                matched.to_string()
            }
            None => value.to_string(),
        }
    }

    /// Correct a whole Series. Nulls stay null.
    ///
    /// Returns the corrected Series and the number of values that changed.
    pub fn correct_series(series: &Series, vocabulary: &[String]) -> PolarsResult<(Series, usize)> {
        let as_str = series.cast(&DataType::String)?;
        let mut changed = 0usize;
        let corrected: StringChunked = as_str
            .str()?
            .into_iter()
            .map(|opt| {
                opt.map(|raw| {
                    let fixed = Self::correct_value(raw, vocabulary);
                    if fixed != raw {
                        changed += 1;
                    }
                    fixed
                })
            })
            .collect();

        Ok((corrected.with_name(series.name().clone()).into_series(), changed))
    }

    /// Correct the vocabulary's column of a table in place.
    pub fn correct_column(
        df: &mut DataFrame,
        vocabulary: &CanonicalVocabulary,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = require_series(df, &vocabulary.column)?;
        let (corrected, changed) = Self::correct_series(series, &vocabulary.values)?;
        df.replace(&vocabulary.column, corrected)?;

        if changed > 0 {
            info!(
                "Corrected {} value(s) in '{}' against {} canonical entries",
                changed,
                vocabulary.column,
                vocabulary.values.len()
            );
            processing_steps.push(format!(
                "Corrected {} value(s) in '{}'",
                changed, vocabulary.column
            ));
        }
        Ok(())
    }
}
