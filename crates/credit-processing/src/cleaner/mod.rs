//! Value-level cleaning of raw loan-application columns.
//!
//! This module provides functionality for:
//! - Parsing locale-formatted currency strings into floats
//! - Snapping free-text categorical values onto a canonical vocabulary

mod corrector;
mod currency;
pub mod fuzzy;

pub use corrector::CategoricalCorrector;
pub use currency::{parse_currency, CurrencyNormalizer, CurrencyParseError};
