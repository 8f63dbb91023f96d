//! Imputation module for handling missing values.
//!
//! Only the training path imputes; inference rejects nulls instead.

mod statistical;

pub use statistical::NullImputer;
