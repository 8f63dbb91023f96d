//! Recursive attribute elimination.
//!
//! Importance is the absolute Pearson correlation of each attribute with the
//! 0/1 target. Each round drops the `step` least important remaining
//! attributes until `n_features_to_select` are left. Ties drop the attribute
//! that comes later in the training order.
//!
//! The fitted selector is persisted as `selector.json` and selects columns by
//! name, in training order.

use crate::error::{LearningError, Result};
use credit_processing::ArtifactStore;
use ndarray::{Array1, Array2, ArrayView1};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const SELECTOR_FILE: &str = "selector.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSelector {
    /// Attribute names in training order.
    input_features: Vec<String>,
    /// Kept attributes, in training order.
    selected: Vec<String>,
    /// Per input attribute: 1 if kept, otherwise higher the earlier it was dropped.
    ranking: Vec<usize>,
}

impl AttributeSelector {
    /// Fit on the encoded training matrix.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        names: &[String],
        n_features_to_select: usize,
        step: usize,
    ) -> Result<Self> {
        if names.len() != x.ncols() {
            return Err(LearningError::InvalidData(format!(
                "{} attribute names for a matrix with {} columns",
                names.len(),
                x.ncols()
            )));
        }
        if y.len() != x.nrows() {
            return Err(LearningError::InvalidData(format!(
                "target has {} rows, matrix has {}",
                y.len(),
                x.nrows()
            )));
        }
        if n_features_to_select == 0 || step == 0 {
            return Err(LearningError::InvalidConfig(
                "n_features_to_select and step must be at least 1".to_string(),
            ));
        }

        let n_features = x.ncols();
        let n_select = n_features_to_select.min(n_features);
        let scores: Vec<f64> = (0..n_features)
            .map(|j| pearson(x.column(j), y.view()).abs())
            .collect();

        let mut remaining: Vec<usize> = (0..n_features).collect();
        let mut dropped_in_round: Vec<Option<usize>> = vec![None; n_features];
        let mut round = 0;

        while remaining.len() > n_select {
            let mut order = remaining.clone();
            // Least important first; among equals, the later attribute first
            order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]).then(b.cmp(&a)));

            let n_drop = step.min(remaining.len() - n_select);
            for &idx in order.iter().take(n_drop) {
                dropped_in_round[idx] = Some(round);
                debug!("Round {}: dropped '{}' (|r| = {:.4})", round, names[idx], scores[idx]);
            }
            remaining.retain(|idx| dropped_in_round[*idx].is_none());
            round += 1;
        }

        let ranking = dropped_in_round
            .iter()
            .map(|r| match r {
                Some(r) => round - r + 1,
                None => 1,
            })
            .collect();
        let selected: Vec<String> = remaining.iter().map(|&i| names[i].clone()).collect();

        info!(
            "Selected {} of {} attributes: {}",
            selected.len(),
            n_features,
            selected.join(", ")
        );

        Ok(Self {
            input_features: names.to_vec(),
            selected,
            ranking,
        })
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn input_features(&self) -> &[String] {
        &self.input_features
    }

    pub fn ranking(&self) -> &[usize] {
        &self.ranking
    }

    /// Keep only the selected columns, in training order.
    ///
    /// A selected column absent from `df` is a schema error.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let missing: Vec<&str> = self
            .selected
            .iter()
            .filter(|name| df.column(name).is_err())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(LearningError::schema(format!(
                "missing selected attribute(s): {}",
                missing.join(", ")
            )));
        }

        Ok(df.select(self.selected.iter().map(String::as_str))?)
    }

    pub fn save(&self, store: &ArtifactStore) -> Result<PathBuf> {
        Ok(store.save_json(SELECTOR_FILE, self)?)
    }

    pub fn load(store: &ArtifactStore) -> Result<Self> {
        Ok(store.load_json(SELECTOR_FILE, "selector", "attributes")?)
    }
}

/// Pearson correlation; 0 when either side is constant.
fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let x_mean = x.mean().unwrap_or(0.0);
    let y_mean = y.mean().unwrap_or(0.0);

    let x_std = (x.iter().map(|&v| (v - x_mean).powi(2)).sum::<f64>() / n).sqrt();
    let y_std = (y.iter().map(|&v| (v - y_mean).powi(2)).sum::<f64>() / n).sqrt();
    if x_std <= 0.0 || y_std <= 0.0 {
        return 0.0;
    }

    let covariance = x
        .iter()
        .zip(y.iter())
        .map(|(&a, &b)| (a - x_mean) * (b - y_mean))
        .sum::<f64>()
        / n;

    let r = covariance / (x_std * y_std);
    if r.is_finite() { r } else { 0.0 }
}
