//! Conversions between processed tables and dense matrices, and the seeded
//! train/test split.

use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Keep only the columns named in `inputs`, in table order.
///
/// Returns the narrowed table and the names of the dropped columns. Columns
/// of `inputs` that are absent are left for the pipeline's schema check.
pub fn retain_columns(df: DataFrame, inputs: &[String]) -> Result<(DataFrame, Vec<String>)> {
    let (kept, dropped): (Vec<String>, Vec<String>) = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .partition(|name| inputs.contains(name));

    if dropped.is_empty() {
        return Ok((df, dropped));
    }
    debug!("Dropping {} column(s) outside the feature set", dropped.len());
    Ok((df.select(kept)?, dropped))
}

/// Build a row-major `f64` matrix from the named columns.
///
/// A missing column is a schema error; a null cell is invalid data.
pub fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut x = Array2::zeros((df.height(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| LearningError::schema(format!("missing feature column '{}'", name)))?;
        let values = column.as_materialized_series().cast(&DataType::Float64)?;
        for (i, value) in values.f64()?.into_iter().enumerate() {
            x[[i, j]] = value.ok_or_else(|| {
                LearningError::InvalidData(format!("null in feature '{}' at row {}", name, i))
            })?;
        }
    }

    Ok(x)
}

/// Map the label column to a 0/1 target using the configured labels.
pub fn target_vector(df: &DataFrame, config: &TrainingConfig, label_column: &str) -> Result<Array1<f64>> {
    let column = df
        .column(label_column)
        .map_err(|_| LearningError::TargetNotFound(label_column.to_string()))?;
    let labels = column.as_materialized_series().cast(&DataType::String)?;

    labels
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            let label = label.ok_or_else(|| {
                LearningError::InvalidData(format!("null label at row {}", row))
            })?;
            config.label_index(label).ok_or_else(|| {
                LearningError::InvalidData(format!(
                    "label '{}' at row {} is neither '{}' nor '{}'",
                    label, row, config.negative_label, config.positive_label
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

/// Shuffle row indices with `seed` and split off `ceil(n * test_size)` rows.
///
/// Returns `(train, test)`. Both parts keep at least one row.
pub fn train_test_split(df: &DataFrame, test_size: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    if n < 2 {
        return Err(LearningError::InvalidData(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;

    debug!("Split {} rows into {} train / {} test", n, train.height(), test.height());
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DataFrame {
        df![
            "renda" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            "profissao" => [0i64, 1, 0, 1, 0, 1, 0, 1, 0, 1],
            "classe" => ["bom", "ruim", "bom", "bom", "ruim", "bom", "bom", "ruim", "bom", "bom"],
        ]
        .unwrap()
    }

    #[test]
    fn test_retain_columns_drops_unlisted() {
        let mut df = table();
        df.with_column(Series::new("clienteid".into(), (0..10i64).collect::<Vec<_>>()))
            .unwrap();
        let inputs = vec!["classe".to_string(), "renda".to_string(), "idade".to_string()];

        let (narrowed, dropped) = retain_columns(df, &inputs).unwrap();

        assert_eq!(dropped, vec!["profissao", "clienteid"]);
        assert_eq!(narrowed.get_column_names_str(), vec!["renda", "classe"]);
        assert_eq!(narrowed.height(), 10);
    }

    #[test]
    fn test_retain_columns_without_extras_is_untouched() {
        let inputs = vec!["renda".to_string(), "profissao".to_string(), "classe".to_string()];
        let (narrowed, dropped) = retain_columns(table(), &inputs).unwrap();
        assert!(dropped.is_empty());
        assert!(narrowed.equals(&table()));
    }

    #[test]
    fn test_feature_matrix_casts_ints() {
        let x = feature_matrix(&table(), &["profissao".to_string(), "renda".to_string()]).unwrap();
        assert_eq!(x.shape(), &[10, 2]);
        assert_eq!(x[[1, 0]], 1.0);
        assert_eq!(x[[9, 1]], 10.0);
    }

    #[test]
    fn test_feature_matrix_missing_column_is_schema_error() {
        let err = feature_matrix(&table(), &["idade".to_string()]).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
    }

    #[test]
    fn test_target_vector() {
        let y = target_vector(&table(), &TrainingConfig::default(), "classe").unwrap();
        assert_eq!(y.len(), 10);
        assert_eq!(y[0], 1.0);
        assert_eq!(y[1], 0.0);

        let err = target_vector(&table(), &TrainingConfig::default(), "alvo").unwrap_err();
        assert!(matches!(err, LearningError::TargetNotFound(_)));
    }

    #[test]
    fn test_target_vector_rejects_unknown_label() {
        let df = df!["classe" => ["bom", "otimo"]].unwrap();
        let err = target_vector(&df, &TrainingConfig::default(), "classe").unwrap_err();
        assert!(err.to_string().contains("otimo"));
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let df = table();
        let (train, test) = train_test_split(&df, 0.2, 41).unwrap();
        assert_eq!(test.height(), 2);
        assert_eq!(train.height(), 8);

        let (train_again, test_again) = train_test_split(&df, 0.2, 41).unwrap();
        assert!(train.equals(&train_again));
        assert!(test.equals(&test_again));

        // Every row lands in exactly one part
        let mut all: Vec<f64> = train
            .column("renda")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .chain(
                test.column("renda")
                    .unwrap()
                    .as_materialized_series()
                    .f64()
                    .unwrap()
                    .into_no_null_iter(),
            )
            .collect();
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(all, (1..=10).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_too_small() {
        let df = df!["renda" => [1.0]].unwrap();
        assert!(train_test_split(&df, 0.2, 41).is_err());
    }
}
