//! Per-column categorical encoding state.

use crate::error::{PipelineError, Result};
use crate::store::{ArtifactStore, FittedState};
use crate::utils::{require_series, text_series};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// On-disk form of an encoder: the class list, where a class's position is
/// its code.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncoderArtifact {
    column: String,
    classes: Vec<String>,
}

/// Fitted label-to-code mapping of one categorical column.
///
/// Codes are zero-based positions in `classes`, assigned in first-encountered
/// order at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderArtifact", into = "EncoderArtifact")]
pub struct EncoderState {
    column: String,
    classes: Vec<String>,
    index: HashMap<String, i64>,
}

impl TryFrom<EncoderArtifact> for EncoderState {
    type Error = String;

    fn try_from(artifact: EncoderArtifact) -> std::result::Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(artifact.classes.len());
        for (code, class) in artifact.classes.iter().enumerate() {
            if index.insert(class.clone(), code as i64).is_some() {
                return Err(format!(
                    "encoder for '{}' lists class '{}' twice",
                    artifact.column, class
                ));
            }
        }
        Ok(Self {
            column: artifact.column,
            classes: artifact.classes,
            index,
        })
    }
}

impl From<EncoderState> for EncoderArtifact {
    fn from(state: EncoderState) -> Self {
        Self {
            column: state.column,
            classes: state.classes,
        }
    }
}

impl EncoderState {
    /// Enumerate distinct non-null values in first-encountered order.
    pub fn fit<'a>(column: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes = Vec::new();
        let mut index = HashMap::new();
        for value in values {
            if !index.contains_key(value) {
                index.insert(value.to_string(), classes.len() as i64);
                classes.push(value.to_string());
            }
        }
        Self {
            column: column.into(),
            classes,
            index,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Known classes, ordered by code.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, value: &str) -> Result<i64> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| PipelineError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, code: i64) -> Result<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
            .ok_or_else(|| PipelineError::UnknownCategory {
                column: self.column.clone(),
                value: code.to_string(),
            })
    }

    /// Encode a Series into Int64 codes. Nulls stay null; the first unseen
    /// value fails the whole call.
    pub fn encode_series(&self, series: &Series) -> Result<Series> {
        let as_str = series.cast(&DataType::String)?;
        let codes = as_str
            .str()?
            .into_iter()
            .map(|opt| opt.map(|v| self.encode(v)).transpose())
            .collect::<Result<Vec<Option<i64>>>>()?;
        let chunked: Int64Chunked = codes.into_iter().collect();
        Ok(chunked.with_name(series.name().clone()).into_series())
    }

    /// Map codes back to their labels.
    pub fn decode_series(&self, series: &Series) -> Result<Series> {
        let as_i64 = series.cast(&DataType::Int64)?;
        let labels = as_i64
            .i64()?
            .into_iter()
            .map(|opt| opt.map(|c| self.decode(c)).transpose())
            .collect::<Result<Vec<Option<&str>>>>()?;
        let chunked: StringChunked = labels.into_iter().collect();
        Ok(chunked.with_name(series.name().clone()).into_series())
    }
}

/// Fits, persists and applies categorical encoders.
pub struct EncoderStore;

impl EncoderStore {
    /// Fit an encoder per column, persist each one, and encode the table.
    pub fn fit_transform(
        df: &mut DataFrame,
        columns: &[String],
        store: &ArtifactStore,
        processing_steps: &mut Vec<String>,
    ) -> Result<Vec<EncoderState>> {
        info!("Fitting encoders for {} column(s)", columns.len());

        let mut states = Vec::with_capacity(columns.len());
        for col in columns {
            let series = text_series(df, col)?;
            let state = EncoderState::fit(col, series.str()?.into_iter().flatten());
            let path = store.save_encoder(&state)?;
            debug!(
                "Encoder '{}': {} class(es) -> {}",
                col,
                state.classes.len(),
                path.display()
            );

            df.replace(col, state.encode_series(&series)?)?;
            states.push(state);
        }

        processing_steps.push(format!("Fitted and applied {} encoder(s)", states.len()));
        Ok(states)
    }

    /// Encode with previously fitted state.
    ///
    /// All lookups and encodings complete before the table is modified, so an
    /// unknown category leaves `df` untouched.
    pub fn transform(
        df: &mut DataFrame,
        columns: &[String],
        state: &FittedState,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let encoders = columns
            .iter()
            .map(|col| state.encoder(col))
            .collect::<Result<Vec<_>>>()?;

        let encoded = encoders
            .iter()
            .map(|enc| {
                let series = require_series(df, &enc.column)?;
                enc.encode_series(series)
            })
            .collect::<Result<Vec<_>>>()?;

        for (enc, codes) in encoders.iter().zip(encoded) {
            df.replace(&enc.column, codes)?;
        }

        debug!("Applied {} stored encoder(s)", columns.len());
        processing_steps.push(format!("Applied {} stored encoder(s)", columns.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_encountered_codes() {
        let state = EncoderState::fit("score", ["Baixo", "Alto", "Baixo", "Medio"]);
        assert_eq!(state.classes(), ["Baixo", "Alto", "Medio"]);
        assert_eq!(state.encode("Baixo").unwrap(), 0);
        assert_eq!(state.encode("Medio").unwrap(), 2);
    }

    #[test]
    fn test_unknown_category() {
        let state = EncoderState::fit("profissao", ["Advogado", "Médico"]);
        let err = state.encode("Astronauta").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownCategory { ref value, .. } if value == "Astronauta"
        ));
        assert_eq!(err.error_code(), "UNKNOWN_CATEGORY");
    }

    #[test]
    fn test_round_trip_recovers_labels() {
        let series = Series::new(
            "estadocivil".into(),
            &[Some("Casado"), Some("Víuvo"), None, Some("Casado")],
        );
        let state = EncoderState::fit("estadocivil", series.str().unwrap().into_iter().flatten());

        let codes = state.encode_series(&series).unwrap();
        let codes_vec: Vec<Option<i64>> = codes.i64().unwrap().into_iter().collect();
        assert_eq!(codes_vec, vec![Some(0), Some(1), None, Some(0)]);

        let decoded = state.decode_series(&codes).unwrap();
        assert!(decoded.equals_missing(&series));
    }

    #[test]
    fn test_decode_out_of_range() {
        let state = EncoderState::fit("produto", ["DoubleDuty"]);
        assert!(state.decode(1).is_err());
        assert!(state.decode(-1).is_err());
    }

    #[test]
    fn test_artifact_json_round_trip() {
        let state = EncoderState::fit("produto", ["DoubleDuty", "TrioTech", "UltraSecure"]);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"classes\""));
        assert!(!json.contains("index"));

        let back: EncoderState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_artifact_with_duplicate_class_rejected() {
        let json = r#"{"column":"produto","classes":["A","A"]}"#;
        assert!(serde_json::from_str::<EncoderState>(json).is_err());
    }
}
