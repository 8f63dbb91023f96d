//! The scoring service: the inference boundary of the credit pipeline.
//!
//! [`ScoringService::load`] reads every artifact once (scalers, encoders,
//! selector, model). The loaded service is immutable and can be shared across
//! threads. Each request is validated, transformed with the persisted state,
//! reduced to the selected attributes and scored.
//!
//! # Wire format
//!
//! Requests are either column-oriented or a list of records:
//!
//! ```json
//! {"profissao": ["Advogado"], "renda": [20860.0], ...}
//! [{"profissao": "Advogado", "renda": "20860.0", ...}]
//! ```
//!
//! Responses:
//!
//! ```json
//! {"status": "sucesso", "resultados": [{"probabilidade": 0.81, "classe": "bom"}]}
//! {"status": "erro", "erro": {"code": "UNKNOWN_CATEGORY", "message": "..."}}
//! ```

use crate::data::feature_matrix;
use crate::error::{LearningError, Result};
use crate::model::LogisticModel;
use crate::selector::AttributeSelector;
use crate::types::Prediction;
use credit_processing::{FeaturePipeline, FittedState, PipelineError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// A scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreRequest {
    /// `[{"profissao": "Advogado", ...}, ...]`
    Records(Vec<Map<String, Value>>),
    /// `{"profissao": ["Advogado", ...], ...}`, or a single record with scalar values.
    Columns(Map<String, Value>),
}

impl ScoreRequest {
    /// Normalize to column name → one value per row.
    fn columns(&self) -> Result<(usize, BTreeMap<&str, Vec<&Value>>)> {
        let mut columns: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();

        let height = match self {
            Self::Records(rows) => {
                for row in rows {
                    for key in row.keys() {
                        columns.entry(key.as_str()).or_default();
                    }
                }
                for (name, values) in columns.iter_mut() {
                    for (i, row) in rows.iter().enumerate() {
                        let value = row.get(*name).ok_or_else(|| {
                            LearningError::schema(format!("row {} is missing field '{}'", i, name))
                        })?;
                        values.push(value);
                    }
                }
                rows.len()
            }
            Self::Columns(map) => {
                let columnar = map.values().any(Value::is_array);
                let mut height = None;
                for (name, value) in map {
                    let values: Vec<&Value> = match value {
                        Value::Array(items) => items.iter().collect(),
                        _ if columnar => {
                            return Err(LearningError::schema(format!(
                                "field '{}' must be a list like the other fields",
                                name
                            )));
                        }
                        scalar => vec![scalar],
                    };
                    match height {
                        None => height = Some(values.len()),
                        Some(h) if h != values.len() => {
                            return Err(LearningError::schema(format!(
                                "field '{}' has {} value(s), expected {}",
                                name,
                                values.len(),
                                h
                            )));
                        }
                        Some(_) => {}
                    }
                    columns.insert(name.as_str(), values);
                }
                height.unwrap_or(0)
            }
        };

        if height == 0 {
            return Err(LearningError::schema("request contains no rows"));
        }
        Ok((height, columns))
    }
}

/// Structured failure payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&LearningError> for ErrorPayload {
    fn from(err: &LearningError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// The response of [`ScoringService::handle_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ServiceResponse {
    #[serde(rename = "sucesso")]
    Success {
        #[serde(rename = "resultados")]
        results: Vec<Prediction>,
    },
    #[serde(rename = "erro")]
    Failure {
        #[serde(rename = "erro")]
        error: ErrorPayload,
    },
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Loaded artifacts ready to score requests.
#[derive(Debug, Clone)]
pub struct ScoringService {
    pipeline: FeaturePipeline,
    state: FittedState,
    selector: AttributeSelector,
    model: LogisticModel,
}

static_assertions::assert_impl_all!(ScoringService: Send, Sync);

impl ScoringService {
    /// Load all artifacts from `artifact_dir` with the default pipeline configuration.
    pub fn load(artifact_dir: impl Into<PathBuf>) -> Result<Self> {
        let pipeline = FeaturePipeline::builder()
            .artifact_dir(artifact_dir)
            .build()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))?;
        Self::with_pipeline(pipeline)
    }

    /// Load all artifacts from the pipeline's artifact directory.
    ///
    /// Fails if any artifact is absent or if the selector and the model come
    /// from different training runs.
    pub fn with_pipeline(pipeline: FeaturePipeline) -> Result<Self> {
        let state = pipeline.load_state()?;
        let selector = AttributeSelector::load(pipeline.store())?;
        let model = LogisticModel::load(pipeline.store())?;

        if model.feature_names != selector.selected() {
            return Err(LearningError::InferenceError(format!(
                "model expects [{}] but selector provides [{}]",
                model.feature_names.join(", "),
                selector.selected().join(", ")
            )));
        }

        info!(
            "Scoring service ready: {} attributes from {}",
            model.feature_names.len(),
            pipeline.store().dir().display()
        );
        Ok(Self {
            pipeline,
            state,
            selector,
            model,
        })
    }

    pub fn model(&self) -> &LogisticModel {
        &self.model
    }

    pub fn selector(&self) -> &AttributeSelector {
        &self.selector
    }

    /// Validate a request, then score every row.
    pub fn score(&self, request: &ScoreRequest) -> Result<Vec<Prediction>> {
        let df = self.request_frame(request)?;
        self.score_frame(df)
    }

    /// Score a clean table (already canonical, no nulls).
    pub fn score_frame(&self, df: DataFrame) -> Result<Vec<Prediction>> {
        let features = self.pipeline.transform(df, &self.state)?.data;
        let selected = self.selector.transform(&features)?;
        let x = feature_matrix(&selected, self.selector.selected())?;

        let predictions = self
            .model
            .predict_proba(&x)?
            .iter()
            .map(|&p| Prediction {
                probability: p,
                class: self.model.classify(p).to_string(),
            })
            .collect::<Vec<_>>();

        debug!("Scored {} row(s)", predictions.len());
        Ok(predictions)
    }

    /// Serving boundary: every failure becomes an error payload.
    pub fn handle_json(&self, body: &str) -> ServiceResponse {
        let outcome = serde_json::from_str::<ScoreRequest>(body)
            .map_err(|e| LearningError::schema(format!("malformed request: {}", e)))
            .and_then(|request| self.score(&request));

        match outcome {
            Ok(results) => {
                info!("Scored request with {} row(s)", results.len());
                ServiceResponse::Success { results }
            }
            Err(e) => {
                error!("Rejected request [{}]: {}", e.error_code(), e);
                ServiceResponse::Failure {
                    error: ErrorPayload::from(&e),
                }
            }
        }
    }

    /// Build the request table: numeric fields coerced to `f64`, categorical
    /// fields as text. The ratio column is taken as-is when present.
    fn request_frame(&self, request: &ScoreRequest) -> Result<DataFrame> {
        let config = self.pipeline.config();
        let (_, fields) = request.columns()?;

        let ratio = &config.ratio;
        let mut numeric: Vec<&str> = config
            .numeric_columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != ratio.name || fields.contains_key(c))
            .collect();
        for input in [&ratio.numerator, &ratio.denominator] {
            if !numeric.contains(&input.as_str()) {
                numeric.push(input);
            }
        }
        let categorical: Vec<&str> = config.categorical_columns.iter().map(String::as_str).collect();

        let missing: Vec<&str> = categorical
            .iter()
            .chain(numeric.iter())
            .filter(|c| !fields.contains_key(*c))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(LearningError::schema(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let mut columns: Vec<Column> = Vec::with_capacity(numeric.len() + categorical.len());
        for name in categorical {
            let raw = &fields[name];
            let values = raw
                .iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Value::String(s) => Ok(s.clone()),
                    Value::Null => Err(null_value(name, raw)),
                    other => Err(LearningError::schema(format!(
                        "field '{}' row {}: expected text, got {}",
                        name, row, other
                    ))),
                })
                .collect::<Result<Vec<String>>>()?;
            columns.push(Series::new(name.into(), values).into());
        }
        for name in numeric {
            let raw = &fields[name];
            let values = raw
                .iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Value::Null => Err(null_value(name, raw)),
                    other => coerce_number(other).ok_or_else(|| {
                        LearningError::schema(format!(
                            "field '{}' row {}: expected a number, got {}",
                            name, row, other
                        ))
                    }),
                })
                .collect::<Result<Vec<f64>>>()?;
            columns.push(Series::new(name.into(), values).into());
        }

        Ok(DataFrame::new(columns)?)
    }
}

fn null_value(column: &str, values: &[&Value]) -> LearningError {
    LearningError::Processing(PipelineError::NullValue {
        column: column.to_string(),
        count: values.iter().filter(|v| v.is_null()).count(),
    })
}

/// A JSON number, or a string holding one.
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(36)), Some(36.0));
        assert_eq!(coerce_number(&json!("20860.0")), Some(20860.0));
        assert_eq!(coerce_number(&json!(" 39 ")), Some(39.0));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_request_shapes_normalize_alike() {
        let columnar: ScoreRequest =
            serde_json::from_value(json!({"renda": [1.0, 2.0], "produto": ["A", "B"]})).unwrap();
        let records: ScoreRequest = serde_json::from_value(json!([
            {"renda": 1.0, "produto": "A"},
            {"renda": 2.0, "produto": "B"},
        ]))
        .unwrap();
        let single: ScoreRequest =
            serde_json::from_value(json!({"renda": 1.0, "produto": "A"})).unwrap();

        let (h1, c1) = columnar.columns().unwrap();
        let (h2, c2) = records.columns().unwrap();
        assert_eq!(h1, 2);
        assert_eq!(c1, c2);
        assert_eq!(h2, 2);
        assert_eq!(single.columns().unwrap().0, 1);
    }

    #[test]
    fn test_ragged_requests_are_schema_errors() {
        let ragged: ScoreRequest =
            serde_json::from_value(json!({"renda": [1.0, 2.0], "produto": ["A"]})).unwrap();
        assert_eq!(ragged.columns().unwrap_err().error_code(), "SCHEMA_ERROR");

        let mixed: ScoreRequest =
            serde_json::from_value(json!({"renda": [1.0], "produto": "A"})).unwrap();
        assert_eq!(mixed.columns().unwrap_err().error_code(), "SCHEMA_ERROR");

        let missing: ScoreRequest =
            serde_json::from_value(json!([{"renda": 1.0}, {"produto": "A"}])).unwrap();
        assert_eq!(missing.columns().unwrap_err().error_code(), "SCHEMA_ERROR");

        let empty: ScoreRequest = serde_json::from_value(json!([])).unwrap();
        assert!(empty.columns().is_err());
    }

    #[test]
    fn test_response_wire_format() {
        let ok = ServiceResponse::Success {
            results: vec![Prediction {
                probability: 0.25,
                class: "ruim".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "sucesso", "resultados": [{"probabilidade": 0.25, "classe": "ruim"}]})
        );

        let err = LearningError::schema("missing required field(s): renda");
        let failure = ServiceResponse::Failure {
            error: ErrorPayload::from(&err),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["status"], "erro");
        assert_eq!(value["erro"]["code"], "SCHEMA_ERROR");
        assert!(!failure.is_success());
    }
}
