//! Integration tests for training and scoring.
//!
//! Each test trains on a small raw extract into its own artifact directory,
//! then exercises the scoring service against those artifacts.

use credit_learning::{
    AttributeSelector, LogisticModel, ScoreRequest, ScoringService, ServiceResponse, Trainer,
    TrainingConfig, TrainingResult, MODEL_FILE, SELECTOR_FILE,
};
use credit_processing::io::read_table;
use credit_processing::{ArtifactStore, FeaturePipeline};
use ndarray::array;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_raw() -> DataFrame {
    read_table(fixtures_path().join("credit_train.csv")).expect("Failed to read fixture")
}

fn config(seed: u64) -> TrainingConfig {
    TrainingConfig::builder()
        .seed(seed)
        .epochs(200)
        .build()
        .unwrap()
}

fn train_into(dir: &TempDir, seed: u64) -> TrainingResult {
    let pipeline = FeaturePipeline::builder()
        .artifact_dir(dir.path())
        .build()
        .unwrap();
    Trainer::builder()
        .config(config(seed))
        .pipeline(pipeline)
        .build()
        .unwrap()
        .train(load_raw())
        .expect("training failed")
}

fn trained_service(dir: &TempDir) -> ScoringService {
    train_into(dir, 41);
    ScoringService::load(dir.path()).expect("failed to load artifacts")
}

/// The reference application, column-oriented.
fn reference_request() -> Value {
    json!({
        "profissao": ["Advogado"],
        "tempoprofissao": [39],
        "renda": [20860.0],
        "tiporesidencia": ["Própria"],
        "escolaridade": ["Superior"],
        "score": ["Baixo"],
        "idade": [36],
        "dependentes": [0],
        "estadocivil": ["Víuvo"],
        "produto": ["DoubleDuty"],
        "valorsolicitado": [139244.0],
        "valortotalbem": [320000.0]
    })
}

fn score(service: &ScoringService, request: Value) -> ServiceResponse {
    service.handle_json(&request.to_string())
}

fn error_code(response: &ServiceResponse) -> String {
    match response {
        ServiceResponse::Failure { error } => error.code.clone(),
        ServiceResponse::Success { .. } => panic!("expected a failure, got {:?}", response),
    }
}

fn probabilities(response: &ServiceResponse) -> Vec<f64> {
    match response {
        ServiceResponse::Success { results } => results.iter().map(|p| p.probability).collect(),
        ServiceResponse::Failure { error } => panic!("scoring failed: {:?}", error),
    }
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_train_persists_every_artifact() {
    let dir = TempDir::new().unwrap();
    let result = train_into(&dir, 41);

    // ceil(48 * 0.2) rows held out
    assert_eq!(result.train_rows, 38);
    assert!(result.test_rows > 0 && result.test_rows <= 10);
    assert_eq!(result.selected_features.len(), 10);
    assert_eq!(result.artifact_dir.as_path(), dir.path());

    let store = ArtifactStore::new(dir.path());
    assert!(dir.path().join(SELECTOR_FILE).is_file());
    assert!(dir.path().join(MODEL_FILE).is_file());
    assert!(store.scaler_path("renda").is_file());
    assert!(store.scaler_path("proporcaosolicitadototal").is_file());
    assert!(store.encoder_path("profissao").is_file());
}

#[test]
fn test_train_report_is_consistent() {
    let dir = TempDir::new().unwrap();
    let result = train_into(&dir, 41);
    let report = &result.report;

    assert!((0.0..=1.0).contains(&report.accuracy));
    assert_eq!(report.confusion_matrix.total(), result.test_rows);
    assert_eq!(report.classes[0].label, "ruim");
    assert_eq!(report.classes[1].label, "bom");
    assert_eq!(
        report.classes.iter().map(|c| c.support).sum::<usize>(),
        result.test_rows
    );

    let history = &result.history;
    assert!(history.epochs_run >= 1 && history.epochs_run <= 200);
    assert!(history.best_epoch >= 1 && history.best_epoch <= history.epochs_run);
    assert_eq!(history.train_loss.len(), history.epochs_run);
}

#[test]
fn test_same_seed_same_model() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    train_into(&first, 7);
    train_into(&second, 7);

    let a = LogisticModel::load(&ArtifactStore::new(first.path())).unwrap();
    let b = LogisticModel::load(&ArtifactStore::new(second.path())).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_train_without_label_column() {
    let dir = TempDir::new().unwrap();
    let raw = load_raw().drop("classe").unwrap();
    let pipeline = FeaturePipeline::builder()
        .artifact_dir(dir.path())
        .build()
        .unwrap();
    let err = Trainer::builder()
        .pipeline(pipeline)
        .build()
        .unwrap()
        .train(raw)
        .unwrap_err();
    assert_eq!(err.error_code(), "TARGET_NOT_FOUND");
}

#[test]
fn test_train_ignores_columns_outside_feature_set() {
    let dir = TempDir::new().unwrap();
    let mut raw = load_raw();
    // An identifier that happens to mirror the label
    let leak: Vec<i64> = raw
        .column("classe")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| i64::from(v == Some("bom")))
        .collect();
    raw.with_column(Series::new("clienteid".into(), leak)).unwrap();

    let pipeline = FeaturePipeline::builder()
        .artifact_dir(dir.path())
        .build()
        .unwrap();
    let result = Trainer::builder()
        .config(config(41))
        .pipeline(pipeline)
        .build()
        .unwrap()
        .train(raw)
        .expect("training failed");

    assert!(!result.selected_features.contains(&"clienteid".to_string()));
    assert!(result.warnings.iter().any(|w| w.contains("clienteid")));

    let service = ScoringService::load(dir.path()).expect("failed to load artifacts");
    assert!(service.handle_json(&reference_request().to_string()).is_success());
}

// ============================================================================
// Scoring
// ============================================================================

#[test]
fn test_score_reference_record() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    match score(&service, reference_request()) {
        ServiceResponse::Success { results } => {
            assert_eq!(results.len(), 1);
            let p = results[0].probability;
            assert!((0.0..=1.0).contains(&p));
            let expected = if p > 0.5 { "bom" } else { "ruim" };
            assert_eq!(results[0].class, expected);
        }
        ServiceResponse::Failure { error } => panic!("scoring failed: {:?}", error),
    }
}

#[test]
fn test_response_wire_format() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let value = serde_json::to_value(score(&service, reference_request())).unwrap();
    assert_eq!(value["status"], "sucesso");
    let row = &value["resultados"][0];
    assert!(row["probabilidade"].is_f64());
    assert!(row["classe"] == "bom" || row["classe"] == "ruim");
}

#[test]
fn test_request_shapes_score_alike() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let columnar = probabilities(&score(&service, reference_request()));

    let mut record = serde_json::Map::new();
    for (key, value) in reference_request().as_object().unwrap() {
        record.insert(key.clone(), value[0].clone());
    }
    let single = probabilities(&score(&service, Value::Object(record.clone())));
    let records = probabilities(&score(&service, json!([record.clone(), record])));

    assert_eq!(single, columnar);
    assert_eq!(records, vec![columnar[0], columnar[0]]);
}

#[test]
fn test_numeric_strings_are_coerced() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let mut request = reference_request();
    request["renda"] = json!(["20860.0"]);
    request["idade"] = json!(["36"]);

    assert_eq!(
        probabilities(&score(&service, request)),
        probabilities(&score(&service, reference_request()))
    );
}

#[test]
fn test_explicit_ratio_matches_derived_ratio() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let mut request = reference_request();
    request["proporcaosolicitadototal"] = json!([139244.0 / 320000.0]);

    let derived = probabilities(&score(&service, reference_request()));
    let explicit = probabilities(&score(&service, request));
    assert!((derived[0] - explicit[0]).abs() < 1e-12);
}

#[test]
fn test_unknown_category_is_rejected() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let mut request = reference_request();
    request["profissao"] = json!(["Astronauta"]);

    let response = score(&service, request);
    assert!(!response.is_success());
    assert_eq!(error_code(&response), "UNKNOWN_CATEGORY");
}

#[test]
fn test_invalid_requests_are_schema_errors() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let mut null_field = reference_request();
    null_field["renda"] = json!([null]);
    assert_eq!(error_code(&score(&service, null_field)), "SCHEMA_ERROR");

    let mut missing_field = reference_request();
    missing_field.as_object_mut().unwrap().remove("idade");
    assert_eq!(error_code(&score(&service, missing_field)), "SCHEMA_ERROR");

    let mut not_a_number = reference_request();
    not_a_number["renda"] = json!(["muito"]);
    assert_eq!(error_code(&score(&service, not_a_number)), "SCHEMA_ERROR");

    let mut ragged = reference_request();
    ragged["renda"] = json!([20860.0, 1000.0]);
    assert_eq!(error_code(&score(&service, ragged)), "SCHEMA_ERROR");

    let response = service.handle_json("{not json");
    assert_eq!(error_code(&response), "SCHEMA_ERROR");
}

#[test]
fn test_score_api_returns_typed_errors() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);

    let request: ScoreRequest = serde_json::from_value(json!({"renda": [1.0]})).unwrap();
    let err = service.score(&request).unwrap_err();
    assert_eq!(err.error_code(), "SCHEMA_ERROR");
    assert!(err.to_string().contains("profissao"));
}

// ============================================================================
// Artifact loading
// ============================================================================

#[test]
fn test_missing_model_is_model_not_found() {
    let dir = TempDir::new().unwrap();
    train_into(&dir, 41);
    std::fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();

    let err = ScoringService::load(dir.path()).unwrap_err();
    assert_eq!(err.error_code(), "MODEL_NOT_FOUND");
}

#[test]
fn test_empty_artifact_dir_is_missing_state() {
    let dir = TempDir::new().unwrap();
    let err = ScoringService::load(dir.path()).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_STATE");
}

#[test]
fn test_selector_from_another_run_is_rejected() {
    let dir = TempDir::new().unwrap();
    train_into(&dir, 41);

    let names = vec!["renda".to_string(), "idade".to_string()];
    let other = AttributeSelector::fit(
        &array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
        &array![0.0, 1.0, 1.0],
        &names,
        1,
        1,
    )
    .unwrap();
    other.save(&ArtifactStore::new(dir.path())).unwrap();

    let err = ScoringService::load(dir.path()).unwrap_err();
    assert_eq!(err.error_code(), "INFERENCE_ERROR");
}
