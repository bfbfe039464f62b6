//! Integration tests for the result transforms exposed by the service

use clinguard::adapters::memory::InMemoryStore;
use clinguard::compliance::{ComplianceService, Row};
use clinguard::config::{ComplianceConfig, DeIdentificationLevel};
use serde_json::{json, Value};
use std::sync::Arc;
use test_case::test_case;

fn service(level: DeIdentificationLevel, additional: &[&str]) -> ComplianceService {
    let store = Arc::new(InMemoryStore::new());
    let config = ComplianceConfig {
        deidentification_level: level,
        additional_identifiers: additional.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    ComplianceService::new(config, store.clone(), store)
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn patient() -> Row {
    row(json!({
        "name": "Ada Lovelace",
        "mrn": "MRN-0042",
        "birth_date": "1985-12-10",
        "zip_code": "02139",
        "employer": "Analytical Engines Ltd",
        "diagnosis": "J18.9",
        "heart_rate": 88
    }))
}

#[test]
fn test_safe_harbor_row() {
    let rows = service(DeIdentificationLevel::SafeHarbor, &["employer"])
        .de_identify_data(vec![patient()]);

    assert_eq!(
        Value::Object(rows[0].clone()),
        json!({
            "name": "[REDACTED]",
            "mrn": "[REDACTED]",
            "birth_year": 1985,
            "zip_code": "02100",
            "employer": "Analytical Engines Ltd",
            "diagnosis": "J18.9",
            "heart_rate": 88
        })
    );
}

#[test]
fn test_expert_determination_redacts_configured_identifiers() {
    let rows = service(DeIdentificationLevel::ExpertDetermination, &["employer"])
        .de_identify_data(vec![patient()]);

    assert_eq!(rows[0]["employer"], "[REDACTED]");
    assert_eq!(rows[0]["name"], "[REDACTED]");
    assert_eq!(rows[0]["diagnosis"], "J18.9");
}

#[test]
fn test_level_none_passes_rows_through() {
    let rows = service(DeIdentificationLevel::None, &[]).de_identify_data(vec![patient()]);
    assert_eq!(rows[0], patient());
}

#[test]
fn test_empty_input_yields_empty_output() {
    let rows = service(DeIdentificationLevel::SafeHarbor, &[]).de_identify_data(Vec::new());
    assert!(rows.is_empty());
}

#[test_case(json!(120) ; "integer count")]
#[test_case(json!({"female": 40, "male": 38, "label": "sex"}) ; "object of counts")]
#[test_case(json!([10, 20, {"n": 5}]) ; "array of mixed values")]
fn test_noise_preserves_shape(value: Value) {
    let noised = service(DeIdentificationLevel::SafeHarbor, &[])
        .add_differential_privacy(&value, 1.0)
        .unwrap();

    match (&value, &noised) {
        (Value::Number(_), Value::Number(n)) => assert!(n.is_i64()),
        (Value::Object(a), Value::Object(b)) => {
            assert_eq!(a.len(), b.len());
            assert_eq!(b["label"], "sex");
        }
        (Value::Array(a), Value::Array(b)) => {
            assert_eq!(a.len(), b.len());
            assert!(b[2]["n"].is_i64());
        }
        _ => panic!("shape changed: {value} -> {noised}"),
    }
}

#[test_case(0.0 ; "zero")]
#[test_case(-1.0 ; "negative")]
#[test_case(f64::INFINITY ; "infinite")]
fn test_noise_rejects_bad_epsilon(epsilon: f64) {
    let result = service(DeIdentificationLevel::SafeHarbor, &[])
        .add_differential_privacy(&json!(10), epsilon);
    assert!(result.is_err());
}

#[test]
fn test_non_numeric_values_pass_through_noise() {
    let value = json!({"cohort": "sepsis", "flag": true, "missing": null});
    let noised = service(DeIdentificationLevel::SafeHarbor, &[])
        .add_differential_privacy(&value, 0.1)
        .unwrap();
    assert_eq!(noised, value);
}
