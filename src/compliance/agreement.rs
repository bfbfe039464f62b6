//! Data Use Agreement checks
//!
//! Requests without a study carry no study-specific restriction and pass.
//! Study-scoped requests need one active agreement for the (study, user) pair
//! whose window contains the request date, and whose scope covers every
//! requested table and then every requested field.

use crate::adapters::database::AgreementStore;
use crate::domain::{ComplianceError, DataAccessRequest, DataUseAgreement, GuardError};

/// Failure modes of an agreement check
#[derive(Debug)]
pub enum AgreementCheckError {
    /// A policy outcome that denies the request
    Denied(ComplianceError),
    /// The agreement store itself failed
    Store(GuardError),
}

/// Checks a request against the agreements held by `store`
///
/// Returns the agreement that authorized the request, or `None` when the
/// request is not study-scoped.
///
/// # Errors
///
/// Returns [`AgreementCheckError::Denied`] with `NoActiveAgreement`,
/// `UnauthorizedTable` or `UnauthorizedField`, or
/// [`AgreementCheckError::Store`] when the lookup fails.
pub async fn check_agreement(
    store: &dyn AgreementStore,
    request: &DataAccessRequest,
) -> Result<Option<DataUseAgreement>, AgreementCheckError> {
    let Some(study_id) = request.study_id() else {
        return Ok(None);
    };

    let candidates = store
        .find_agreements(study_id, request.user_id())
        .await
        .map_err(AgreementCheckError::Store)?;

    let day = request.timestamp().date_naive();
    let agreement = candidates
        .iter()
        .filter_map(|record| match record.parse() {
            Ok(agreement) => Some(agreement),
            Err(e) => {
                tracing::warn!(
                    dua_id = %record.dua_id,
                    study_id = %study_id,
                    error = %e,
                    "Ignoring malformed Data Use Agreement"
                );
                None
            }
        })
        .find(|agreement| agreement.is_in_effect_on(day))
        .ok_or(AgreementCheckError::Denied(ComplianceError::NoActiveAgreement))?;

    verify_scope(&agreement, request).map_err(AgreementCheckError::Denied)?;

    tracing::debug!(
        dua_id = %agreement.dua_id,
        study_id = %study_id,
        user_id = %request.user_id(),
        "Data Use Agreement covers request"
    );

    Ok(Some(agreement))
}

/// Verifies that the agreement scope covers the requested tables, then fields
pub fn verify_scope(
    agreement: &DataUseAgreement,
    request: &DataAccessRequest,
) -> Result<(), ComplianceError> {
    let requested = request.data_requested();

    let tables = agreement.allowed_tables.uncovered(&requested.tables);
    if !tables.is_empty() {
        return Err(ComplianceError::UnauthorizedTable(tables));
    }

    let fields = agreement.allowed_fields.uncovered(&requested.fields);
    if !fields.is_empty() {
        return Err(ComplianceError::UnauthorizedField(fields));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::AgreementRecord;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::{json, Value};

    fn agreement_record(tables: Value, fields: Value, active: bool) -> AgreementRecord {
        AgreementRecord {
            dua_id: "dua-1".to_string(),
            study_id: "sepsis-2024".to_string(),
            user_id: "dr.chen".to_string(),
            allowed_tables: tables,
            allowed_fields: fields,
            restrictions: Value::Null,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            active,
        }
    }

    fn request(study: Option<&str>, tables: &[&str], fields: &[&str], day: u32) -> DataAccessRequest {
        let mut builder = DataAccessRequest::builder()
            .user_id("dr.chen")
            .tool_name("query_vitals")
            .timestamp(Utc.with_ymd_and_hms(2024, 6, day, 15, 0, 0).unwrap())
            .tables(tables.iter().copied())
            .fields(fields.iter().copied());
        if let Some(study) = study {
            builder = builder.study_id(study);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_no_study_is_valid() {
        let store = InMemoryStore::new();
        let result = check_agreement(&store, &request(None, &["vitals"], &["age"], 1)).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_missing_agreement_denied() {
        let store = InMemoryStore::new();
        let result =
            check_agreement(&store, &request(Some("sepsis-2024"), &["vitals"], &[], 1)).await;
        assert!(matches!(
            result,
            Err(AgreementCheckError::Denied(ComplianceError::NoActiveAgreement))
        ));
    }

    #[tokio::test]
    async fn test_inactive_agreement_denied() {
        let store = InMemoryStore::new();
        store
            .insert_agreement(agreement_record(json!(["vitals"]), Value::Null, false))
            .await;
        let result =
            check_agreement(&store, &request(Some("sepsis-2024"), &["vitals"], &[], 1)).await;
        assert!(matches!(
            result,
            Err(AgreementCheckError::Denied(ComplianceError::NoActiveAgreement))
        ));
    }

    #[tokio::test]
    async fn test_end_date_is_inclusive() {
        let store = InMemoryStore::new();
        store
            .insert_agreement(agreement_record(json!(["vitals"]), Value::Null, true))
            .await;

        let on_end = check_agreement(&store, &request(Some("sepsis-2024"), &["vitals"], &[], 30)).await;
        assert!(matches!(on_end, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_unauthorized_table_named() {
        let store = InMemoryStore::new();
        store
            .insert_agreement(agreement_record(json!(["vitals"]), Value::Null, true))
            .await;

        let result = check_agreement(
            &store,
            &request(Some("sepsis-2024"), &["vitals", "restricted_table"], &[], 1),
        )
        .await;
        match result {
            Err(AgreementCheckError::Denied(ComplianceError::UnauthorizedTable(tables))) => {
                assert_eq!(tables, vec!["restricted_table".to_string()]);
            }
            other => panic!("expected UnauthorizedTable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_field_named() {
        let store = InMemoryStore::new();
        store
            .insert_agreement(agreement_record(json!(["vitals"]), json!(["heart_rate"]), true))
            .await;

        let result = check_agreement(
            &store,
            &request(Some("sepsis-2024"), &["vitals"], &["heart_rate", "diagnosis"], 1),
        )
        .await;
        assert!(matches!(
            result,
            Err(AgreementCheckError::Denied(ComplianceError::UnauthorizedField(ref f))) if f == &vec!["diagnosis".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_wildcard_tables() {
        let store = InMemoryStore::new();
        store
            .insert_agreement(agreement_record(json!(["*"]), Value::Null, true))
            .await;

        let result = check_agreement(
            &store,
            &request(Some("sepsis-2024"), &["labs", "restricted_table"], &["anything"], 1),
        )
        .await;
        assert!(matches!(result, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_malformed_agreement_treated_as_absent() {
        let store = InMemoryStore::new();
        store
            .insert_agreement(agreement_record(json!("not json ["), Value::Null, true))
            .await;

        let result =
            check_agreement(&store, &request(Some("sepsis-2024"), &["vitals"], &[], 1)).await;
        assert!(matches!(
            result,
            Err(AgreementCheckError::Denied(ComplianceError::NoActiveAgreement))
        ));
    }
}
