//! Row mapping between PostgreSQL and the domain ledger types

use crate::domain::{
    AccessType, AgreementRecord, AuditId, AuditRecord, FieldAccessRecord, GuardError, Result,
    StudyId, UserId,
};
use serde_json::Value;
use tokio_postgres::Row;

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| GuardError::Database(format!("Failed to read column {name}: {e}")))
}

/// Map a `data_use_agreements` row
///
/// Scope columns are passed through untouched; parsing happens later so a bad
/// row can be skipped rather than failing the lookup.
pub fn agreement_from_row(row: &Row) -> Result<AgreementRecord> {
    Ok(AgreementRecord {
        dua_id: column(row, "dua_id")?,
        study_id: column(row, "study_id")?,
        user_id: column(row, "user_id")?,
        allowed_tables: column::<Option<Value>>(row, "allowed_tables")?.unwrap_or(Value::Null),
        allowed_fields: column::<Option<Value>>(row, "allowed_fields")?.unwrap_or(Value::Null),
        restrictions: column::<Option<Value>>(row, "restrictions")?.unwrap_or(Value::Null),
        start_date: column(row, "start_date")?,
        end_date: column(row, "end_date")?,
        active: column(row, "active")?,
    })
}

/// Map an `audit_log` row
pub fn audit_record_from_row(row: &Row) -> Result<AuditRecord> {
    let decision: String = column(row, "decision")?;
    let execution_time_ms: i64 = column(row, "execution_time_ms")?;

    Ok(AuditRecord {
        audit_id: AuditId::new(column::<String>(row, "audit_id")?).map_err(GuardError::Database)?,
        request_id: column(row, "request_id")?,
        user_id: UserId::new(column::<String>(row, "user_id")?).map_err(GuardError::Database)?,
        tool_name: column(row, "tool_name")?,
        timestamp: column(row, "timestamp")?,
        data_requested: column(row, "data_requested")?,
        decision: decision.parse().map_err(GuardError::Database)?,
        reason: column(row, "reason")?,
        modifications: column::<Option<Value>>(row, "modifications")?.unwrap_or(Value::Null),
        execution_time_ms: u64::try_from(execution_time_ms).unwrap_or(0),
        study_id: column::<Option<String>>(row, "study_id")?
            .map(StudyId::new)
            .transpose()
            .map_err(GuardError::Database)?,
    })
}

/// Map a `field_access_log` row
pub fn field_access_from_row(row: &Row) -> Result<FieldAccessRecord> {
    let access_type: String = column(row, "access_type")?;

    Ok(FieldAccessRecord {
        audit_id: AuditId::new(column::<String>(row, "audit_id")?).map_err(GuardError::Database)?,
        table_name: column(row, "table_name")?,
        field_name: column(row, "field_name")?,
        access_type: access_type
            .parse::<AccessType>()
            .map_err(GuardError::Database)?,
        phi_flag: column(row, "phi_flag")?,
        timestamp: column(row, "timestamp")?,
    })
}

/// Column value for `audit_log.modifications`; JSON `null` is stored as SQL NULL
pub fn modifications_param(record: &AuditRecord) -> Option<&Value> {
    if record.modifications.is_null() {
        None
    } else {
        Some(&record.modifications)
    }
}

/// Column value for `audit_log.execution_time_ms`
pub fn execution_time_param(record: &AuditRecord) -> i64 {
    i64::try_from(record.execution_time_ms).unwrap_or(i64::MAX)
}

/// Column value for `audit_log.decision`
pub fn decision_param(record: &AuditRecord) -> &'static str {
    record.decision.as_str()
}
