//! PostgreSQL store implementation
//!
//! Implements [`AgreementStore`] and [`AuditStore`] over a pooled client.
//! Audit appends run in one transaction so an audit record is never
//! committed without its field access rows.

use super::client::PostgreSQLClient;
use super::models::{
    agreement_from_row, audit_record_from_row, decision_param, execution_time_param,
    field_access_from_row, modifications_param,
};
use crate::adapters::database::traits::{AgreementStore, AuditStore};
use crate::domain::{
    AgreementRecord, AuditRecord, AuditWindow, FieldAccessRecord, GuardError, Result, StudyId,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;

const SELECT_AGREEMENTS: &str = "SELECT dua_id, study_id, user_id, allowed_tables, allowed_fields, \
     restrictions, start_date, end_date, active \
     FROM data_use_agreements WHERE study_id = $1 AND user_id = $2";

const INSERT_AUDIT_RECORD: &str = "INSERT INTO audit_log (audit_id, request_id, user_id, tool_name, \
     timestamp, data_requested, decision, reason, modifications, execution_time_ms, study_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const INSERT_FIELD_ACCESS: &str = "INSERT INTO field_access_log (audit_id, table_name, field_name, \
     access_type, phi_flag, timestamp) VALUES ($1, $2, $3, $4, $5, $6)";

const SELECT_AUDIT_WINDOW: &str = "SELECT audit_id, request_id, user_id, tool_name, timestamp, \
     data_requested, decision, reason, modifications, execution_time_ms, study_id \
     FROM audit_log WHERE timestamp BETWEEN $1 AND $2 ORDER BY timestamp";

const SELECT_FIELD_ACCESS_WINDOW: &str = "SELECT audit_id, table_name, field_name, access_type, \
     phi_flag, timestamp FROM field_access_log WHERE timestamp BETWEEN $1 AND $2 ORDER BY id";

/// PostgreSQL-backed agreement and audit store
pub struct PostgreSQLStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLStore {
    /// Create a new store over a client
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl AgreementStore for PostgreSQLStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn find_agreements(
        &self,
        study_id: &StudyId,
        user_id: &UserId,
    ) -> Result<Vec<AgreementRecord>> {
        let rows = self
            .client
            .query(SELECT_AGREEMENTS, &[&study_id.as_str(), &user_id.as_str()])
            .await?;

        rows.iter().map(agreement_from_row).collect()
    }
}

#[async_trait]
impl AuditStore for PostgreSQLStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn append(
        &self,
        record: &AuditRecord,
        field_accesses: &[FieldAccessRecord],
    ) -> Result<()> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| GuardError::Database(format!("Failed to begin transaction: {e}")))?;

        let study_id = record.study_id.as_ref().map(|s| s.as_str());
        tx.execute(
            INSERT_AUDIT_RECORD,
            &[
                &record.audit_id.as_str(),
                &record.request_id,
                &record.user_id.as_str(),
                &record.tool_name,
                &record.timestamp,
                &record.data_requested,
                &decision_param(record),
                &record.reason,
                &modifications_param(record),
                &execution_time_param(record),
                &study_id,
            ],
        )
        .await
        .map_err(|e| {
            GuardError::Database(format!(
                "Failed to insert audit record {}: {e}",
                record.audit_id
            ))
        })?;

        for access in field_accesses {
            tx.execute(
                INSERT_FIELD_ACCESS,
                &[
                    &access.audit_id.as_str(),
                    &access.table_name,
                    &access.field_name,
                    &access.access_type.as_str(),
                    &access.phi_flag,
                    &access.timestamp,
                ],
            )
            .await
            .map_err(|e| {
                GuardError::Database(format!(
                    "Failed to insert field access for {}: {e}",
                    access.audit_id
                ))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| GuardError::Database(format!("Failed to commit audit entry: {e}")))?;

        tracing::trace!(
            audit_id = %record.audit_id,
            field_rows = field_accesses.len(),
            "Audit entry committed"
        );
        Ok(())
    }

    async fn fetch_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<AuditWindow> {
        let records = self
            .client
            .query(SELECT_AUDIT_WINDOW, &[&start, &end])
            .await?
            .iter()
            .map(audit_record_from_row)
            .collect::<Result<Vec<_>>>()?;

        let field_accesses = self
            .client
            .query(SELECT_FIELD_ACCESS_WINDOW, &[&start, &end])
            .await?
            .iter()
            .map(field_access_from_row)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            records = records.len(),
            field_accesses = field_accesses.len(),
            "Fetched audit window"
        );

        Ok(AuditWindow {
            records,
            field_accesses,
        })
    }
}
