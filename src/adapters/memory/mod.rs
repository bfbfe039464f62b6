//! In-memory storage backend
//!
//! Backs `database_target = "memory"`, dry runs and tests. Agreements and
//! ledger rows live in `RwLock`ed vectors for the lifetime of the process.

use crate::adapters::database::traits::{AgreementStore, AuditStore};
use crate::domain::{
    AgreementRecord, AuditRecord, AuditWindow, FieldAccessRecord, GuardError, Result, StudyId,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    records: Vec<AuditRecord>,
    field_accesses: Vec<FieldAccessRecord>,
}

/// Process-local agreement and audit store
///
/// # Examples
///
/// ```
/// use clinguard::adapters::memory::InMemoryStore;
///
/// # async fn example() {
/// let store = InMemoryStore::new();
/// assert_eq!(store.audit_record_count().await, 0);
/// # }
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    agreements: RwLock<Vec<AgreementRecord>>,
    ledger: RwLock<Ledger>,
    fail_audit_writes: AtomicBool,
    lookup_delay: Option<Duration>,
    append_delay: Option<Duration>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every agreement lookup (used to exercise evaluation timeouts)
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    /// Delay every audit append (used to exercise evaluation timeouts)
    pub fn with_append_delay(mut self, delay: Duration) -> Self {
        self.append_delay = Some(delay);
        self
    }

    /// Seed an agreement row
    pub async fn insert_agreement(&self, record: AgreementRecord) {
        self.agreements.write().await.push(record);
    }

    /// Make subsequent audit appends fail (or succeed again)
    pub fn set_fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every committed audit record
    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.ledger.read().await.records.clone()
    }

    /// Snapshot of every committed field access row
    pub async fn field_accesses(&self) -> Vec<FieldAccessRecord> {
        self.ledger.read().await.field_accesses.clone()
    }

    /// Number of committed audit records
    pub async fn audit_record_count(&self) -> usize {
        self.ledger.read().await.records.len()
    }
}

#[async_trait]
impl AgreementStore for InMemoryStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn find_agreements(
        &self,
        study_id: &StudyId,
        user_id: &UserId,
    ) -> Result<Vec<AgreementRecord>> {
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }

        let agreements = self.agreements.read().await;
        Ok(agreements
            .iter()
            .filter(|a| a.study_id == study_id.as_str() && a.user_id == user_id.as_str())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn append(
        &self,
        record: &AuditRecord,
        field_accesses: &[FieldAccessRecord],
    ) -> Result<()> {
        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(GuardError::Database(
                "in-memory audit store is rejecting writes".to_string(),
            ));
        }

        // One write guard covers both vectors so readers never see a partial append
        let mut ledger = self.ledger.write().await;
        if ledger.records.iter().any(|r| r.audit_id == record.audit_id) {
            return Err(GuardError::Database(format!(
                "duplicate audit_id {}",
                record.audit_id
            )));
        }
        ledger.records.push(record.clone());
        ledger.field_accesses.extend_from_slice(field_accesses);
        Ok(())
    }

    async fn fetch_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<AuditWindow> {
        let ledger = self.ledger.read().await;
        let in_window = |ts: &DateTime<Utc>| *ts >= start && *ts <= end;

        Ok(AuditWindow {
            records: ledger
                .records
                .iter()
                .filter(|r| in_window(&r.timestamp))
                .cloned()
                .collect(),
            field_accesses: ledger
                .field_accesses
                .iter()
                .filter(|f| in_window(&f.timestamp))
                .cloned()
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccessType, AuditDecision, AuditId};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn audit_record(at: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            audit_id: AuditId::generate(),
            request_id: "req-1".to_string(),
            user_id: UserId::new("dr.chen").unwrap(),
            tool_name: "query_vitals".to_string(),
            timestamp: at,
            data_requested: json!({"tables": ["vitals"]}),
            decision: AuditDecision::Allowed,
            reason: "granted with compliance modifications".to_string(),
            modifications: serde_json::Value::Null,
            execution_time_ms: 2,
            study_id: None,
        }
    }

    fn agreement(study: &str, user: &str) -> AgreementRecord {
        AgreementRecord {
            dua_id: format!("dua-{study}-{user}"),
            study_id: study.to_string(),
            user_id: user.to_string(),
            allowed_tables: json!(["vitals"]),
            allowed_fields: serde_json::Value::Null,
            restrictions: serde_json::Value::Null,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            active: true,
        }
    }

    #[tokio::test]
    async fn test_find_agreements_filters_by_pair() {
        let store = InMemoryStore::new();
        store.insert_agreement(agreement("sepsis", "dr.chen")).await;
        store.insert_agreement(agreement("sepsis", "dr.ross")).await;
        store.insert_agreement(agreement("cardio", "dr.chen")).await;

        let found = store
            .find_agreements(
                &StudyId::new("sepsis").unwrap(),
                &UserId::new("dr.chen").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dua_id, "dua-sepsis-dr.chen");
    }

    #[tokio::test]
    async fn test_append_and_fetch_window() {
        let store = InMemoryStore::new();
        let inside = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let record = audit_record(inside);
        let access = FieldAccessRecord {
            audit_id: record.audit_id.clone(),
            table_name: "vitals".to_string(),
            field_name: "heart_rate".to_string(),
            access_type: AccessType::Aggregate,
            phi_flag: false,
            timestamp: inside,
        };
        store.append(&record, &[access]).await.unwrap();
        store.append(&audit_record(outside), &[]).await.unwrap();

        let window = store
            .fetch_window(
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(window.records.len(), 1);
        assert_eq!(window.field_accesses.len(), 1);
        assert_eq!(store.audit_record_count().await, 2);
    }

    #[tokio::test]
    async fn test_failure_injection_writes_nothing() {
        let store = InMemoryStore::new();
        store.set_fail_audit_writes(true);

        let result = store.append(&audit_record(Utc::now()), &[]).await;
        assert!(matches!(result, Err(GuardError::Database(_))));
        assert_eq!(store.audit_record_count().await, 0);

        store.set_fail_audit_writes(false);
        assert!(store.append(&audit_record(Utc::now()), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_audit_id_rejected() {
        let store = InMemoryStore::new();
        let record = audit_record(Utc::now());
        store.append(&record, &[]).await.unwrap();
        assert!(store.append(&record, &[]).await.is_err());
        assert_eq!(store.audit_record_count().await, 1);
    }
}
