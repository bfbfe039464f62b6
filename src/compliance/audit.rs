//! Append-only audit ledger
//!
//! Every evaluation produces exactly one [`AuditRecord`] plus one
//! [`FieldAccessRecord`] per requested (table, field) pair. Rows are handed to
//! the [`AuditStore`] in a single atomic append and never modified afterwards.

use super::phi::is_phi_field;
use super::report::ComplianceReport;
use crate::adapters::database::AuditStore;
use crate::config::AuditLevel;
use crate::domain::{
    AccessType, AuditDecision, AuditId, AuditRecord, ComplianceDecision, DataAccessRequest,
    FieldAccessRecord, Result,
};
use crate::logging::FORENSIC_TARGET;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Rows written for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub record: AuditRecord,
    pub field_accesses: Vec<FieldAccessRecord>,
}

impl AuditEntry {
    /// Build the ledger rows for a decided request
    ///
    /// The record is stamped with the request timestamp so that reports
    /// line up with when access was asked for.
    pub fn build(
        request: &DataAccessRequest,
        decision: &ComplianceDecision,
        access_type: AccessType,
        execution_time_ms: u64,
    ) -> Result<Self> {
        let audit_id = decision.audit_id().clone();
        let timestamp = request.timestamp();

        let record = AuditRecord {
            audit_id: audit_id.clone(),
            request_id: request.request_id().to_string(),
            user_id: request.user_id().clone(),
            tool_name: request.tool_name().to_string(),
            timestamp,
            data_requested: serde_json::to_value(request.data_requested())?,
            decision: AuditDecision::from(decision.is_allowed()),
            reason: decision.reason().to_string(),
            modifications: serde_json::to_value(decision.modifications())?,
            execution_time_ms,
            study_id: request.study_id().cloned(),
        };

        let field_accesses = request
            .table_field_pairs()
            .map(|(table, field)| FieldAccessRecord {
                audit_id: audit_id.clone(),
                table_name: table.to_string(),
                field_name: field.to_string(),
                access_type,
                phi_flag: is_phi_field(field),
                timestamp,
            })
            .collect();

        Ok(Self {
            record,
            field_accesses,
        })
    }

    /// Number of PHI-flagged field rows
    pub fn phi_access_count(&self) -> usize {
        self.field_accesses.iter().filter(|f| f.phi_flag).count()
    }
}

/// Ledger over an [`AuditStore`]
#[derive(Clone)]
pub struct AuditLedger {
    store: Arc<dyn AuditStore>,
    level: AuditLevel,
}

impl AuditLedger {
    pub fn new(store: Arc<dyn AuditStore>, level: AuditLevel) -> Self {
        Self { store, level }
    }

    pub fn level(&self) -> AuditLevel {
        self.level
    }

    /// Append the entry to the store
    ///
    /// The record is written at every audit level. `detailed` and above log
    /// each PHI field access; `forensic` also emits a diagnostic snapshot.
    ///
    /// # Errors
    ///
    /// Returns the store error if the rows were not committed.
    pub async fn record(&self, entry: &AuditEntry, request: &DataAccessRequest) -> Result<()> {
        self.store
            .append(&entry.record, &entry.field_accesses)
            .await?;

        if self.level >= AuditLevel::Detailed {
            for access in entry.field_accesses.iter().filter(|f| f.phi_flag) {
                tracing::debug!(
                    audit_id = %access.audit_id,
                    table = %access.table_name,
                    field = %access.field_name,
                    access_type = %access.access_type,
                    "PHI field access recorded"
                );
            }
        }

        if self.level == AuditLevel::Forensic {
            emit_forensic_snapshot(&entry.record.audit_id, request);
        }

        Ok(())
    }

    /// Aggregate the ledger over `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns the store error if the window cannot be read.
    pub async fn report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        data_retention_days: u32,
    ) -> Result<ComplianceReport> {
        let window = self.store.fetch_window(start, end).await?;
        Ok(ComplianceReport::from_window(
            &window,
            start,
            end,
            data_retention_days,
        ))
    }
}

/// SHA-256 hex digest of the serialized request
pub fn request_fingerprint(request: &DataAccessRequest) -> String {
    let mut hasher = Sha256::new();
    match serde_json::to_vec(request) {
        Ok(bytes) => hasher.update(&bytes),
        Err(_) => hasher.update(request.request_id().as_bytes()),
    }
    format!("{:x}", hasher.finalize())
}

/// Best-effort snapshot on the forensic target; never fails the caller
fn emit_forensic_snapshot(audit_id: &AuditId, request: &DataAccessRequest) {
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    tracing::info!(
        target: FORENSIC_TARGET,
        audit_id = %audit_id,
        pid = std::process::id(),
        host = %host,
        cwd = %cwd,
        version = env!("CARGO_PKG_VERSION"),
        user_id = %request.user_id(),
        tool_name = %request.tool_name(),
        purpose = %request.purpose(),
        request_fingerprint = %request_fingerprint(request),
        "Forensic snapshot"
    );
}
