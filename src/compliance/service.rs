//! Compliance service - orchestrates agreement checks, policy rules and auditing
//!
//! A request moves from pending to exactly one terminal state, allowed or
//! denied, and exactly one audit entry is written before the decision is
//! returned. Timeouts and store failures become denials; they never bypass
//! the ledger.

use super::agreement::{check_agreement, AgreementCheckError};
use super::audit::{AuditEntry, AuditLedger};
use super::deidentify::{DeIdentifier, Row};
use super::noise::PrivacyNoiseInjector;
use super::policy::{PolicyEngine, PolicyEvaluation};
use super::report::ComplianceReport;
use crate::adapters::database::{create_stores, AgreementStore, AuditStore};
use crate::config::{ComplianceConfig, DeIdentificationLevel, GuardConfig};
use crate::domain::{
    AccessType, AuditId, ComplianceDecision, ComplianceError, DataAccessRequest, GuardError,
    Modifications, Result,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// An evaluation whose decision could not be durably audited
///
/// When `error` is an evaluation timeout the append may still have committed
/// after the deadline, so the ledger can hold a record for `audit_id` whose
/// decision differs from the denial the caller received. Reconcile against
/// the ledger by `audit_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditFailure {
    pub audit_id: AuditId,
    pub request_id: String,
    pub error: ComplianceError,
}

/// Decision reached before auditing, with the granularity it applies to
struct Outcome {
    decision: ComplianceDecision,
    access_type: AccessType,
}

/// Compliance service
///
/// Constructed once with its configuration and stores, then shared by
/// reference; evaluations take `&self` and may run concurrently.
pub struct ComplianceService {
    config: ComplianceConfig,
    agreements: Arc<dyn AgreementStore>,
    ledger: AuditLedger,
    policy: PolicyEngine,
    deidentifier: DeIdentifier,
    failures: Option<UnboundedSender<AuditFailure>>,
}

impl ComplianceService {
    /// Create a service over explicit stores
    pub fn new(
        config: ComplianceConfig,
        agreements: Arc<dyn AgreementStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        let ledger = AuditLedger::new(audit, config.audit_level);
        let deidentifier = DeIdentifier::new(config.deidentification_level)
            .with_additional_identifiers(config.additional_identifiers.clone());

        Self {
            config,
            agreements,
            ledger,
            policy: PolicyEngine::new(),
            deidentifier,
            failures: None,
        }
    }

    /// Create a service with stores built from the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be created.
    pub async fn from_config(config: &GuardConfig) -> Result<Self> {
        let (agreements, audit) = create_stores(config).await?;
        Ok(Self::new(config.compliance.clone(), agreements, audit))
    }

    /// Report audit write failures on `sender`
    pub fn with_failure_channel(mut self, sender: UnboundedSender<AuditFailure>) -> Self {
        self.failures = Some(sender);
        self
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.config.evaluation_timeout_ms)
    }

    /// Evaluate one request and audit the decision
    ///
    /// Never returns an error: every failure mode maps to a denied decision.
    pub async fn evaluate_request(&self, request: &DataAccessRequest) -> ComplianceDecision {
        let start = Instant::now();
        let audit_id = AuditId::generate();

        let outcome = self.decide(request, audit_id).await;
        let execution_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.audit(request, outcome, execution_time_ms).await
    }

    /// Evaluate requests concurrently; decisions come back in input order
    pub async fn evaluate_batch(&self, requests: &[DataAccessRequest]) -> Vec<ComplianceDecision> {
        join_all(requests.iter().map(|request| self.evaluate_request(request))).await
    }

    async fn decide(&self, request: &DataAccessRequest, audit_id: AuditId) -> Outcome {
        let requested_type = if request.data_requested().row_level {
            AccessType::RowLevel
        } else {
            AccessType::Aggregate
        };
        let deny = |audit_id: AuditId, error: ComplianceError| Outcome {
            decision: ComplianceDecision::denied(audit_id, error.denial_reason()),
            access_type: requested_type,
        };

        let lookup = tokio::time::timeout(
            self.evaluation_timeout(),
            check_agreement(self.agreements.as_ref(), request),
        )
        .await;

        match lookup {
            Err(_) => {
                tracing::warn!(
                    request_id = %request.request_id(),
                    timeout_ms = self.config.evaluation_timeout_ms,
                    "Agreement lookup timed out"
                );
                return deny(audit_id, ComplianceError::EvaluationTimeout);
            }
            Ok(Err(AgreementCheckError::Denied(error))) => return deny(audit_id, error),
            Ok(Err(AgreementCheckError::Store(error))) => {
                crate::log_error_with_context!(
                    error,
                    "Agreement store failed; denying request",
                    request_id = %request.request_id()
                );
                return deny(audit_id, ComplianceError::NoActiveAgreement);
            }
            Ok(Ok(_)) => {}
        }

        let evaluation = self.policy.evaluate(request, &self.config);

        match self.modifications(request, &evaluation) {
            Ok(modifications) => Outcome {
                decision: ComplianceDecision::allowed(audit_id, modifications),
                access_type: if evaluation.effective_row_level(request) {
                    AccessType::RowLevel
                } else {
                    AccessType::Aggregate
                },
            },
            Err(error) => deny(audit_id, error),
        }
    }

    /// Turn rule outputs into modifications, or the PHI denial
    fn modifications(
        &self,
        request: &DataAccessRequest,
        evaluation: &PolicyEvaluation,
    ) -> std::result::Result<Modifications, ComplianceError> {
        let mut modifications = Modifications::default();
        let requested = request.data_requested();

        if !evaluation.phi_fields.is_empty() && self.config.hipaa_compliant {
            if self.config.deidentification_level == DeIdentificationLevel::None {
                return Err(ComplianceError::PhiWithoutDeidentificationPolicy);
            }
            modifications.de_identify = true;
            modifications.limit_fields = requested
                .fields
                .difference(&evaluation.phi_fields)
                .cloned()
                .collect();
        }

        if requested.row_level && !evaluation.row_level_allowed {
            modifications.aggregate_only = true;
        }

        if evaluation.minimum_cell_size > 0 && !evaluation.effective_row_level(request) {
            modifications.add_noise = true;
            modifications.minimum_cell_size = evaluation.minimum_cell_size;
        }

        Ok(modifications)
    }

    /// Write the audit entry; any failure here turns the decision into a denial
    async fn audit(
        &self,
        request: &DataAccessRequest,
        outcome: Outcome,
        execution_time_ms: u64,
    ) -> ComplianceDecision {
        let Outcome {
            decision,
            access_type,
        } = outcome;
        let audit_id = decision.audit_id().clone();

        let entry = match AuditEntry::build(request, &decision, access_type, execution_time_ms) {
            Ok(entry) => entry,
            Err(e) => {
                return self.fail_closed(
                    request,
                    audit_id,
                    ComplianceError::AuditWriteFailure(e.to_string()),
                )
            }
        };

        let write = tokio::time::timeout(
            self.evaluation_timeout(),
            self.ledger.record(&entry, request),
        )
        .await;

        match write {
            Ok(Ok(())) => {
                crate::log_decision!(
                    audit_id,
                    request.user_id(),
                    request.tool_name(),
                    decision.is_allowed(),
                    decision.reason(),
                    execution_time_ms
                );
                decision
            }
            Ok(Err(e)) => self.fail_closed(
                request,
                audit_id,
                ComplianceError::AuditWriteFailure(e.to_string()),
            ),
            Err(_) => self.fail_closed(request, audit_id, ComplianceError::EvaluationTimeout),
        }
    }

    fn fail_closed(
        &self,
        request: &DataAccessRequest,
        audit_id: AuditId,
        error: ComplianceError,
    ) -> ComplianceDecision {
        crate::log_error_with_context!(
            error,
            "Audit write failed; denying request",
            audit_id = %audit_id,
            request_id = %request.request_id(),
            user_id = %request.user_id()
        );

        let decision = ComplianceDecision::denied(audit_id.clone(), error.denial_reason());

        if let Some(sender) = &self.failures {
            let failure = AuditFailure {
                audit_id,
                request_id: request.request_id().to_string(),
                error,
            };
            if sender.send(failure).is_err() {
                tracing::warn!("Audit failure channel closed; failure only logged");
            }
        }

        decision
    }

    /// Apply the configured de-identification level to caller-supplied rows
    pub fn de_identify_data(&self, rows: Vec<Row>) -> Vec<Row> {
        self.deidentifier.de_identify(rows)
    }

    /// Add Laplace noise to a caller-supplied value
    ///
    /// # Errors
    ///
    /// Returns a validation error if `epsilon` is not positive.
    pub fn add_differential_privacy(&self, value: &Value, epsilon: f64) -> Result<Value> {
        PrivacyNoiseInjector::new().add_noise(value, epsilon)
    }

    /// Aggregate the audit ledger over `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns a validation error for an inverted range, or the store error
    /// if the ledger cannot be read.
    pub async fn generate_compliance_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ComplianceReport> {
        if start > end {
            return Err(GuardError::Validation(format!(
                "report start {start} is after end {end}"
            )));
        }
        self.ledger
            .report(start, end, self.config.data_retention_days)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::decision::GRANTED_WITH_MODIFICATIONS;

    fn service(config: ComplianceConfig) -> (ComplianceService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (
            ComplianceService::new(config, store.clone(), store.clone()),
            store,
        )
    }

    fn request(fields: &[&str], row_level: bool) -> DataAccessRequest {
        DataAccessRequest::builder()
            .user_id("dr.chen")
            .tool_name("query_vitals")
            .tables(["vitals"])
            .fields(fields.iter().copied())
            .row_level(row_level)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_row_level_downgraded_under_hipaa() {
        let (service, _) = service(ComplianceConfig::default());
        let decision = service.evaluate_request(&request(&["heart_rate"], true)).await;

        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), GRANTED_WITH_MODIFICATIONS);
        let mods = decision.modifications().unwrap();
        assert!(mods.aggregate_only);
        assert!(mods.add_noise);
        assert_eq!(mods.minimum_cell_size, 11);
        assert!(!mods.de_identify);
    }

    #[tokio::test]
    async fn test_row_level_opt_in_skips_cell_suppression() {
        let (service, store) = service(ComplianceConfig {
            allow_row_level_data: true,
            ..Default::default()
        });
        let decision = service.evaluate_request(&request(&["heart_rate"], true)).await;

        assert!(decision.is_allowed());
        assert!(decision.modifications().is_none());
        let accesses = store.field_accesses().await;
        assert_eq!(accesses[0].access_type, AccessType::RowLevel);
    }

    #[tokio::test]
    async fn test_phi_without_hipaa_is_unmodified() {
        let (service, _) = service(ComplianceConfig {
            hipaa_compliant: false,
            deidentification_level: DeIdentificationLevel::None,
            ..Default::default()
        });
        let decision = service.evaluate_request(&request(&["name"], false)).await;
        assert!(decision.is_allowed());
        assert!(decision.modifications().is_none());
    }

    #[tokio::test]
    async fn test_every_decision_is_audited_once() {
        let (service, store) = service(ComplianceConfig::default());
        let requests = vec![
            request(&["age"], false),
            request(&["name"], true),
            request(&["heart_rate"], true),
        ];
        let decisions = service.evaluate_batch(&requests).await;
        let records = store.audit_records().await;

        assert_eq!(records.len(), decisions.len());
        for decision in &decisions {
            let matching: Vec<_> = records
                .iter()
                .filter(|r| &r.audit_id == decision.audit_id())
                .collect();
            assert_eq!(matching.len(), 1);
            assert_eq!(matching[0].decision.as_str() == "ALLOWED", decision.is_allowed());
        }
    }

    #[tokio::test]
    async fn test_inverted_report_range_rejected() {
        let (service, _) = service(ComplianceConfig::default());
        let now = Utc::now();
        let result = service
            .generate_compliance_report(now, now - chrono::Duration::days(1))
            .await;
        assert!(matches!(result, Err(GuardError::Validation(_))));
    }

    #[test]
    fn test_add_differential_privacy_validates_epsilon() {
        let (service, _) = service(ComplianceConfig::default());
        assert!(service
            .add_differential_privacy(&serde_json::json!(5), 0.0)
            .is_err());
        assert!(service
            .add_differential_privacy(&serde_json::json!(5), 1.0)
            .unwrap()
            .is_i64());
    }
}
