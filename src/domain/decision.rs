//! Compliance decision model

use super::ids::AuditId;
use serde::{Deserialize, Serialize};

/// Reason attached to every allowed decision
pub const GRANTED_WITH_MODIFICATIONS: &str = "granted with compliance modifications";

/// Transformations the caller must apply before releasing data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifications {
    /// Run the de-identification transform on result rows
    pub de_identify: bool,

    /// Only aggregate results may be returned
    pub aggregate_only: bool,

    /// Fields the caller may return (PHI removed); empty means no restriction
    pub limit_fields: Vec<String>,

    /// Add differential-privacy noise to aggregates
    pub add_noise: bool,

    /// Aggregate cells below this count must be suppressed or noised
    pub minimum_cell_size: u32,
}

impl Modifications {
    /// Whether any modification is in effect
    pub fn is_empty(&self) -> bool {
        !self.de_identify
            && !self.aggregate_only
            && self.limit_fields.is_empty()
            && !self.add_noise
            && self.minimum_cell_size == 0
    }
}

/// Outcome of evaluating one request
///
/// Returned once per request and never mutated afterwards; fields are only
/// reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceDecision {
    allowed: bool,
    reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modifications: Option<Modifications>,
    audit_id: AuditId,
}

impl ComplianceDecision {
    /// Creates an allowed decision; empty modifications collapse to `None`
    pub fn allowed(audit_id: AuditId, modifications: Modifications) -> Self {
        Self {
            allowed: true,
            reason: GRANTED_WITH_MODIFICATIONS.to_string(),
            modifications: (!modifications.is_empty()).then_some(modifications),
            audit_id,
        }
    }

    /// Creates a denied decision
    pub fn denied(audit_id: AuditId, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            modifications: None,
            audit_id,
        }
    }

    /// Whether the request may proceed
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Human-readable reason
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Modifications the caller must apply
    pub fn modifications(&self) -> Option<&Modifications> {
        self.modifications.as_ref()
    }

    /// Identifier of the audit record for this decision
    pub fn audit_id(&self) -> &AuditId {
        &self.audit_id
    }
}
