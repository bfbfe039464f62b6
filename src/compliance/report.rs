//! Compliance reporting over the audit ledger
//!
//! Reports are pure aggregations of committed rows; nothing is written back.

use crate::domain::{AuditDecision, AuditWindow, GuardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How many denial reasons a report lists
pub const TOP_DENIAL_REASONS: usize = 5;

/// Count of denials sharing one reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialReasonCount {
    pub reason: String,
    pub count: u64,
}

/// Aggregate view of guard activity over a closed time range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_requests: u64,
    pub allowed: u64,
    pub denied: u64,
    pub unique_users: u64,
    pub avg_execution_time_ms: f64,
    /// Field access rows flagged as PHI
    pub phi_field_accesses: u64,
    /// Requests that touched at least one PHI field
    pub requests_with_phi: u64,
    pub compliance_rate_percent: f64,
    pub data_retention_days: u32,
    pub top_denial_reasons: Vec<DenialReasonCount>,
}

impl ComplianceReport {
    /// Aggregate a window of ledger rows
    pub fn from_window(
        window: &AuditWindow,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        data_retention_days: u32,
    ) -> Self {
        let total = window.records.len() as u64;
        let allowed = window
            .records
            .iter()
            .filter(|r| r.decision == AuditDecision::Allowed)
            .count() as u64;

        let unique_users: BTreeSet<&str> =
            window.records.iter().map(|r| r.user_id.as_str()).collect();

        let avg_execution_time_ms = if total == 0 {
            0.0
        } else {
            let sum: u64 = window.records.iter().map(|r| r.execution_time_ms).sum();
            round2(sum as f64 / total as f64)
        };

        let phi_rows = window.field_accesses.iter().filter(|f| f.phi_flag);
        let phi_field_accesses = phi_rows.clone().count() as u64;
        let requests_with_phi = phi_rows
            .map(|f| f.audit_id.as_str())
            .collect::<BTreeSet<_>>()
            .len() as u64;

        let mut denial_counts: BTreeMap<&str, u64> = BTreeMap::new();
        for record in window
            .records
            .iter()
            .filter(|r| r.decision == AuditDecision::Denied)
        {
            *denial_counts.entry(record.reason.as_str()).or_insert(0) += 1;
        }
        let mut top_denial_reasons: Vec<DenialReasonCount> = denial_counts
            .into_iter()
            .map(|(reason, count)| DenialReasonCount {
                reason: reason.to_string(),
                count,
            })
            .collect();
        // Stable sort keeps alphabetical order among equal counts
        top_denial_reasons.sort_by(|a, b| b.count.cmp(&a.count));
        top_denial_reasons.truncate(TOP_DENIAL_REASONS);

        Self {
            period_start,
            period_end,
            total_requests: total,
            allowed,
            denied: total - allowed,
            unique_users: unique_users.len() as u64,
            avg_execution_time_ms,
            phi_field_accesses,
            requests_with_phi,
            compliance_rate_percent: compliance_rate(allowed, total),
            data_retention_days,
            top_denial_reasons,
        }
    }

    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::Serialization(format!("Failed to render report: {e}")))
    }

    /// Format the report as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("📊 Compliance Report\n");
        summary.push_str(&format!(
            "  Period: {} .. {}\n",
            self.period_start.to_rfc3339(),
            self.period_end.to_rfc3339()
        ));
        summary.push_str(&format!("  Total requests: {}\n", self.total_requests));
        summary.push_str(&format!("  ✅ Allowed: {}\n", self.allowed));
        summary.push_str(&format!("  ❌ Denied: {}\n", self.denied));
        summary.push_str(&format!("  Unique users: {}\n", self.unique_users));
        summary.push_str(&format!(
            "  Avg execution time: {:.2} ms\n",
            self.avg_execution_time_ms
        ));
        summary.push_str(&format!(
            "  PHI field accesses: {} ({} requests)\n",
            self.phi_field_accesses, self.requests_with_phi
        ));
        summary.push_str(&format!(
            "  Compliance rate: {:.2}%\n",
            self.compliance_rate_percent
        ));
        summary.push_str(&format!(
            "  Data retention: {} days\n",
            self.data_retention_days
        ));

        if !self.top_denial_reasons.is_empty() {
            summary.push_str("\n❌ Top denial reasons:\n");
            for (i, entry) in self.top_denial_reasons.iter().enumerate() {
                summary.push_str(&format!("  {}. {} ({})\n", i + 1, entry.reason, entry.count));
            }
        }

        summary
    }
}

/// Share of allowed requests in percent, two decimals; 100 for no requests
pub fn compliance_rate(allowed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    round2(allowed as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
