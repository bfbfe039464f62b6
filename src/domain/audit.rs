//! Audit ledger records
//!
//! These rows form the compliance history of record. They are appended once
//! and never updated or deleted by this crate.

use super::ids::{AuditId, StudyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terminal state recorded for an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditDecision {
    Allowed,
    Denied,
}

impl AuditDecision {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "ALLOWED",
            Self::Denied => "DENIED",
        }
    }
}

impl From<bool> for AuditDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allowed
        } else {
            Self::Denied
        }
    }
}

impl fmt::Display for AuditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOWED" => Ok(Self::Allowed),
            "DENIED" => Ok(Self::Denied),
            other => Err(format!("Unknown audit decision: {other}")),
        }
    }
}

/// Granularity at which a field was released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    RowLevel,
    Aggregate,
}

impl AccessType {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RowLevel => "ROW_LEVEL",
            Self::Aggregate => "AGGREGATE",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROW_LEVEL" => Ok(Self::RowLevel),
            "AGGREGATE" => Ok(Self::Aggregate),
            other => Err(format!("Unknown access type: {other}")),
        }
    }
}

/// One evaluated request (`audit_log` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    pub request_id: String,
    pub user_id: UserId,
    pub tool_name: String,
    pub timestamp: DateTime<Utc>,
    /// Serialized `DataRequested`
    pub data_requested: serde_json::Value,
    pub decision: AuditDecision,
    pub reason: String,
    /// Serialized `Modifications`, `null` when none
    pub modifications: serde_json::Value,
    pub execution_time_ms: u64,
    pub study_id: Option<StudyId>,
}

/// One (table, field) pair touched by a request (`field_access_log` row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAccessRecord {
    pub audit_id: AuditId,
    pub table_name: String,
    pub field_name: String,
    pub access_type: AccessType,
    pub phi_flag: bool,
    pub timestamp: DateTime<Utc>,
}

/// Committed ledger rows inside a closed time range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditWindow {
    pub records: Vec<AuditRecord>,
    pub field_accesses: Vec<FieldAccessRecord>,
}
