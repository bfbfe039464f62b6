//! Domain error types
//!
//! This module defines the error hierarchy for Clinguard.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Clinguard error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Compliance evaluation errors
    #[error("Compliance error: {0}")]
    Compliance(#[from] ComplianceError),

    /// Database-related errors (generic)
    #[error("Database error: {0}")]
    Database(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Compliance outcome taxonomy
///
/// Everything except [`ComplianceError::AuditWriteFailure`] is an ordinary
/// policy outcome and surfaces as a denied decision with an audit record.
/// `MalformedAgreementData` is recovered locally by treating the agreement
/// as absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComplianceError {
    /// No active, in-window DUA for the (study, user) pair
    #[error("no active Data Use Agreement")]
    NoActiveAgreement,

    /// Requested tables outside the DUA scope
    #[error("unauthorized tables: {}", .0.join(", "))]
    UnauthorizedTable(Vec<String>),

    /// Requested fields outside the DUA scope
    #[error("unauthorized fields: {}", .0.join(", "))]
    UnauthorizedField(Vec<String>),

    /// PHI requested while de-identification is disabled
    #[error("PHI fields requested but de-identification disabled")]
    PhiWithoutDeidentificationPolicy,

    /// Agreement lookup or audit write exceeded the configured bound
    #[error("policy evaluation timeout")]
    EvaluationTimeout,

    /// The audit ledger could not durably record a decision
    #[error("audit write failed: {0}")]
    AuditWriteFailure(String),

    /// A stored agreement could not be parsed
    #[error("malformed agreement data: {0}")]
    MalformedAgreementData(String),
}

impl ComplianceError {
    /// Human-readable reason placed in a denied decision
    pub fn denial_reason(&self) -> String {
        match self {
            Self::NoActiveAgreement | Self::MalformedAgreementData(_) => {
                "no active Data Use Agreement".to_string()
            }
            Self::UnauthorizedTable(tables) => format!(
                "Data Use Agreement does not authorize tables: {}",
                tables.join(", ")
            ),
            Self::UnauthorizedField(fields) => format!(
                "Data Use Agreement does not authorize fields: {}",
                fields.join(", ")
            ),
            Self::PhiWithoutDeidentificationPolicy => {
                "PHI fields requested but de-identification disabled".to_string()
            }
            Self::EvaluationTimeout => "policy evaluation timeout".to_string(),
            Self::AuditWriteFailure(_) => "audit logging unavailable".to_string(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for GuardError {
    fn from(err: toml::de::Error) -> Self {
        GuardError::Configuration(format!("TOML parse error: {err}"))
    }
}
