//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through a compliance
//! evaluation. Each type keeps user, study, and audit identifiers from being
//! mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix carried by every generated audit identifier
const AUDIT_ID_PREFIX: &str = "audit_";

/// Audit record identifier
///
/// Generated once per evaluation from a CSPRNG-backed UUID v4, so identifiers
/// are collision-resistant and carry no ordering.
///
/// # Examples
///
/// ```
/// use clinguard::domain::ids::AuditId;
///
/// let a = AuditId::generate();
/// let b = AuditId::generate();
/// assert_ne!(a, b);
/// assert!(a.as_str().starts_with("audit_"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct AuditId(String);

impl AuditId {
    /// Generates a fresh random audit identifier
    pub fn generate() -> Self {
        Self(format!("{AUDIT_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Wraps an existing identifier (e.g. one read back from storage)
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Audit ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the audit ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AuditId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AuditId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for AuditId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// User identifier newtype wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("User ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the user ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Study identifier newtype wrapper
///
/// Requests carrying a study ID are subject to Data Use Agreement checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct StudyId(String);

impl StudyId {
    /// Creates a new StudyId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Study ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the study ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StudyId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for StudyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
