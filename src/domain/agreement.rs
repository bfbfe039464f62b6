//! Data Use Agreement model
//!
//! Agreements are created by an external administrative process and are
//! read-only here. The stored form ([`AgreementRecord`]) keeps the scope
//! columns as raw JSON; [`AgreementRecord::parse`] turns it into a typed
//! [`DataUseAgreement`] or reports it as malformed.

use super::errors::ComplianceError;
use super::ids::{StudyId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Scope entry granting every table or field
pub const WILDCARD: &str = "*";

/// Set of tables or fields an agreement authorizes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessScope(BTreeSet<String>);

impl AccessScope {
    /// Scope that authorizes everything
    pub fn wildcard() -> Self {
        Self(BTreeSet::from([WILDCARD.to_string()]))
    }

    /// Whether the scope contains the wildcard entry
    pub fn allows_all(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    /// Requested entries not covered by this scope, in sorted order
    pub fn uncovered<'a, I>(&self, requested: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        if self.allows_all() {
            return Vec::new();
        }
        requested
            .into_iter()
            .filter(|entry| !self.0.contains(entry.as_str()))
            .cloned()
            .collect()
    }

    /// Parses a stored scope column
    ///
    /// Accepts a JSON array of strings, or a string holding one (TEXT columns).
    fn from_stored(value: &Value, column: &str) -> Result<Self, ComplianceError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ComplianceError::MalformedAgreementData(format!(
                            "{column} contains a non-string entry: {item}"
                        ))
                    })
                })
                .collect::<Result<BTreeSet<_>, _>>()
                .map(Self),
            Value::String(text) => {
                let inner: Value = serde_json::from_str(text).map_err(|e| {
                    ComplianceError::MalformedAgreementData(format!(
                        "{column} is not valid JSON: {e}"
                    ))
                })?;
                if inner.is_string() {
                    return Err(ComplianceError::MalformedAgreementData(format!(
                        "{column} is a nested string"
                    )));
                }
                Self::from_stored(&inner, column)
            }
            other => Err(ComplianceError::MalformedAgreementData(format!(
                "{column} must be a JSON array, got {other}"
            ))),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for AccessScope {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A validated, time-bounded study authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUseAgreement {
    /// Agreement identifier
    pub dua_id: String,
    /// Study covered by the agreement
    pub study_id: StudyId,
    /// User covered by the agreement
    pub user_id: UserId,
    /// Tables the user may read
    pub allowed_tables: AccessScope,
    /// Fields the user may read
    pub allowed_fields: AccessScope,
    /// Opaque restrictions recorded with the agreement
    pub restrictions: Value,
    /// First valid day (inclusive)
    pub start_date: NaiveDate,
    /// Last valid day (inclusive)
    pub end_date: NaiveDate,
    /// Administrative active flag
    pub active: bool,
}

impl DataUseAgreement {
    /// Whether the agreement is active and `day` lies within `[start_date, end_date]`
    pub fn is_in_effect_on(&self, day: NaiveDate) -> bool {
        self.active && self.start_date <= day && day <= self.end_date
    }
}

/// Stored form of a Data Use Agreement (`data_use_agreements` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementRecord {
    pub dua_id: String,
    pub study_id: String,
    pub user_id: String,
    pub allowed_tables: Value,
    /// `null` leaves fields unrestricted
    #[serde(default)]
    pub allowed_fields: Value,
    #[serde(default)]
    pub restrictions: Value,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
}

impl AgreementRecord {
    /// Parses the stored row into a typed agreement
    ///
    /// # Errors
    ///
    /// Returns [`ComplianceError::MalformedAgreementData`] when identifiers are
    /// empty or a scope column cannot be parsed.
    pub fn parse(&self) -> Result<DataUseAgreement, ComplianceError> {
        let allowed_fields = if self.allowed_fields.is_null() {
            AccessScope::wildcard()
        } else {
            AccessScope::from_stored(&self.allowed_fields, "allowed_fields")?
        };

        Ok(DataUseAgreement {
            dua_id: self.dua_id.clone(),
            study_id: StudyId::new(self.study_id.clone())
                .map_err(ComplianceError::MalformedAgreementData)?,
            user_id: UserId::new(self.user_id.clone())
                .map_err(ComplianceError::MalformedAgreementData)?,
            allowed_tables: AccessScope::from_stored(&self.allowed_tables, "allowed_tables")?,
            allowed_fields,
            restrictions: self.restrictions.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            active: self.active,
        })
    }
}

impl From<&DataUseAgreement> for AgreementRecord {
    fn from(agreement: &DataUseAgreement) -> Self {
        Self {
            dua_id: agreement.dua_id.clone(),
            study_id: agreement.study_id.to_string(),
            user_id: agreement.user_id.to_string(),
            allowed_tables: serde_json::json!(agreement.allowed_tables),
            allowed_fields: serde_json::json!(agreement.allowed_fields),
            restrictions: agreement.restrictions.clone(),
            start_date: agreement.start_date,
            end_date: agreement.end_date,
            active: agreement.active,
        }
    }
}
