//! Data access request model
//!
//! A [`DataAccessRequest`] is handed to the guard by the tool-dispatch layer
//! before any data read happens. It is immutable once constructed: fields are
//! private and only exposed through accessors.

use super::ids::{StudyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tables, fields, and granularity a request wants to read
///
/// Sets are ordered so every serialization of a request (audit payloads,
/// `limit_fields`) is reproducible.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequested {
    /// Tables touched by the request
    #[serde(default)]
    pub tables: BTreeSet<String>,

    /// Fields touched by the request
    #[serde(default)]
    pub fields: BTreeSet<String>,

    /// Opaque filter expression supplied by the caller
    #[serde(default)]
    pub filters: serde_json::Map<String, serde_json::Value>,

    /// Whether individual rows (rather than aggregates) are requested
    #[serde(default)]
    pub row_level: bool,
}

/// Structured request for clinical data
///
/// # Examples
///
/// ```
/// use clinguard::domain::request::DataAccessRequest;
///
/// let request = DataAccessRequest::builder()
///     .user_id("dr.chen")
///     .tool_name("query_vitals")
///     .purpose("sepsis cohort feasibility")
///     .tables(["vitals"])
///     .fields(["heart_rate", "age"])
///     .build()
///     .unwrap();
///
/// assert!(request.study_id().is_none());
/// assert!(!request.data_requested().row_level);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAccessRequest {
    user_id: UserId,
    tool_name: String,
    request_id: String,
    timestamp: DateTime<Utc>,
    purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    study_id: Option<StudyId>,
    data_requested: DataRequested,
}

impl DataAccessRequest {
    /// Creates a new builder for constructing a DataAccessRequest
    pub fn builder() -> DataAccessRequestBuilder {
        DataAccessRequestBuilder::default()
    }

    /// Requesting user
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Tool that issued the request
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Caller-assigned request identifier
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the request was issued
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Stated purpose of use
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Study the request is scoped to, if any
    pub fn study_id(&self) -> Option<&StudyId> {
        self.study_id.as_ref()
    }

    /// Requested tables, fields, and granularity
    pub fn data_requested(&self) -> &DataRequested {
        &self.data_requested
    }

    /// Every (table, field) pair touched by the request, in sorted order
    pub fn table_field_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data_requested.tables.iter().flat_map(move |table| {
            self.data_requested
                .fields
                .iter()
                .map(move |field| (table.as_str(), field.as_str()))
        })
    }
}

/// Builder for constructing DataAccessRequest instances
#[derive(Debug, Default)]
pub struct DataAccessRequestBuilder {
    user_id: Option<String>,
    tool_name: Option<String>,
    request_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    purpose: Option<String>,
    study_id: Option<String>,
    data_requested: DataRequested,
}

impl DataAccessRequestBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the requesting user
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the issuing tool
    pub fn tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    /// Sets the request ID (a random one is generated otherwise)
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the request timestamp (defaults to now)
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the purpose of use
    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    /// Scopes the request to a study
    pub fn study_id(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    /// Sets the requested tables
    pub fn tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_requested.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the requested fields
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_requested.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the opaque filter map
    pub fn filters(mut self, filters: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data_requested.filters = filters;
        self
    }

    /// Requests row-level data instead of aggregates
    pub fn row_level(mut self, row_level: bool) -> Self {
        self.data_requested.row_level = row_level;
        self
    }

    /// Builds the DataAccessRequest
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or an identifier is empty
    pub fn build(self) -> Result<DataAccessRequest, String> {
        let study_id = self.study_id.map(StudyId::new).transpose()?;
        Ok(DataAccessRequest {
            user_id: UserId::new(self.user_id.ok_or("user_id is required")?)?,
            tool_name: self.tool_name.ok_or("tool_name is required")?,
            request_id: self
                .request_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            purpose: self.purpose.unwrap_or_default(),
            study_id,
            data_requested: self.data_requested,
        })
    }
}
