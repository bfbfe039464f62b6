//! Storage abstraction traits
//!
//! This module defines the traits that storage adapters must implement
//! to back the compliance guard.

use crate::domain::{AgreementRecord, AuditRecord, AuditWindow, FieldAccessRecord, Result};
use crate::domain::{StudyId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;

/// Read-only access to persisted Data Use Agreements
///
/// Agreements are written by an external administrative process. Stores only
/// return raw candidate rows; validity, window and scope checks happen in
/// [`crate::compliance::agreement`].
#[async_trait]
pub trait AgreementStore: Send + Sync {
    /// Downcast to Any for backend-specific operations
    fn as_any(&self) -> &dyn Any;

    /// Fetch every agreement row stored for a (study, user) pair
    ///
    /// Rows are returned whether or not they are active or in their window.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    async fn find_agreements(
        &self,
        study_id: &StudyId,
        user_id: &UserId,
    ) -> Result<Vec<AgreementRecord>>;
}

/// Append-only audit ledger storage
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Downcast to Any for backend-specific operations
    fn as_any(&self) -> &dyn Any;

    /// Test the storage connection
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn test_connection(&self) -> Result<()>;

    /// Append one audit record together with its field access rows
    ///
    /// The write is atomic: either every row is committed or none is. Once
    /// this returns `Ok`, the rows are visible to [`AuditStore::fetch_window`].
    ///
    /// # Errors
    ///
    /// Returns an error if the rows could not be durably committed.
    async fn append(&self, record: &AuditRecord, field_accesses: &[FieldAccessRecord])
        -> Result<()>;

    /// Read committed rows whose timestamp lies in `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn fetch_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<AuditWindow>;
}
