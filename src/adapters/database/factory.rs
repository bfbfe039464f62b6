//! Storage factory
//!
//! This module provides the factory function that creates the agreement and
//! audit stores based on configuration.

use crate::adapters::database::traits::{AgreementStore, AuditStore};
use crate::adapters::memory::InMemoryStore;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLStore};
use crate::config::schema::{DatabaseTarget, GuardConfig};
use crate::domain::{GuardError, Result};
use std::sync::Arc;

/// Create the agreement and audit stores based on the configuration
///
/// Both handles share one backend instance.
///
/// # Errors
///
/// Returns an error if the backend cannot be created
pub async fn create_stores(
    config: &GuardConfig,
) -> Result<(Arc<dyn AgreementStore>, Arc<dyn AuditStore>)> {
    match config.database_target {
        DatabaseTarget::Memory => {
            tracing::info!("Using in-memory store");
            let store = Arc::new(InMemoryStore::new());
            Ok((
                store.clone() as Arc<dyn AgreementStore>,
                store as Arc<dyn AuditStore>,
            ))
        }
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                GuardError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            let store = Arc::new(PostgreSQLStore::new(client));

            Ok((
                store.clone() as Arc<dyn AgreementStore>,
                store as Arc<dyn AuditStore>,
            ))
        }
    }
}
