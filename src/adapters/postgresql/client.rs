//! PostgreSQL client implementation
//!
//! This module provides the pooled client used by the PostgreSQL store.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{GuardError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// Schema applied by [`PostgreSQLClient::run_migrations`]
pub const INITIAL_SCHEMA: &str = include_str!("../../../migrations/001_initial_schema.sql");

/// PostgreSQL client for Clinguard
///
/// Wraps a deadpool connection pool and applies the configured statement
/// timeout to every checked-out connection.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Configuration
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool
    /// cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                GuardError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| GuardError::Database(format!("Failed to create connection pool: {e}")))?;

        tracing::debug!(
            location = %config.connection_string.expose_secret().redacted_location(),
            max_connections = config.max_connections,
            "PostgreSQL pool created"
        );

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| GuardError::Database(format!("Connection test failed: {e}")))?;

        tracing::info!("PostgreSQL connection test successful");
        Ok(())
    }

    /// Apply the schema (idempotent)
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn run_migrations(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .batch_execute(INITIAL_SCHEMA)
            .await
            .map_err(|e| GuardError::Database(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout applied
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.pool.get().await.map_err(|e| {
            GuardError::Database(format!("Failed to get connection from pool: {e}"))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| GuardError::Database(format!("Failed to set statement timeout: {e}")))?;

        Ok(client)
    }

    /// Execute a query and return rows
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;

        client
            .query(query, params)
            .await
            .map_err(|e| GuardError::Database(format!("Query failed: {e}")))
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        self.config
            .connection_string
            .expose_secret()
            .redacted_location()
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}
