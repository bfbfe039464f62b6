//! Migrate command implementation
//!
//! Applies the agreement and audit ledger schema to the configured
//! PostgreSQL database. Safe to run repeatedly.

use super::load_config_or_exit;
use crate::adapters::postgresql::PostgreSQLClient;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_exit(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let pg_config = match (config.database_target, config.postgresql) {
            (DatabaseTarget::PostgreSQL, Some(pg)) => pg,
            _ => {
                println!("❌ migrate requires database_target = 'postgresql'");
                return Ok(2);
            }
        };

        println!("🗄️  Applying Clinguard schema");
        println!();

        let client = match PostgreSQLClient::new(pg_config).await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to create PostgreSQL client");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = client.test_connection().await {
            println!("❌ Cannot reach {}", client.connection_string_safe());
            println!("   Error: {e}");
            return Ok(4);
        }
        println!("✅ Connected to {}", client.connection_string_safe());

        match client.run_migrations().await {
            Ok(()) => {
                println!("✅ Schema is up to date");
                println!();
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Migration failed");
                println!("❌ Migration failed");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_migrate_requires_postgres_target() {
        let config = NamedTempFile::new().unwrap();
        std::fs::write(config.path(), "database_target = \"memory\"\n").unwrap();

        let code = MigrateArgs {}
            .execute(config.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
