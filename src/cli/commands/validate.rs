//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Clinguard configuration file.

use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config also runs validation, so a successful load is a valid file
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        let compliance = &config.compliance;
        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  HIPAA Compliant: {}", compliance.hipaa_compliant);
        println!("  Row-Level Data: {}", compliance.allow_row_level_data);
        println!("  De-identification: {}", compliance.deidentification_level);
        println!("  Audit Level: {}", compliance.audit_level);
        println!("  Minimum Cell Size: {}", compliance.minimum_cell_size);
        println!("  Default Epsilon: {}", compliance.default_epsilon);
        println!("  Data Retention: {} days", compliance.data_retention_days);
        println!("  Evaluation Timeout: {} ms", compliance.evaluation_timeout_ms);
        if !compliance.additional_identifiers.is_empty() {
            println!(
                "  Additional Identifiers: {:?}",
                compliance.additional_identifiers
            );
        }

        match config.database_target {
            DatabaseTarget::Memory => {
                println!("  Database Target: memory (nothing is persisted)");
            }
            DatabaseTarget::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    use secrecy::ExposeSecret;
                    println!("  Database Target: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        pg_config.connection_string.expose_secret().redacted_location()
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }

        if config.logging.local_enabled {
            println!(
                "  Log Files: {} ({})",
                config.logging.local_path, config.logging.local_rotation
            );
        }
        println!();
        Ok(0)
    }
}
