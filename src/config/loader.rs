//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, GuardConfig};
use crate::config::secret_string;
use crate::domain::errors::GuardError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GuardConfig
/// 4. Applies environment variable overrides (CLINGUARD_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, TOML parsing fails, a
/// referenced environment variable is missing, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use clinguard::config::loader::load_config;
///
/// let config = load_config("clinguard.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GuardConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GuardError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        GuardError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text (same pipeline as [`load_config`], minus file I/O)
pub fn parse_config(contents: &str) -> Result<GuardConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: GuardConfig = toml::from_str(&contents)
        .map_err(|e| GuardError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        GuardError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(GuardError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| GuardError::Configuration(format!("Invalid {name} value: {value}")))
}

/// Applies environment variable overrides using CLINGUARD_* prefix
///
/// Environment variables follow the pattern: CLINGUARD_<SECTION>_<KEY>,
/// e.g. CLINGUARD_COMPLIANCE_AUDIT_LEVEL.
fn apply_env_overrides(config: &mut GuardConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("CLINGUARD_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Compliance overrides
    let compliance = &mut config.compliance;
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_HIPAA_COMPLIANT") {
        compliance.hipaa_compliant = parse_env("CLINGUARD_COMPLIANCE_HIPAA_COMPLIANT", &val)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_ALLOW_ROW_LEVEL_DATA") {
        compliance.allow_row_level_data =
            parse_env("CLINGUARD_COMPLIANCE_ALLOW_ROW_LEVEL_DATA", &val)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_DEIDENTIFICATION_LEVEL") {
        compliance.deidentification_level = val.parse().map_err(GuardError::Configuration)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_AUDIT_LEVEL") {
        compliance.audit_level = val.parse().map_err(GuardError::Configuration)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_DATA_RETENTION_DAYS") {
        compliance.data_retention_days =
            parse_env("CLINGUARD_COMPLIANCE_DATA_RETENTION_DAYS", &val)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_EVALUATION_TIMEOUT_MS") {
        compliance.evaluation_timeout_ms =
            parse_env("CLINGUARD_COMPLIANCE_EVALUATION_TIMEOUT_MS", &val)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_MINIMUM_CELL_SIZE") {
        compliance.minimum_cell_size = parse_env("CLINGUARD_COMPLIANCE_MINIMUM_CELL_SIZE", &val)?;
    }
    if let Ok(val) = std::env::var("CLINGUARD_COMPLIANCE_DEFAULT_EPSILON") {
        compliance.default_epsilon = parse_env("CLINGUARD_COMPLIANCE_DEFAULT_EPSILON", &val)?;
    }

    // Database overrides
    if let Ok(val) = std::env::var("CLINGUARD_DATABASE_TARGET") {
        config.database_target = match val.to_lowercase().as_str() {
            "memory" => DatabaseTarget::Memory,
            "postgresql" => DatabaseTarget::PostgreSQL,
            _ => {
                return Err(GuardError::Configuration(format!(
                    "Invalid CLINGUARD_DATABASE_TARGET: {val}"
                )))
            }
        };
    }
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("CLINGUARD_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("CLINGUARD_POSTGRESQL_MAX_CONNECTIONS") {
            pg_config.max_connections = parse_env("CLINGUARD_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CLINGUARD_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CLINGUARD_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AuditLevel, DeIdentificationLevel};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("CLINGUARD_TEST_DSN_HOST", "db.internal");
        let input = "connection_string = \"postgresql://u:p@${CLINGUARD_TEST_DSN_HOST}/guard\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(
            result,
            "connection_string = \"postgresql://u:p@db.internal/guard\"\n"
        );
        std::env::remove_var("CLINGUARD_TEST_DSN_HOST");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("CLINGUARD_TEST_MISSING_VAR");
        let input = "password = \"${CLINGUARD_TEST_MISSING_VAR}\"";
        assert!(substitute_env_vars(input).is_err());
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("CLINGUARD_TEST_COMMENTED");
        let input = "# password = \"${CLINGUARD_TEST_COMMENTED}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("nonexistent-clinguard.toml").is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
database_target = "memory"

[application]
log_level = "debug"

[compliance]
hipaa_compliant = true
allow_row_level_data = false
deidentification_level = "safe-harbor"
audit_level = "basic"
data_retention_days = 365
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(
            config.compliance.deidentification_level,
            DeIdentificationLevel::SafeHarbor
        );
        assert_eq!(config.compliance.audit_level, AuditLevel::Basic);
        assert_eq!(config.compliance.data_retention_days, 365);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = parse_config(
            r#"
[compliance]
data_retention_days = 0
"#,
        );
        assert!(result.is_err());
    }
}
