//! CLI command implementations
//!
//! This module contains all CLI command implementations. Commands return a
//! process exit code: 0 success, 1 request denied, 2 configuration error,
//! 4 connection error, 5 fatal error.

pub mod deidentify;
pub mod evaluate;
pub mod init;
pub mod migrate;
pub mod noise;
pub mod report;
pub mod validate;

use crate::config::{load_config, GuardConfig};
use anyhow::Context;
use std::path::Path;

/// Load configuration, printing the failure for the user
///
/// Returns the configuration-error exit code on failure.
pub(crate) fn load_config_or_exit(config_path: &str) -> Result<GuardConfig, i32> {
    load_config(config_path).map_err(|e| {
        println!("❌ Failed to load configuration file");
        println!("   Error: {e}");
        2
    })
}

/// Like [`load_config_or_exit`], but a missing file falls back to defaults
///
/// Used by the pure transforms, which need no storage backend.
pub(crate) fn load_config_or_default(config_path: &str) -> Result<GuardConfig, i32> {
    if Path::new(config_path).exists() {
        load_config_or_exit(config_path)
    } else {
        tracing::debug!(config_path = %config_path, "No configuration file, using defaults");
        Ok(GuardConfig::default())
    }
}

/// Read and parse a JSON document
pub(crate) fn read_json(path: &str) -> anyhow::Result<serde_json::Value> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {path}"))
}

/// Write JSON to a file, or to stdout when no path is given
pub(crate) fn write_json(value: &impl serde::Serialize, output: Option<&str>) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("Failed to write {path}"))?
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
