//! De-identify command implementation

use super::{load_config_or_default, read_json, write_json};
use crate::compliance::{DeIdentifier, Row};
use crate::config::DeIdentificationLevel;
use anyhow::Context;
use clap::Args;
use serde_json::Value;

/// Arguments for the deidentify command
#[derive(Args, Debug)]
pub struct DeidentifyArgs {
    /// JSON file holding a row object or an array of rows
    #[arg(short, long)]
    pub input: String,

    /// Override the configured level (none, safe-harbor, expert-determination)
    #[arg(long)]
    pub level: Option<DeIdentificationLevel>,

    /// Write rows to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

impl DeidentifyArgs {
    /// Execute the deidentify command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let level = self
            .level
            .unwrap_or(config.compliance.deidentification_level);
        let deidentifier = DeIdentifier::new(level)
            .with_additional_identifiers(config.compliance.additional_identifiers.clone());

        let document = read_json(&self.input)?;
        let single = document.is_object();
        let rows: Vec<Row> = match document {
            Value::Array(_) => serde_json::from_value(document),
            other => serde_json::from_value(other).map(|row| vec![row]),
        }
        .with_context(|| format!("Expected a JSON object or array of objects in {}", self.input))?;

        tracing::info!(rows = rows.len(), level = %level, "De-identifying rows");
        let rows = deidentifier.de_identify(rows);

        match rows.as_slice() {
            [row] if single => write_json(row, self.output.as_deref())?,
            _ => write_json(&rows, self.output.as_deref())?,
        }

        Ok(0)
    }
}
