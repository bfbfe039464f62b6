//! Evaluate command implementation
//!
//! Reads one request (a JSON object) or a batch (a JSON array), evaluates it
//! and prints the decisions as JSON on stdout.

use super::{load_config_or_exit, read_json, write_json};
use crate::adapters::database::create_stores;
use crate::adapters::memory::InMemoryStore;
use crate::compliance::ComplianceService;
use crate::domain::{AgreementRecord, DataAccessRequest};
use anyhow::Context;
use clap::Args;
use serde_json::{json, Value};

/// Arguments for the evaluate command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// JSON file holding a request object or an array of requests
    #[arg(short, long)]
    pub request: String,

    /// JSON array of agreement records to seed the in-memory store with
    #[arg(long)]
    pub agreements: Option<String>,

    /// Write decisions to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

impl EvaluateArgs {
    /// Execute the evaluate command
    ///
    /// Exit code 1 when any request is denied.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_exit(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let requests = parse_requests(read_json(&self.request)?)
            .with_context(|| format!("Invalid request document {}", self.request))?;
        tracing::info!(count = requests.len(), "Evaluating data access requests");

        let (agreements, audit) = match create_stores(&config).await {
            Ok(stores) => stores,
            Err(e) => {
                println!("❌ Failed to connect to the audit store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        if let Some(ref path) = self.agreements {
            let Some(store) = agreements.as_any().downcast_ref::<InMemoryStore>() else {
                println!("❌ --agreements is only supported with database_target = 'memory'");
                return Ok(2);
            };
            let records: Vec<AgreementRecord> = serde_json::from_value(read_json(path)?)
                .with_context(|| format!("Invalid agreement records in {path}"))?;
            for record in records {
                store.insert_agreement(record).await;
            }
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let service = ComplianceService::new(config.compliance.clone(), agreements, audit)
            .with_failure_channel(tx);

        let decisions = service.evaluate_batch(&requests).await;
        drop(service);

        while let Some(failure) = rx.recv().await {
            eprintln!(
                "❌ Audit failure for request {} ({}): {}",
                failure.request_id, failure.audit_id, failure.error
            );
        }

        let output: Vec<Value> = requests
            .iter()
            .zip(&decisions)
            .map(|(request, decision)| {
                json!({
                    "requestId": request.request_id(),
                    "decision": decision,
                })
            })
            .collect();
        write_json(&output, self.output.as_deref())?;

        let denied = decisions.iter().filter(|d| !d.is_allowed()).count();
        tracing::info!(
            total = decisions.len(),
            denied = denied,
            "Evaluation complete"
        );

        Ok(if denied > 0 { 1 } else { 0 })
    }
}

/// Accepts either a single request object or an array of them
fn parse_requests(document: Value) -> serde_json::Result<Vec<DataAccessRequest>> {
    match document {
        Value::Array(_) => serde_json::from_value(document),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}
