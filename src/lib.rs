// Clinguard - Clinical Data Access Compliance Guard
// Copyright (c) 2025 Clinguard Contributors
// Licensed under the MIT License

//! # Clinguard - Clinical Data Access Compliance Guard
//!
//! Clinguard decides whether an automated tool may read clinical data on
//! behalf of a user, and records every decision in an append-only audit
//! ledger.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Checking** requests against active Data Use Agreements
//! - **Detecting** PHI fields and applying HIPAA policy rules
//! - **De-identifying** result rows (Safe Harbor, expert determination)
//! - **Perturbing** aggregate counts with Laplace noise
//! - **Auditing** every decision and reporting over the ledger
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`compliance`] - Decision pipeline, policy rules, transforms, reporting
//! - [`adapters`] - Agreement and audit stores (in-memory, PostgreSQL)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clinguard::compliance::ComplianceService;
//! use clinguard::config::load_config;
//! use clinguard::domain::DataAccessRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("clinguard.toml")?;
//!     let service = ComplianceService::from_config(&config).await?;
//!
//!     let request = DataAccessRequest::builder()
//!         .user_id("dr.chen")
//!         .tool_name("query_vitals")
//!         .study_id("sepsis-2024")
//!         .tables(["vitals"])
//!         .fields(["heart_rate"])
//!         .build()?;
//!
//!     let decision = service.evaluate_request(&request).await;
//!     println!("{} ({})", decision.reason(), decision.audit_id());
//!     Ok(())
//! }
//! ```
//!
//! ## Fail-Closed Evaluation
//!
//! Evaluation never returns an error. Store failures, timeouts and audit
//! write failures all become denials, and a decision is only returned once
//! its audit record has been written.
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`], whose error type is
//! [`domain::GuardError`]. Denial causes are modelled by
//! [`domain::ComplianceError`], whose message is the reason reported to the
//! caller.

pub mod adapters;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod domain;
pub mod logging;
