//! Compliance core
//!
//! - [`agreement`] - Data Use Agreement checks for study-scoped requests
//! - [`policy`] - Safe Harbor, row-level and cell-size rules
//! - [`deidentify`] - Safe Harbor row transform
//! - [`noise`] - Laplace mechanism
//! - [`audit`] - Append-only audit ledger
//! - [`report`] - Aggregate compliance reporting
//! - [`service`] - The orchestrating [`ComplianceService`]
//!
//! # Example
//!
//! ```rust
//! use clinguard::adapters::memory::InMemoryStore;
//! use clinguard::compliance::ComplianceService;
//! use clinguard::config::ComplianceConfig;
//! use clinguard::domain::DataAccessRequest;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let service = ComplianceService::new(ComplianceConfig::default(), store.clone(), store);
//!
//! let request = DataAccessRequest::builder()
//!     .user_id("dr.chen")
//!     .tool_name("query_patients")
//!     .tables(["patients"])
//!     .fields(["name", "age"])
//!     .build()?;
//!
//! let decision = service.evaluate_request(&request).await;
//! assert!(decision.is_allowed());
//! assert_eq!(decision.modifications().unwrap().limit_fields, vec!["age".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod agreement;
pub mod audit;
pub mod deidentify;
pub mod noise;
pub mod phi;
pub mod policy;
pub mod report;
pub mod service;

pub use audit::{AuditEntry, AuditLedger};
pub use deidentify::{DeIdentifier, Row};
pub use noise::PrivacyNoiseInjector;
pub use phi::{detect_phi_fields, is_phi_field};
pub use policy::{PolicyEngine, PolicyEvaluation, PolicyRule};
pub use report::ComplianceReport;
pub use service::{AuditFailure, ComplianceService};
