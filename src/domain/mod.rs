//! Domain models and types for Clinguard.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`AuditId`], [`UserId`], [`StudyId`])
//! - **Request and decision models** ([`DataAccessRequest`], [`ComplianceDecision`])
//! - **Agreement and ledger rows** ([`DataUseAgreement`], [`AuditRecord`], [`FieldAccessRecord`])
//! - **Error types** ([`GuardError`], [`ComplianceError`])
//! - **Result type alias** ([`Result`])
//!
//! # Builder Pattern
//!
//! ```rust
//! use clinguard::domain::DataAccessRequest;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = DataAccessRequest::builder()
//!     .user_id("dr.chen")
//!     .tool_name("query_vitals")
//!     .study_id("sepsis-2024")
//!     .tables(["vitals"])
//!     .fields(["heart_rate"])
//!     .row_level(true)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod agreement;
pub mod audit;
pub mod decision;
pub mod errors;
pub mod ids;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use agreement::{AccessScope, AgreementRecord, DataUseAgreement};
pub use audit::{AccessType, AuditDecision, AuditRecord, AuditWindow, FieldAccessRecord};
pub use decision::{ComplianceDecision, Modifications};
pub use errors::{ComplianceError, GuardError};
pub use ids::{AuditId, StudyId, UserId};
pub use request::{DataAccessRequest, DataAccessRequestBuilder, DataRequested};
pub use result::Result;
