//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with env-filter driven levels
//! - JSON file logging with rotation
//! - A separate `clinguard::forensic` target for diagnostic snapshots
//!
//! # Example
//!
//! ```no_run
//! use clinguard::logging::init_logging;
//! use clinguard::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Guard started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Target used for best-effort forensic snapshots
pub const FORENSIC_TARGET: &str = "clinguard::forensic";

/// Log a terminal compliance decision
///
/// # Example
///
/// ```no_run
/// use clinguard::log_decision;
///
/// log_decision!("audit_123", "dr.chen", "query_vitals", false, "no active Data Use Agreement", 4u64);
/// ```
#[macro_export]
macro_rules! log_decision {
    ($audit_id:expr, $user_id:expr, $tool_name:expr, $allowed:expr, $reason:expr, $elapsed_ms:expr) => {
        tracing::info!(
            audit_id = %$audit_id,
            user_id = %$user_id,
            tool_name = %$tool_name,
            allowed = $allowed,
            reason = %$reason,
            execution_time_ms = $elapsed_ms,
            "Compliance decision"
        );
    };
}

/// Log an error with context
///
/// Extra structured fields may follow the context.
///
/// # Example
///
/// ```no_run
/// use clinguard::log_error_with_context;
/// use clinguard::domain::GuardError;
///
/// let error = GuardError::Database("connection refused".to_string());
/// log_error_with_context!(&error, "Failed to append audit record");
/// log_error_with_context!(&error, "Agreement store failed", request_id = %"req-1");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr $(, $($fields:tt)+)?) => {
        tracing::error!(
            $($($fields)+,)?
            error = %$error,
            context = $context,
            "{}",
            $context
        );
    };
}
