//! Storage integrations for Clinguard.
//!
//! This module provides adapters for the persistence the guard relies on:
//!
//! - [`database`] - Storage abstraction layer (trait-based) and factory
//! - [`memory`] - Process-local store for tests and dry runs
//! - [`postgresql`] - PostgreSQL implementation
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The compliance core only
//! sees `Arc<dyn AgreementStore>` and `Arc<dyn AuditStore>`.
//!
//! ```rust,no_run
//! use clinguard::adapters::database::create_stores;
//! use clinguard::config::GuardConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GuardConfig::default();
//! let (agreements, audit) = create_stores(&config).await?;
//! audit.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
