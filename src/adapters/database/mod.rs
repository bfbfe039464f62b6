//! Storage abstraction layer
//!
//! This module provides a trait-based abstraction for agreement lookup and
//! audit persistence, allowing Clinguard to run against different backends
//! (in-memory, PostgreSQL).

pub mod factory;
pub mod traits;

pub use factory::create_stores;
pub use traits::{AgreementStore, AuditStore};
