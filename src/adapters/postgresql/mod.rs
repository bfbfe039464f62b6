//! PostgreSQL database integration
//!
//! This module provides PostgreSQL storage for Data Use Agreements and the
//! audit ledger. The schema lives in `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLStore;
pub use client::PostgreSQLClient;
