//! # Database Module
//!
//! PostgreSQL persistence for generated trade analyses using tokio-postgres
//! and deadpool. Includes connection management, models, migrations and the
//! [`AnalysisStore`] query interface.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod store;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use models::*;
pub use store::AnalysisStore;
