//! Persistent storage for campaigns and stage results.
//!
//! PostgreSQL-backed persistence keyed by campaign id. The in-memory
//! [`crate::pipeline::PipelineContext`] is a per-run value; rows here are
//! the durable source of truth, and a context can be reconstructed from
//! them at any time ([`Database::load_context`]) to resume the
//! hooks/scripts continuation after a process restart.

pub mod database;
pub mod migrations;
pub mod schema;

pub use database::{Database, DatabaseError};
pub use migrations::{MigrationError, MigrationRunner};
