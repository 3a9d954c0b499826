#![forbid(unsafe_code)]
//! Postgres-backed persistence for `nestedset-core`.
//!
//! All tree semantics stay in `nestedset-core`; this crate only renders the repository
//! primitives as SQL against a vanilla PostgreSQL table, so it works on Aurora Postgres,
//! Supabase or self-hosted servers alike.

mod config;
mod schema;
mod store;

pub use config::{IsolationLevel, PgConfig};
pub use schema::{drop_table_for_tests, ensure_schema};
pub use store::PgStore;
