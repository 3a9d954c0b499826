#![forbid(unsafe_code)]
//! SQLite-backed persistence for `nestedset-core`.
//! The tree lives in a single table of a bundled SQLite database, either file-backed or
//! in memory for tests and prototyping.

mod config;
mod storage;

pub use config::SqliteConfig;
pub use storage::SqliteStore;
