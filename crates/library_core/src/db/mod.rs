//! SQLite storage bootstrap, schema migrations and statement statistics.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the catalog.
//! - Apply schema migrations in deterministic order.
//! - Count executed SQL statements per kind for repository assertions.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Catalog data must not be read or written before migrations succeed.

use thiserror::Error;

pub mod fixtures;
pub mod migrations;
mod open;
mod statistics;

pub use fixtures::load_demo_catalog;
pub use open::{open_db, open_db_in_memory, open_db_with};
pub use statistics::{SqlCounts, SqlStatistics, StatementKind};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("migration {version} failed its post-check: {reason}")]
    MigrationCheck { version: u32, reason: String },
}
