//! Repository layer over the catalog tables.
//!
//! # Responsibility
//! - Define per-entity data access contracts.
//! - Keep SQL text and row decoding out of service orchestration.
//!
//! # Invariants
//! - Every statement runs through a `Session`, so it is counted.
//! - Entities are validated on construction and again when decoded.
//! - Versioned writes fail with `OptimisticLock` instead of overwriting.

pub mod author_repo;
pub mod book_repo;
pub mod error;
pub mod instance_repo;
pub mod publisher_repo;
mod rows;
pub mod session;

pub use author_repo::{AuthorRepository, SqliteAuthorRepository};
pub use book_repo::{BookDefinitionRepository, SqliteBookDefinitionRepository};
pub use error::{RepoError, RepoResult};
pub use instance_repo::{BookInstanceRepository, SqliteBookInstanceRepository};
pub use publisher_repo::{PublisherRepository, SqlitePublisherRepository};
pub use session::Session;
