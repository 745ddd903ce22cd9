//! Library catalog data-access core.
//! Entities, SQLite persistence, the second-level cache and catalog services.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cache::{RegionStats, SecondLevelCache};
pub use config::{CacheConfig, ConfigError, DatabaseConfig, LibraryConfig, LoggingConfig};
pub use db::{
    load_demo_catalog, open_db, open_db_in_memory, open_db_with, DbError, SqlCounts,
    SqlStatistics,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::author::Author;
pub use model::book_definition::{BookDefinition, BookLanguage};
pub use model::book_instance::{BookInstance, BookInstanceState, BookInstanceStatus};
pub use model::checker::ValidationError;
pub use model::publisher::Publisher;
pub use model::{EntityId, Lazy, NamedEntity};
pub use repo::{
    AuthorRepository, BookDefinitionRepository, BookInstanceRepository, PublisherRepository,
    RepoError, RepoResult, Session, SqliteAuthorRepository, SqliteBookDefinitionRepository,
    SqliteBookInstanceRepository, SqlitePublisherRepository,
};
pub use service::{CatalogService, NewBook};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
