//! Book definition repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `book_definition` with version-guarded writes.
//! - Own the `book_author` link table.
//!
//! # Invariants
//! - `find_by_id` consults the `book_definition` cache region first.
//! - Updates and deletes evict the cached row after the statement runs.
//! - A clean entity is never written.

use log::{debug, info};
use once_cell::sync::Lazy;
use rusqlite::params;

use super::error::{RepoError, RepoResult};
use super::rows;
use super::session::Session;
use crate::model::author::Author;
use crate::model::book_definition::BookDefinition;
use crate::model::{EntityId, NamedEntity};

const ENTITY: &str = "book_definition";

static FIND_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM book_definition b WHERE b.id = ?1;",
        rows::book_columns("b", "")
    )
});

static FIND_ALL_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM book_definition b ORDER BY b.id ASC;",
        rows::book_columns("b", "")
    )
});

pub(crate) static FIND_BY_PUBLISHER_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM book_definition b WHERE b.publisher_id = ?1 ORDER BY b.id ASC;",
        rows::book_columns("b", "")
    )
});

static FIND_AUTHORS_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {}
         FROM author a
         INNER JOIN book_author ba ON ba.author_id = a.id
         WHERE ba.book_definition_id = ?1
         ORDER BY a.id ASC;",
        rows::named_columns("a", "")
    )
});

/// Repository interface for book definitions.
pub trait BookDefinitionRepository {
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<BookDefinition>>;
    fn find_all(&self) -> RepoResult<Vec<BookDefinition>>;
    fn find_by_publisher(&self, publisher_id: EntityId) -> RepoResult<Vec<BookDefinition>>;
    fn count(&self) -> RepoResult<u64>;
    /// Inserts a new definition, assigning its id and version 0.
    fn create(&self, book: &mut BookDefinition) -> RepoResult<EntityId>;
    /// Writes a dirty definition; returns `false` when nothing changed.
    fn update(&self, book: &mut BookDefinition) -> RepoResult<bool>;
    fn delete(&self, book: &BookDefinition) -> RepoResult<()>;
    /// Deletes by id; a missing row is not an error.
    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool>;
    /// Loads the lazy `authors` association with one query.
    fn load_authors<'b>(&self, book: &'b mut BookDefinition) -> RepoResult<&'b [Author]>;
    fn link_author(&self, book_id: EntityId, author_id: EntityId) -> RepoResult<()>;
    fn unlink_author(&self, book_id: EntityId, author_id: EntityId) -> RepoResult<bool>;

    /// Creates transient definitions and updates persisted ones.
    fn save(&self, book: &mut BookDefinition) -> RepoResult<EntityId> {
        match book.id() {
            None => self.create(book),
            Some(id) => {
                self.update(book)?;
                Ok(id)
            }
        }
    }
}

/// SQLite-backed book definition repository.
pub struct SqliteBookDefinitionRepository<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> SqliteBookDefinitionRepository<'s, 'conn> {
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn cache_loaded(&self, book: &BookDefinition) {
        if let Some(id) = book.id() {
            self.session
                .cache_put(self.session.cache().book_definitions(), id, book.without_associations());
        }
    }
}

impl BookDefinitionRepository for SqliteBookDefinitionRepository<'_, '_> {
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<BookDefinition>> {
        if let Some(cached) = self.session.cache().book_definitions().get(id) {
            return Ok(Some(cached));
        }

        let found = self
            .session
            .query_optional(FIND_BY_ID_SQL.as_str(), [id], |row| {
                rows::book_definition(row, "")
            })?;
        if let Some(book) = found.as_ref() {
            self.cache_loaded(book);
        }
        Ok(found)
    }

    fn find_all(&self) -> RepoResult<Vec<BookDefinition>> {
        let books = self
            .session
            .query_list(FIND_ALL_SQL.as_str(), [], |row| rows::book_definition(row, ""))?;
        for book in &books {
            self.cache_loaded(book);
        }
        Ok(books)
    }

    fn find_by_publisher(&self, publisher_id: EntityId) -> RepoResult<Vec<BookDefinition>> {
        let books = self
            .session
            .query_list(FIND_BY_PUBLISHER_SQL.as_str(), [publisher_id], |row| {
                rows::book_definition(row, "")
            })?;
        for book in &books {
            self.cache_loaded(book);
        }
        Ok(books)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .session
            .query_scalar("SELECT COUNT(*) FROM book_definition;", [])?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn create(&self, book: &mut BookDefinition) -> RepoResult<EntityId> {
        if let Some(id) = book.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }

        self.session.execute(
            "INSERT INTO book_definition (
                creator,
                created_at,
                name,
                description,
                version,
                release_year,
                cover_type,
                isbn,
                page_count,
                language,
                publisher_id
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                book.creator(),
                book.created_at(),
                book.name(),
                book.description(),
                book.release_year(),
                book.cover_type(),
                book.isbn(),
                book.page_count(),
                book.language().as_db_str(),
                book.publisher_id(),
            ],
        )?;

        let id = self.session.last_insert_id();
        book.record_mut().mark_inserted(id);
        info!("event=entity_create module=repo status=ok entity={ENTITY} id={id}");
        Ok(id)
    }

    fn update(&self, book: &mut BookDefinition) -> RepoResult<bool> {
        let id = book.id().ok_or(RepoError::Transient { entity: ENTITY })?;
        if !book.is_dirty() {
            debug!("event=entity_update module=repo status=skipped entity={ENTITY} id={id}");
            return Ok(false);
        }

        let version = book.version();
        let changed = self.session.execute(
            "UPDATE book_definition
             SET
                name = ?3,
                description = ?4,
                release_year = ?5,
                cover_type = ?6,
                isbn = ?7,
                page_count = ?8,
                language = ?9,
                publisher_id = ?10,
                version = ?11
             WHERE id = ?1
               AND version = ?2;",
            params![
                id,
                version,
                book.name(),
                book.description(),
                book.release_year(),
                book.cover_type(),
                book.isbn(),
                book.page_count(),
                book.language().as_db_str(),
                book.publisher_id(),
                version.wrapping_add(1),
            ],
        )?;
        self.session.cache_evict(self.session.cache().book_definitions(), id);

        if changed == 0 {
            return Err(RepoError::OptimisticLock {
                entity: ENTITY,
                id,
                version,
            });
        }

        book.record_mut().mark_updated();
        info!(
            "event=entity_update module=repo status=ok entity={ENTITY} id={id} version={}",
            book.version()
        );
        Ok(true)
    }

    fn delete(&self, book: &BookDefinition) -> RepoResult<()> {
        let id = book.id().ok_or(RepoError::Transient { entity: ENTITY })?;
        let changed = self.session.execute(
            "DELETE FROM book_definition WHERE id = ?1 AND version = ?2;",
            params![id, book.version()],
        )?;
        self.session.cache_evict(self.session.cache().book_definitions(), id);

        if changed == 0 {
            return Err(RepoError::OptimisticLock {
                entity: ENTITY,
                id,
                version: book.version(),
            });
        }
        info!("event=entity_delete module=repo status=ok entity={ENTITY} id={id}");
        Ok(())
    }

    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool> {
        let changed = self
            .session
            .execute("DELETE FROM book_definition WHERE id = ?1;", [id])?;
        self.session.cache_evict(self.session.cache().book_definitions(), id);
        Ok(changed > 0)
    }

    fn load_authors<'b>(&self, book: &'b mut BookDefinition) -> RepoResult<&'b [Author]> {
        if !book.authors_mut().is_loaded() {
            let authors = match book.id() {
                Some(id) => self
                    .session
                    .query_list(FIND_AUTHORS_SQL.as_str(), [id], |row| rows::author(row, ""))?,
                None => Vec::new(),
            };
            for author in &authors {
                if let Some(author_id) = author.id() {
                    self.session
                        .cache_put(self.session.cache().authors(), author_id, author.clone());
                }
            }
            book.authors_mut().set(authors);
        }
        Ok(book.authors().unwrap_or_default())
    }

    fn link_author(&self, book_id: EntityId, author_id: EntityId) -> RepoResult<()> {
        self.session.execute(
            "INSERT OR IGNORE INTO book_author (book_definition_id, author_id) VALUES (?1, ?2);",
            [book_id, author_id],
        )?;
        Ok(())
    }

    fn unlink_author(&self, book_id: EntityId, author_id: EntityId) -> RepoResult<bool> {
        let changed = self.session.execute(
            "DELETE FROM book_author WHERE book_definition_id = ?1 AND author_id = ?2;",
            [book_id, author_id],
        )?;
        Ok(changed > 0)
    }
}
