//! Publisher repository with lazy and fetch-graph loading of book definitions.
//!
//! # Invariants
//! - `find_by_id` never loads `book_definitions`.
//! - `fetch_by_id` (`Publisher::GRAPH_FETCH_ALL`) loads the publisher and all
//!   of its book definitions with exactly one SELECT.

use log::info;
use once_cell::sync::Lazy;
use rusqlite::params;

use super::book_repo::FIND_BY_PUBLISHER_SQL;
use super::error::{RepoError, RepoResult};
use super::rows;
use super::session::Session;
use crate::model::book_definition::BookDefinition;
use crate::model::publisher::Publisher;
use crate::model::{EntityId, NamedEntity};

const ENTITY: &str = "publisher";

static FIND_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM publisher p WHERE p.id = ?1;",
        rows::named_columns("p", "")
    )
});

static FIND_ALL_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM publisher p ORDER BY p.id ASC;",
        rows::named_columns("p", "")
    )
});

static FETCH_ALL_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {}, {}
         FROM publisher p
         LEFT JOIN book_definition b ON b.publisher_id = p.id
         WHERE p.id = ?1
         ORDER BY b.id ASC;",
        rows::named_columns("p", "p_"),
        rows::book_columns("b", "b_")
    )
});

/// Repository interface for publishers.
pub trait PublisherRepository {
    /// Loads one publisher; `book_definitions` stays unloaded.
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<Publisher>>;
    /// Loads one publisher with every book definition in a single query.
    fn fetch_by_id(&self, id: EntityId) -> RepoResult<Option<Publisher>>;
    fn find_all(&self) -> RepoResult<Vec<Publisher>>;
    fn load_book_definitions<'p>(
        &self,
        publisher: &'p mut Publisher,
    ) -> RepoResult<&'p [BookDefinition]>;
    fn create(&self, publisher: &mut Publisher) -> RepoResult<EntityId>;
    fn update(&self, publisher: &mut Publisher) -> RepoResult<bool>;
    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool>;

    fn save(&self, publisher: &mut Publisher) -> RepoResult<EntityId> {
        match publisher.id() {
            None => self.create(publisher),
            Some(id) => {
                self.update(publisher)?;
                Ok(id)
            }
        }
    }
}

/// SQLite-backed publisher repository.
pub struct SqlitePublisherRepository<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> SqlitePublisherRepository<'s, 'conn> {
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn cache_loaded(&self, publisher: &Publisher) {
        if let Some(id) = publisher.id() {
            self.session
                .cache_put(self.session.cache().publishers(), id, publisher.without_associations());
        }
    }

    fn cache_books(&self, books: &[BookDefinition]) {
        let region = self.session.cache().book_definitions();
        for book in books {
            if let Some(id) = book.id() {
                self.session
                    .cache_put(region, id, book.without_associations());
            }
        }
    }
}

impl PublisherRepository for SqlitePublisherRepository<'_, '_> {
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<Publisher>> {
        if let Some(cached) = self.session.cache().publishers().get(id) {
            return Ok(Some(cached));
        }

        let found = self
            .session
            .query_optional(FIND_BY_ID_SQL.as_str(), [id], |row| rows::publisher(row, ""))?;
        if let Some(publisher) = found.as_ref() {
            self.cache_loaded(publisher);
        }
        Ok(found)
    }

    fn fetch_by_id(&self, id: EntityId) -> RepoResult<Option<Publisher>> {
        let mut publisher: Option<Publisher> = None;
        let mut books = Vec::new();

        self.session
            .for_each_row(FETCH_ALL_BY_ID_SQL.as_str(), [id], |row| {
                if publisher.is_none() {
                    publisher = Some(rows::publisher(row, "p_")?);
                }
                if rows::optional_id(row, "b_")?.is_some() {
                    books.push(rows::book_definition(row, "b_")?);
                }
                Ok(())
            })?;

        let Some(mut publisher) = publisher else {
            return Ok(None);
        };
        self.cache_loaded(&publisher);
        self.cache_books(&books);
        publisher.book_definitions_mut().set(books);
        Ok(Some(publisher))
    }

    fn find_all(&self) -> RepoResult<Vec<Publisher>> {
        let publishers = self
            .session
            .query_list(FIND_ALL_SQL.as_str(), [], |row| rows::publisher(row, ""))?;
        for publisher in &publishers {
            self.cache_loaded(publisher);
        }
        Ok(publishers)
    }

    fn load_book_definitions<'p>(
        &self,
        publisher: &'p mut Publisher,
    ) -> RepoResult<&'p [BookDefinition]> {
        if !publisher.book_definitions_mut().is_loaded() {
            let books = match publisher.id() {
                Some(id) => self
                    .session
                    .query_list(FIND_BY_PUBLISHER_SQL.as_str(), [id], |row| {
                        rows::book_definition(row, "")
                    })?,
                None => Vec::new(),
            };
            self.cache_books(&books);
            publisher.book_definitions_mut().set(books);
        }
        Ok(publisher.book_definitions().unwrap_or_default())
    }

    fn create(&self, publisher: &mut Publisher) -> RepoResult<EntityId> {
        if let Some(id) = publisher.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }

        self.session.execute(
            "INSERT INTO publisher (creator, created_at, name, description, version)
             VALUES (?1, ?2, ?3, ?4, 0);",
            params![
                publisher.creator(),
                publisher.created_at(),
                publisher.name(),
                publisher.description(),
            ],
        )?;

        let id = self.session.last_insert_id();
        publisher.record_mut().mark_inserted(id);
        info!("event=entity_create module=repo status=ok entity={ENTITY} id={id}");
        Ok(id)
    }

    fn update(&self, publisher: &mut Publisher) -> RepoResult<bool> {
        let id = publisher.id().ok_or(RepoError::Transient { entity: ENTITY })?;
        if !publisher.is_dirty() {
            return Ok(false);
        }

        let version = publisher.version();
        let changed = self.session.execute(
            "UPDATE publisher
             SET name = ?3, description = ?4, version = ?5
             WHERE id = ?1
               AND version = ?2;",
            params![
                id,
                version,
                publisher.name(),
                publisher.description(),
                version.wrapping_add(1),
            ],
        )?;
        self.session.cache_evict(self.session.cache().publishers(), id);

        if changed == 0 {
            return Err(RepoError::OptimisticLock {
                entity: ENTITY,
                id,
                version,
            });
        }

        publisher.record_mut().mark_updated();
        info!(
            "event=entity_update module=repo status=ok entity={ENTITY} id={id} version={}",
            publisher.version()
        );
        Ok(true)
    }

    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool> {
        let changed = self
            .session
            .execute("DELETE FROM publisher WHERE id = ?1;", [id])?;
        self.session.cache_evict(self.session.cache().publishers(), id);
        if changed > 0 {
            // ON DELETE SET NULL rewrote publisher_id on an unknown set of books.
            self.session
                .cache_evict_all(self.session.cache().book_definitions());
        }
        Ok(changed > 0)
    }
}
