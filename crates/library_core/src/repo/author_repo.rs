//! Author repository over `author` and the `book_author` link table.

use log::info;
use once_cell::sync::Lazy;
use rusqlite::params;

use super::error::{RepoError, RepoResult};
use super::rows;
use super::session::Session;
use crate::model::author::Author;
use crate::model::book_definition::BookDefinition;
use crate::model::{EntityId, NamedEntity};

const ENTITY: &str = "author";

static FIND_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM author a WHERE a.id = ?1;",
        rows::named_columns("a", "")
    )
});

static FIND_ALL_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM author a ORDER BY a.id ASC;",
        rows::named_columns("a", "")
    )
});

static FIND_BOOKS_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {}
         FROM book_definition b
         INNER JOIN book_author ba ON ba.book_definition_id = b.id
         WHERE ba.author_id = ?1
         ORDER BY b.id ASC;",
        rows::book_columns("b", "")
    )
});

static FETCH_ALL_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {}, {}
         FROM author a
         LEFT JOIN book_author ba ON ba.author_id = a.id
         LEFT JOIN book_definition b ON b.id = ba.book_definition_id
         WHERE a.id = ?1
         ORDER BY b.id ASC;",
        rows::named_columns("a", "a_"),
        rows::book_columns("b", "b_")
    )
});

/// Repository interface for authors.
pub trait AuthorRepository {
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<Author>>;
    /// Loads one author with every credited book (`Author::GRAPH_FETCH_ALL`).
    fn fetch_by_id(&self, id: EntityId) -> RepoResult<Option<Author>>;
    fn find_all(&self) -> RepoResult<Vec<Author>>;
    fn load_book_definitions<'a>(&self, author: &'a mut Author)
        -> RepoResult<&'a [BookDefinition]>;
    fn create(&self, author: &mut Author) -> RepoResult<EntityId>;
    fn update(&self, author: &mut Author) -> RepoResult<bool>;
    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool>;

    fn save(&self, author: &mut Author) -> RepoResult<EntityId> {
        match author.id() {
            None => self.create(author),
            Some(id) => {
                self.update(author)?;
                Ok(id)
            }
        }
    }
}

/// SQLite-backed author repository.
pub struct SqliteAuthorRepository<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> SqliteAuthorRepository<'s, 'conn> {
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn cache_loaded(&self, author: &Author) {
        if let Some(id) = author.id() {
            self.session
                .cache_put(self.session.cache().authors(), id, author.without_associations());
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

impl AuthorRepository for SqliteAuthorRepository<'_, '_> {
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<Author>> {
        if let Some(cached) = self.session.cache().authors().get(id) {
            return Ok(Some(cached));
        }

        let found = self
            .session
            .query_optional(FIND_BY_ID_SQL.as_str(), [id], |row| rows::author(row, ""))?;
        if let Some(author) = found.as_ref() {
            self.cache_loaded(author);
        }
        Ok(found)
    }

    fn fetch_by_id(&self, id: EntityId) -> RepoResult<Option<Author>> {
        let mut author: Option<Author> = None;
        let mut books = Vec::new();

        self.session
            .for_each_row(FETCH_ALL_BY_ID_SQL.as_str(), [id], |row| {
                if author.is_none() {
                    author = Some(rows::author(row, "a_")?);
                }
                if rows::optional_id(row, "b_")?.is_some() {
                    books.push(rows::book_definition(row, "b_")?);
                }
                Ok(())
            })?;

        let Some(mut author) = author else {
            return Ok(None);
        };
        self.cache_loaded(&author);
        self.cache_books(&books);
        author.book_definitions_mut().set(books);
        Ok(Some(author))
    }

    fn find_all(&self) -> RepoResult<Vec<Author>> {
        let authors = self
            .session
            .query_list(FIND_ALL_SQL.as_str(), [], |row| rows::author(row, ""))?;
        for author in &authors {
            self.cache_loaded(author);
        }
        Ok(authors)
    }

    fn load_book_definitions<'a>(
        &self,
        author: &'a mut Author,
    ) -> RepoResult<&'a [BookDefinition]> {
        if !author.book_definitions_mut().is_loaded() {
            let books = match author.id() {
                Some(id) => self
                    .session
                    .query_list(FIND_BOOKS_SQL.as_str(), [id], |row| {
                        rows::book_definition(row, "")
                    })?,
                None => Vec::new(),
            };
            self.cache_books(&books);
            author.book_definitions_mut().set(books);
        }
        Ok(author.book_definitions().unwrap_or_default())
    }

    fn create(&self, author: &mut Author) -> RepoResult<EntityId> {
        if let Some(id) = author.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }

        self.session.execute(
            "INSERT INTO author (creator, created_at, name, description, version)
             VALUES (?1, ?2, ?3, ?4, 0);",
            params![
                author.creator(),
                author.created_at(),
                author.name(),
                author.description(),
            ],
        )?;

        let id = self.session.last_insert_id();
        author.record_mut().mark_inserted(id);
        info!("event=entity_create module=repo status=ok entity={ENTITY} id={id}");
        Ok(id)
    }

    fn update(&self, author: &mut Author) -> RepoResult<bool> {
        let id = author.id().ok_or(RepoError::Transient { entity: ENTITY })?;
        if !author.is_dirty() {
            return Ok(false);
        }

        let version = author.version();
        let changed = self.session.execute(
            "UPDATE author
             SET name = ?3, description = ?4, version = ?5
             WHERE id = ?1
               AND version = ?2;",
            params![
                id,
                version,
                author.name(),
                author.description(),
                version.wrapping_add(1),
            ],
        )?;
        self.session.cache_evict(self.session.cache().authors(), id);

        if changed == 0 {
            return Err(RepoError::OptimisticLock {
                entity: ENTITY,
                id,
                version,
            });
        }

        author.record_mut().mark_updated();
        info!(
            "event=entity_update module=repo status=ok entity={ENTITY} id={id} version={}",
            author.version()
        );
        Ok(true)
    }

    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool> {
        let changed = self
            .session
            .execute("DELETE FROM author WHERE id = ?1;", [id])?;
        self.session.cache_evict(self.session.cache().authors(), id);
        Ok(changed > 0)
    }
}
