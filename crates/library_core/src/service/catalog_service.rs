//! Catalog use-case service.
//!
//! # Responsibility
//! - Compose repository calls into multi-entity catalog operations.
//! - Run every multi-statement write inside one session transaction.
//!
//! # Invariants
//! - The service never issues SQL itself; repositories do.
//! - A failed step rolls back the whole operation.

use log::info;

use crate::model::author::Author;
use crate::model::book_definition::{BookDefinition, BookLanguage};
use crate::model::book_instance::BookInstance;
use crate::model::publisher::Publisher;
use crate::model::{EntityId, NamedEntity};
use crate::repo::{
    AuthorRepository, BookDefinitionRepository, BookInstanceRepository, PublisherRepository,
    RepoError, RepoResult, Session, SqliteAuthorRepository, SqliteBookDefinitionRepository,
    SqliteBookInstanceRepository, SqlitePublisherRepository,
};

/// Request model for registering a book definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub name: String,
    pub description: Option<String>,
    pub creator: EntityId,
    pub release_year: i32,
    pub cover_type: String,
    pub isbn: String,
    pub page_count: i32,
    pub language: BookLanguage,
    pub publisher_id: Option<EntityId>,
    /// Authors credited on the book. Duplicates are dropped and links are stored in ascending id order.
    pub author_ids: Vec<EntityId>,
}

/// Use-case service over one session.
pub struct CatalogService<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> CatalogService<'s, 'conn> {
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn books(&self) -> SqliteBookDefinitionRepository<'s, 'conn> {
        SqliteBookDefinitionRepository::new(self.session)
    }

    fn publishers(&self) -> SqlitePublisherRepository<'s, 'conn> {
        SqlitePublisherRepository::new(self.session)
    }

    fn authors(&self) -> SqliteAuthorRepository<'s, 'conn> {
        SqliteAuthorRepository::new(self.session)
    }

    fn instances(&self) -> SqliteBookInstanceRepository<'s, 'conn> {
        SqliteBookInstanceRepository::new(self.session)
    }

    /// Validates and persists a book with its publisher and author links.
    ///
    /// # Errors
    /// - `Validation` when any field violates its constraint.
    /// - `NotFound` when the publisher or an author does not exist.
    pub fn register_book(&self, request: &NewBook) -> RepoResult<BookDefinition> {
        let mut book = BookDefinition::new(
            request.name.as_str(),
            request.description.clone(),
            request.creator,
            request.release_year,
            request.cover_type.as_str(),
            request.isbn.as_str(),
            request.page_count,
            request.language,
        )?;
        book.set_publisher_id(request.publisher_id)?;

        let mut author_ids = request.author_ids.clone();
        author_ids.sort_unstable();
        author_ids.dedup();

        self.session.with_transaction(|_| {
            if let Some(publisher_id) = request.publisher_id {
                self.require_publisher(publisher_id)?;
            }
            let mut authors = Vec::with_capacity(author_ids.len());
            for author_id in &author_ids {
                authors.push(self.require_author(*author_id)?);
            }

            let book_id = self.books().create(&mut book)?;
            for author_id in &author_ids {
                self.books().link_author(book_id, *author_id)?;
            }
            book.authors_mut().set(authors);
            Ok(())
        })?;

        info!(
            "event=book_register module=service status=ok id={} authors={}",
            book.id().unwrap_or_default(),
            author_ids.len()
        );
        Ok(book)
    }

    /// Publisher with all of its books, loaded in one query.
    pub fn publisher_catalog(&self, publisher_id: EntityId) -> RepoResult<Publisher> {
        self.publishers()
            .fetch_by_id(publisher_id)?
            .ok_or(RepoError::NotFound {
                entity: "publisher",
                id: publisher_id,
            })
    }

    /// Author with every credited book, loaded in one query.
    pub fn author_bibliography(&self, author_id: EntityId) -> RepoResult<Author> {
        self.authors()
            .fetch_by_id(author_id)?
            .ok_or(RepoError::NotFound {
                entity: "author",
                id: author_id,
            })
    }

    /// Registers a new physical copy of an existing book for `owner`.
    pub fn add_instance(
        &self,
        book_definition_id: EntityId,
        owner: EntityId,
    ) -> RepoResult<BookInstance> {
        let mut instance = BookInstance::new(book_definition_id, owner)?;
        self.session.with_transaction(|_| {
            self.require_book(book_definition_id)?;
            self.instances().create(&mut instance)
        })?;
        Ok(instance)
    }

    /// Hands a copy to `user` today and persists the new status.
    pub fn lend_instance(&self, instance_id: EntityId, user: EntityId) -> RepoResult<BookInstance> {
        self.transition(instance_id, |instance| {
            instance.move_to_user(user);
        })
    }

    /// Returns a copy to its owner today and persists the new status.
    pub fn return_instance(&self, instance_id: EntityId) -> RepoResult<BookInstance> {
        self.transition(instance_id, |instance| {
            instance.move_to_owner();
        })
    }

    /// Renames a book if it is still at `expected_version`.
    ///
    /// # Errors
    /// - `NotFound` when the book does not exist.
    /// - `OptimisticLock` when the book changed since `expected_version`.
    pub fn rename_book(
        &self,
        book_id: EntityId,
        expected_version: i16,
        name: &str,
    ) -> RepoResult<BookDefinition> {
        let mut book = self.require_book(book_id)?;
        if book.version() != expected_version {
            return Err(RepoError::OptimisticLock {
                entity: "book_definition",
                id: book_id,
                version: expected_version,
            });
        }
        book.set_name(name)?;
        self.books().update(&mut book)?;
        Ok(book)
    }

    fn transition(
        &self,
        instance_id: EntityId,
        apply: impl FnOnce(&mut BookInstance),
    ) -> RepoResult<BookInstance> {
        let repo = self.instances();
        let mut instance = repo.find_by_id(instance_id)?.ok_or(RepoError::NotFound {
            entity: "book_instance",
            id: instance_id,
        })?;
        apply(&mut instance);
        repo.update_status(instance.status())?;
        info!(
            "event=instance_transition module=service status=ok id={} state={}",
            instance_id,
            instance.status().state().as_db_str()
        );
        Ok(instance)
    }

    fn require_book(&self, id: EntityId) -> RepoResult<BookDefinition> {
        self.books().find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: "book_definition",
            id,
        })
    }

    fn require_publisher(&self, id: EntityId) -> RepoResult<Publisher> {
        self.publishers().find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: "publisher",
            id,
        })
    }

    fn require_author(&self, id: EntityId) -> RepoResult<Author> {
        self.authors()
            .find_by_id(id)?
            .ok_or(RepoError::NotFound { entity: "author", id })
    }
}
