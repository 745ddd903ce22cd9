//! Physical copy repository; a copy and its status are written together.
//!
//! # Invariants
//! - `create` inserts the status and the instance in one transaction.
//! - Instance reads always join the status (eager one-to-one).
//! - Status writes evict the `book_instance_status` cache entry.

use log::info;
use once_cell::sync::Lazy;
use rusqlite::params;

use super::error::{RepoError, RepoResult};
use super::rows;
use super::session::Session;
use crate::model::book_instance::{BookInstance, BookInstanceStatus};
use crate::model::EntityId;

const ENTITY: &str = "book_instance";
const STATUS_ENTITY: &str = "book_instance_status";

static FIND_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {}, {}
         FROM book_instance i
         INNER JOIN book_instance_status s ON s.id = i.status_id
         WHERE i.id = ?1;",
        rows::instance_columns("i", ""),
        rows::status_columns("s", "s_")
    )
});

static FIND_BY_DEFINITION_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {}, {}
         FROM book_instance i
         INNER JOIN book_instance_status s ON s.id = i.status_id
         WHERE i.book_definition_id = ?1
         ORDER BY i.id ASC;",
        rows::instance_columns("i", ""),
        rows::status_columns("s", "s_")
    )
});

static FIND_STATUS_BY_ID_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "SELECT {} FROM book_instance_status s WHERE s.id = ?1;",
        rows::status_columns("s", "")
    )
});

/// Repository interface for physical copies.
pub trait BookInstanceRepository {
    fn create(&self, instance: &mut BookInstance) -> RepoResult<EntityId>;
    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<BookInstance>>;
    fn find_by_definition(&self, book_definition_id: EntityId) -> RepoResult<Vec<BookInstance>>;
    fn find_status_by_id(&self, status_id: EntityId) -> RepoResult<Option<BookInstanceStatus>>;
    /// Persists the current circulation state of `status`.
    fn update_status(&self, status: &BookInstanceStatus) -> RepoResult<()>;
    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool>;
}

/// SQLite-backed physical copy repository.
pub struct SqliteBookInstanceRepository<'s, 'conn> {
    session: &'s Session<'conn>,
}

impl<'s, 'conn> SqliteBookInstanceRepository<'s, 'conn> {
    pub fn new(session: &'s Session<'conn>) -> Self {
        Self { session }
    }

    fn cache_status(&self, status: &BookInstanceStatus) {
        if let Some(id) = status.id() {
            self.session
                .cache_put(self.session.cache().instance_statuses(), id, status.clone());
        }
    }
}

impl BookInstanceRepository for SqliteBookInstanceRepository<'_, '_> {
    fn create(&self, instance: &mut BookInstance) -> RepoResult<EntityId> {
        if let Some(id) = instance.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }

        let (status_id, instance_id) = self.session.with_transaction(|session| {
            let status = instance.status();
            session.execute(
                "INSERT INTO book_instance_status (
                    creator,
                    created_at,
                    state,
                    moved_to_user_date,
                    to_user,
                    moved_to_owner_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    status.creator(),
                    status.created_at(),
                    status.state().as_db_str(),
                    status.moved_to_user_date(),
                    status.to_user(),
                    status.moved_to_owner_date(),
                ],
            )?;
            let status_id = session.last_insert_id();

            session.execute(
                "INSERT INTO book_instance (creator, created_at, book_definition_id, status_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    instance.owner(),
                    instance.created_at(),
                    instance.book_definition_id(),
                    status_id,
                ],
            )?;
            Ok((status_id, session.last_insert_id()))
        })?;

        instance.status_mut().assign_id(status_id);
        instance.assign_id(instance_id);
        info!(
            "event=entity_create module=repo status=ok entity={ENTITY} id={instance_id} status_id={status_id}"
        );
        Ok(instance_id)
    }

    fn find_by_id(&self, id: EntityId) -> RepoResult<Option<BookInstance>> {
        let found = self
            .session
            .query_optional(FIND_BY_ID_SQL.as_str(), [id], |row| {
                rows::book_instance(row, "", "s_")
            })?;
        if let Some(instance) = found.as_ref() {
            self.cache_status(instance.status());
        }
        Ok(found)
    }

    fn find_by_definition(&self, book_definition_id: EntityId) -> RepoResult<Vec<BookInstance>> {
        let instances = self
            .session
            .query_list(FIND_BY_DEFINITION_SQL.as_str(), [book_definition_id], |row| {
                rows::book_instance(row, "", "s_")
            })?;
        for instance in &instances {
            self.cache_status(instance.status());
        }
        Ok(instances)
    }

    fn find_status_by_id(&self, status_id: EntityId) -> RepoResult<Option<BookInstanceStatus>> {
        if let Some(cached) = self.session.cache().instance_statuses().get(status_id) {
            return Ok(Some(cached));
        }

        let found = self
            .session
            .query_optional(FIND_STATUS_BY_ID_SQL.as_str(), [status_id], |row| {
                rows::instance_status(row, "")
            })?;
        if let Some(status) = found.as_ref() {
            self.cache_status(status);
        }
        Ok(found)
    }

    fn update_status(&self, status: &BookInstanceStatus) -> RepoResult<()> {
        let id = status.id().ok_or(RepoError::Transient {
            entity: STATUS_ENTITY,
        })?;

        let changed = self.session.execute(
            "UPDATE book_instance_status
             SET
                state = ?2,
                moved_to_user_date = ?3,
                to_user = ?4,
                moved_to_owner_date = ?5
             WHERE id = ?1;",
            params![
                id,
                status.state().as_db_str(),
                status.moved_to_user_date(),
                status.to_user(),
                status.moved_to_owner_date(),
            ],
        )?;
        self.session.cache_evict(self.session.cache().instance_statuses(), id);

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: STATUS_ENTITY,
                id,
            });
        }

        info!(
            "event=status_update module=repo status=ok entity={STATUS_ENTITY} id={id} state={}",
            status.state().as_db_str()
        );
        Ok(())
    }

    fn delete_by_id(&self, id: EntityId) -> RepoResult<bool> {
        let status_id = self.session.with_transaction(|session| {
            let status_id: Option<EntityId> = session.query_optional(
                "SELECT status_id FROM book_instance WHERE id = ?1;",
                [id],
                |row| Ok(row.get(0)?),
            )?;
            let Some(status_id) = status_id else {
                return Ok(None);
            };
            session.execute("DELETE FROM book_instance WHERE id = ?1;", [id])?;
            session.execute(
                "DELETE FROM book_instance_status WHERE id = ?1;",
                [status_id],
            )?;
            Ok(Some(status_id))
        })?;

        match status_id {
            Some(status_id) => {
                self.session.cache_evict(self.session.cache().instance_statuses(), status_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
