//! Column lists and row decoders shared by the repositories.
//!
//! Join fetches select several entities in one row, so every column list
//! takes a table alias and a result-column prefix (`b_name`, `a_id`, ...).

use chrono::NaiveDate;
use rusqlite::types::FromSql;
use rusqlite::Row;

use super::error::{RepoError, RepoResult};
use crate::model::author::Author;
use crate::model::book_definition::{BookDefinition, BookLanguage};
use crate::model::book_instance::{BookInstance, BookInstanceState, BookInstanceStatus};
use crate::model::publisher::Publisher;
use crate::model::{EntityId, NamedRecord, StoredRecord};

const STORED_COLUMNS: &[&str] = &["id", "creator", "created_at"];
const NAMED_COLUMNS: &[&str] = &["name", "description", "version"];
const BOOK_COLUMNS: &[&str] = &[
    "release_year",
    "cover_type",
    "isbn",
    "page_count",
    "language",
    "publisher_id",
];
const STATUS_COLUMNS: &[&str] = &["state", "moved_to_user_date", "to_user", "moved_to_owner_date"];
const INSTANCE_COLUMNS: &[&str] = &["book_definition_id"];

fn select_list(alias: &str, prefix: &str, groups: &[&[&str]]) -> String {
    groups
        .iter()
        .flat_map(|group| group.iter())
        .map(|column| format!("{alias}.{column} AS {prefix}{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Columns of `author` or `publisher` rows.
pub(crate) fn named_columns(alias: &str, prefix: &str) -> String {
    select_list(alias, prefix, &[STORED_COLUMNS, NAMED_COLUMNS])
}

pub(crate) fn book_columns(alias: &str, prefix: &str) -> String {
    select_list(alias, prefix, &[STORED_COLUMNS, NAMED_COLUMNS, BOOK_COLUMNS])
}

pub(crate) fn status_columns(alias: &str, prefix: &str) -> String {
    select_list(alias, prefix, &[STORED_COLUMNS, STATUS_COLUMNS])
}

pub(crate) fn instance_columns(alias: &str, prefix: &str) -> String {
    select_list(alias, prefix, &[STORED_COLUMNS, INSTANCE_COLUMNS])
}

fn get<T: FromSql>(row: &Row<'_>, prefix: &str, column: &str) -> RepoResult<T> {
    Ok(row.get::<_, T>(format!("{prefix}{column}").as_str())?)
}

/// Returns `None` when the prefixed `id` column is NULL (outer join miss).
pub(crate) fn optional_id(row: &Row<'_>, prefix: &str) -> RepoResult<Option<EntityId>> {
    get(row, prefix, "id")
}

fn stored_record(row: &Row<'_>, prefix: &str) -> RepoResult<StoredRecord> {
    Ok(StoredRecord::restore(
        get(row, prefix, "id")?,
        get(row, prefix, "creator")?,
        get(row, prefix, "created_at")?,
    )?)
}

fn named_record(row: &Row<'_>, prefix: &str) -> RepoResult<NamedRecord> {
    Ok(NamedRecord::restore(
        stored_record(row, prefix)?,
        get(row, prefix, "name")?,
        get(row, prefix, "description")?,
        get(row, prefix, "version")?,
    )?)
}

pub(crate) fn author(row: &Row<'_>, prefix: &str) -> RepoResult<Author> {
    Ok(Author::from_record(named_record(row, prefix)?))
}

pub(crate) fn publisher(row: &Row<'_>, prefix: &str) -> RepoResult<Publisher> {
    Ok(Publisher::from_record(named_record(row, prefix)?))
}

pub(crate) fn book_definition(row: &Row<'_>, prefix: &str) -> RepoResult<BookDefinition> {
    let language_text: String = get(row, prefix, "language")?;
    let language = BookLanguage::from_db_str(&language_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid language `{language_text}` in book_definition.language"
        ))
    })?;

    Ok(BookDefinition::restore(
        named_record(row, prefix)?,
        get(row, prefix, "release_year")?,
        get(row, prefix, "cover_type")?,
        get(row, prefix, "isbn")?,
        get(row, prefix, "page_count")?,
        language,
        get(row, prefix, "publisher_id")?,
    )?)
}

pub(crate) fn instance_status(row: &Row<'_>, prefix: &str) -> RepoResult<BookInstanceStatus> {
    let state_text: String = get(row, prefix, "state")?;
    let state = BookInstanceState::from_db_str(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid state `{state_text}` in book_instance_status.state"
        ))
    })?;
    let moved_to_user_date: Option<NaiveDate> = get(row, prefix, "moved_to_user_date")?;
    let to_user: Option<EntityId> = get(row, prefix, "to_user")?;
    let moved_to_owner_date: Option<NaiveDate> = get(row, prefix, "moved_to_owner_date")?;

    let consistent = match state {
        BookInstanceState::JustAdded => {
            moved_to_user_date.is_none() && to_user.is_none() && moved_to_owner_date.is_none()
        }
        BookInstanceState::OnUser => {
            moved_to_user_date.is_some() && to_user.is_some() && moved_to_owner_date.is_none()
        }
        BookInstanceState::OnOwner => {
            moved_to_user_date.is_none() && to_user.is_none() && moved_to_owner_date.is_some()
        }
    };
    if !consistent {
        return Err(RepoError::InvalidData(format!(
            "book_instance_status row in state {state_text} has inconsistent user/date columns"
        )));
    }

    Ok(BookInstanceStatus::restore(
        stored_record(row, prefix)?,
        state,
        moved_to_user_date,
        to_user,
        moved_to_owner_date,
    ))
}

/// Decodes an instance row joined with its status (`s_` prefix).
pub(crate) fn book_instance(
    row: &Row<'_>,
    prefix: &str,
    status_prefix: &str,
) -> RepoResult<BookInstance> {
    Ok(BookInstance::restore(
        stored_record(row, prefix)?,
        get(row, prefix, "book_definition_id")?,
        instance_status(row, status_prefix)?,
    ))
}
