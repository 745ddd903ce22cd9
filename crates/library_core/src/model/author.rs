//! Author entity.
//!
//! # Invariants
//! - `book_definitions` is only populated by `AuthorRepository`.
//! - Cached copies never carry a loaded `book_definitions` collection.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use super::book_definition::BookDefinition;
use super::checker::ValidationError;
use super::{display_named, EntityId, Lazy, NamedEntity, NamedRecord};

/// A person credited on one or more book definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    #[serde(flatten)]
    record: NamedRecord,
    book_definitions: Lazy<BookDefinition>,
}

impl Author {
    /// Second-level cache region for authors.
    pub const REGION: &'static str = "author";
    /// Fetch graph that loads every association in one query.
    pub const GRAPH_FETCH_ALL: &'static str = "Author.FETCH_ALL";

    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        creator: EntityId,
    ) -> Result<Self, ValidationError> {
        Ok(Self::from_record(NamedRecord::new(name, description, creator)?))
    }

    pub(crate) fn from_record(record: NamedRecord) -> Self {
        Self {
            record,
            book_definitions: Lazy::NotLoaded,
        }
    }

    /// Books credited to this author, or `None` until loaded.
    pub fn book_definitions(&self) -> Option<&[BookDefinition]> {
        self.book_definitions.get()
    }

    pub(crate) fn book_definitions_mut(&mut self) -> &mut Lazy<BookDefinition> {
        &mut self.book_definitions
    }

    pub(crate) fn without_associations(&self) -> Self {
        Self {
            record: self.record.clone(),
            book_definitions: self.book_definitions.unloaded(),
        }
    }
}

impl NamedEntity for Author {
    const KIND: &'static str = "Author";

    fn record(&self) -> &NamedRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut NamedRecord {
        &mut self.record
    }
}

impl Display for Author {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        display_named(self, f)
    }
}
