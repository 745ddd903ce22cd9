//! Publisher entity.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use super::book_definition::BookDefinition;
use super::checker::ValidationError;
use super::{display_named, EntityId, Lazy, NamedEntity, NamedRecord};

/// Publishing house referenced by book definitions.
///
/// The `book_definitions` side is read-only here; ownership of the link lives
/// on `BookDefinition::publisher_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Publisher {
    #[serde(flatten)]
    record: NamedRecord,
    book_definitions: Lazy<BookDefinition>,
}

impl Publisher {
    pub const REGION: &'static str = "publisher";
    pub const GRAPH_FETCH_ALL: &'static str = "Publisher.FETCH_ALL";

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

impl NamedEntity for Publisher {
    const KIND: &'static str = "Publisher";

    fn record(&self) -> &NamedRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut NamedRecord {
        &mut self.record
    }
}

impl Display for Publisher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        display_named(self, f)
    }
}
