//! Catalog domain model.
//!
//! # Responsibility
//! - Define the entities persisted by the repository layer.
//! - Enforce field-level invariants at construction and on every setter.
//!
//! # Invariants
//! - An entity without an id has never been persisted.
//! - Versioned entities start at version 0 and only repositories bump it.
//! - Lazy associations are read-only views; repositories fill them.

pub mod author;
pub mod book_definition;
pub mod book_instance;
pub mod checker;
pub mod publisher;
mod record;

pub use record::{Lazy, NamedRecord, StoredRecord};

/// Primary key shared by every catalog table.
pub type EntityId = i64;

/// Common read access for named, versioned catalog entities.
///
/// Author, Publisher and BookDefinition share the same stored/named/versioned
/// columns; implementors only expose their embedded [`NamedRecord`].
pub trait NamedEntity {
    /// Type name used in `Display` output and log events.
    const KIND: &'static str;

    fn record(&self) -> &NamedRecord;

    fn record_mut(&mut self) -> &mut NamedRecord;

    fn id(&self) -> Option<EntityId> {
        self.record().stored().id()
    }

    fn creator(&self) -> EntityId {
        self.record().stored().creator()
    }

    fn created_at(&self) -> i64 {
        self.record().stored().created_at()
    }

    fn name(&self) -> &str {
        self.record().name()
    }

    fn description(&self) -> Option<&str> {
        self.record().description()
    }

    fn version(&self) -> i16 {
        self.record().version()
    }

    fn is_dirty(&self) -> bool {
        self.record().is_dirty()
    }

    fn set_name(&mut self, name: impl Into<String>) -> Result<(), checker::ValidationError> {
        self.record_mut().set_name(name)
    }

    fn set_description(
        &mut self,
        description: Option<String>,
    ) -> Result<(), checker::ValidationError> {
        self.record_mut().set_description(description)
    }
}

pub(crate) fn display_named<E: NamedEntity>(
    entity: &E,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    match entity.id() {
        Some(id) => write!(f, "{} {{ id={id}, name='{}'}}", E::KIND, entity.name()),
        None => write!(f, "{} {{ id=null, name='{}'}}", E::KIND, entity.name()),
    }
}
