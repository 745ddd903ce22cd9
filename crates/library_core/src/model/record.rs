//! Shared stored/named state embedded by catalog entities.

use chrono::Utc;
use serde::Serialize;

use super::checker::{check_description, check_name, check_positive_id, ValidationError};
use super::EntityId;

/// Columns every stored row carries: identity, creator and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    id: Option<EntityId>,
    creator: EntityId,
    /// Epoch milliseconds, UTC.
    created_at: i64,
}

impl StoredRecord {
    pub fn new(creator: EntityId) -> Result<Self, ValidationError> {
        Ok(Self {
            id: None,
            creator: check_positive_id("creator", creator)?,
            created_at: Utc::now().timestamp_millis(),
        })
    }

    pub(crate) fn restore(
        id: EntityId,
        creator: EntityId,
        created_at: i64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Some(id),
            creator: check_positive_id("creator", creator)?,
            created_at,
        })
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn creator(&self) -> EntityId {
        self.creator
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

/// Stored record plus validated name/description and optimistic-lock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRecord {
    #[serde(flatten)]
    stored: StoredRecord,
    name: String,
    description: Option<String>,
    version: i16,
    #[serde(skip)]
    dirty: bool,
}

impl NamedRecord {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        creator: EntityId,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            stored: StoredRecord::new(creator)?,
            name: check_name(name)?,
            description: check_description(description)?,
            version: 0,
            dirty: false,
        })
    }

    /// Rebuilds a record from persisted columns, re-validating every field.
    pub(crate) fn restore(
        stored: StoredRecord,
        name: String,
        description: Option<String>,
        version: i16,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            stored,
            name: check_name(name)?,
            description: check_description(description)?,
            version,
            dirty: false,
        })
    }

    pub fn stored(&self) -> &StoredRecord {
        &self.stored
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> i16 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = check_name(name)?;
        if name != self.name {
            self.name = name;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) -> Result<(), ValidationError> {
        let description = check_description(description)?;
        if description != self.description {
            self.description = description;
            self.dirty = true;
        }
        Ok(())
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called after a successful INSERT.
    pub(crate) fn mark_inserted(&mut self, id: EntityId) {
        self.stored.assign_id(id);
        self.version = 0;
        self.dirty = false;
    }

    /// Called after a successful version-guarded UPDATE.
    pub(crate) fn mark_updated(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.dirty = false;
    }
}

/// Lazily loaded association.
///
/// Starts as `NotLoaded`; the owning repository's `load_*` or `fetch_*`
/// methods replace it with the loaded rows. Callers only get a shared slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
pub enum Lazy<T> {
    NotLoaded,
    Loaded(Vec<T>),
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::NotLoaded
    }
}

impl<T> Lazy<T> {
    pub fn get(&self) -> Option<&[T]> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(items) => Some(items.as_slice()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub(crate) fn set(&mut self, items: Vec<T>) {
        *self = Self::Loaded(items);
    }

    /// Drops loaded rows so the value can be cached without its collection.
    pub(crate) fn unloaded(&self) -> Self {
        Self::NotLoaded
    }
}
