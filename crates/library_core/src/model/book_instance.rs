//! Physical book copies and their circulation status.
//!
//! # Invariants
//! - `OnUser` always has `to_user` and `moved_to_user_date`, never
//!   `moved_to_owner_date`.
//! - `OnOwner` always has `moved_to_owner_date` and no user fields.
//! - `JustAdded` has no dates and no user.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::checker::{check_positive_id, ValidationError};
use super::{EntityId, StoredRecord};

/// Where a physical copy currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookInstanceState {
    JustAdded,
    OnOwner,
    OnUser,
}

impl BookInstanceState {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::JustAdded => "JUST_ADDED",
            Self::OnOwner => "ON_OWNER",
            Self::OnUser => "ON_USER",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "JUST_ADDED" => Some(Self::JustAdded),
            "ON_OWNER" => Some(Self::OnOwner),
            "ON_USER" => Some(Self::OnUser),
            _ => None,
        }
    }
}

/// Circulation status of one physical copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookInstanceStatus {
    #[serde(flatten)]
    stored: StoredRecord,
    state: BookInstanceState,
    moved_to_user_date: Option<NaiveDate>,
    to_user: Option<EntityId>,
    moved_to_owner_date: Option<NaiveDate>,
}

impl BookInstanceStatus {
    pub const REGION: &'static str = "book_instance_status";

    /// Status of a freshly registered copy.
    pub(crate) fn new(creator: EntityId) -> Result<Self, ValidationError> {
        Ok(Self {
            stored: StoredRecord::new(creator)?,
            state: BookInstanceState::JustAdded,
            moved_to_user_date: None,
            to_user: None,
            moved_to_owner_date: None,
        })
    }

    pub(crate) fn restore(
        stored: StoredRecord,
        state: BookInstanceState,
        moved_to_user_date: Option<NaiveDate>,
        to_user: Option<EntityId>,
        moved_to_owner_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            stored,
            state,
            moved_to_user_date,
            to_user,
            moved_to_owner_date,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.stored.id()
    }

    pub fn creator(&self) -> EntityId {
        self.stored.creator()
    }

    pub fn created_at(&self) -> i64 {
        self.stored.created_at()
    }

    pub fn state(&self) -> BookInstanceState {
        self.state
    }

    pub fn moved_to_user_date(&self) -> Option<NaiveDate> {
        self.moved_to_user_date
    }

    pub fn to_user(&self) -> Option<EntityId> {
        self.to_user
    }

    pub fn moved_to_owner_date(&self) -> Option<NaiveDate> {
        self.moved_to_owner_date
    }

    /// Hands the copy to `user` today.
    pub fn move_to_user(&mut self, user: EntityId) -> &mut Self {
        self.move_to_user_on(user, today())
    }

    pub fn move_to_user_on(&mut self, user: EntityId, date: NaiveDate) -> &mut Self {
        self.state = BookInstanceState::OnUser;
        self.moved_to_user_date = Some(date);
        self.to_user = Some(user);
        self.moved_to_owner_date = None;
        self
    }

    /// Returns the copy to its owner today.
    pub fn move_to_owner(&mut self) -> &mut Self {
        self.move_to_owner_on(today())
    }

    pub fn move_to_owner_on(&mut self, date: NaiveDate) -> &mut Self {
        self.state = BookInstanceState::OnOwner;
        self.moved_to_user_date = None;
        self.to_user = None;
        self.moved_to_owner_date = Some(date);
        self
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.stored.assign_id(id);
    }
}

/// A physical copy of a book definition, owned by its creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookInstance {
    #[serde(flatten)]
    stored: StoredRecord,
    book_definition_id: EntityId,
    status: BookInstanceStatus,
}

impl BookInstance {
    pub fn new(book_definition_id: EntityId, owner: EntityId) -> Result<Self, ValidationError> {
        Ok(Self {
            stored: StoredRecord::new(owner)?,
            book_definition_id: check_positive_id("book_definition_id", book_definition_id)?,
            status: BookInstanceStatus::new(owner)?,
        })
    }

    pub(crate) fn restore(
        stored: StoredRecord,
        book_definition_id: EntityId,
        status: BookInstanceStatus,
    ) -> Self {
        Self {
            stored,
            book_definition_id,
            status,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.stored.id()
    }

    /// The owner is whoever registered the copy.
    pub fn owner(&self) -> EntityId {
        self.stored.creator()
    }

    pub fn created_at(&self) -> i64 {
        self.stored.created_at()
    }

    pub fn book_definition_id(&self) -> EntityId {
        self.book_definition_id
    }

    pub fn status(&self) -> &BookInstanceStatus {
        &self.status
    }

    pub fn move_to_user(&mut self, user: EntityId) -> &mut BookInstanceStatus {
        self.status.move_to_user(user)
    }

    pub fn move_to_owner(&mut self) -> &mut BookInstanceStatus {
        self.status.move_to_owner()
    }

    pub(crate) fn status_mut(&mut self) -> &mut BookInstanceStatus {
        &mut self.status
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.stored.assign_id(id);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
