//! Book definition entity: the bibliographic record shared by physical copies.
//!
//! # Invariants
//! - Every setter re-validates its field and marks the entity dirty on change.
//! - `authors` is only populated by `BookDefinitionRepository`.

use std::fmt::{Display, Formatter};

use chrono::{Datelike, Utc};
use serde::Serialize;

use super::author::Author;
use super::checker::{
    check_isbn, check_page_count, check_positive_id, check_release_year, check_string_length,
    ValidationError, COVER_TYPE_MAX_LENGTH, MIN_STRING_LENGTH,
};
use super::{display_named, EntityId, Lazy, NamedEntity, NamedRecord};

/// Language a book definition is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookLanguage {
    Russian,
    English,
    German,
    French,
    Spanish,
    Chinese,
    Other,
}

impl BookLanguage {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Russian => "RUSSIAN",
            Self::English => "ENGLISH",
            Self::German => "GERMAN",
            Self::French => "FRENCH",
            Self::Spanish => "SPANISH",
            Self::Chinese => "CHINESE",
            Self::Other => "OTHER",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "RUSSIAN" => Some(Self::Russian),
            "ENGLISH" => Some(Self::English),
            "GERMAN" => Some(Self::German),
            "FRENCH" => Some(Self::French),
            "SPANISH" => Some(Self::Spanish),
            "CHINESE" => Some(Self::Chinese),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Bibliographic description of a title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookDefinition {
    #[serde(flatten)]
    record: NamedRecord,
    release_year: i32,
    cover_type: String,
    isbn: String,
    page_count: i32,
    language: BookLanguage,
    publisher_id: Option<EntityId>,
    authors: Lazy<Author>,
}

impl BookDefinition {
    pub const REGION: &'static str = "book_definition";

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        creator: EntityId,
        release_year: i32,
        cover_type: impl Into<String>,
        isbn: impl Into<String>,
        page_count: i32,
        language: BookLanguage,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            record: NamedRecord::new(name, description, creator)?,
            release_year: check_release_year(release_year, current_year())?,
            cover_type: check_cover_type(cover_type)?,
            isbn: check_isbn(isbn)?,
            page_count: check_page_count(page_count)?,
            language,
            publisher_id: None,
            authors: Lazy::NotLoaded,
        })
    }

    /// Rebuilds a persisted definition, re-validating every column.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        record: NamedRecord,
        release_year: i32,
        cover_type: String,
        isbn: String,
        page_count: i32,
        language: BookLanguage,
        publisher_id: Option<EntityId>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            record,
            release_year: check_release_year(release_year, current_year())?,
            cover_type: check_cover_type(cover_type)?,
            isbn: check_isbn(isbn)?,
            page_count: check_page_count(page_count)?,
            language,
            publisher_id: publisher_id
                .map(|id| check_positive_id("publisher_id", id))
                .transpose()?,
            authors: Lazy::NotLoaded,
        })
    }

    pub fn release_year(&self) -> i32 {
        self.release_year
    }

    pub fn cover_type(&self) -> &str {
        &self.cover_type
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn page_count(&self) -> i32 {
        self.page_count
    }

    pub fn language(&self) -> BookLanguage {
        self.language
    }

    pub fn publisher_id(&self) -> Option<EntityId> {
        self.publisher_id
    }

    /// Credited authors, or `None` until loaded.
    pub fn authors(&self) -> Option<&[Author]> {
        self.authors.get()
    }

    pub fn set_release_year(&mut self, release_year: i32) -> Result<(), ValidationError> {
        let release_year = check_release_year(release_year, current_year())?;
        if release_year != self.release_year {
            self.release_year = release_year;
            self.record.mark_dirty();
        }
        Ok(())
    }

    pub fn set_cover_type(&mut self, cover_type: impl Into<String>) -> Result<(), ValidationError> {
        let cover_type = check_cover_type(cover_type)?;
        if cover_type != self.cover_type {
            self.cover_type = cover_type;
            self.record.mark_dirty();
        }
        Ok(())
    }

    pub fn set_isbn(&mut self, isbn: impl Into<String>) -> Result<(), ValidationError> {
        let isbn = check_isbn(isbn)?;
        if isbn != self.isbn {
            self.isbn = isbn;
            self.record.mark_dirty();
        }
        Ok(())
    }

    pub fn set_page_count(&mut self, page_count: i32) -> Result<(), ValidationError> {
        let page_count = check_page_count(page_count)?;
        if page_count != self.page_count {
            self.page_count = page_count;
            self.record.mark_dirty();
        }
        Ok(())
    }

    pub fn set_language(&mut self, language: BookLanguage) {
        if language != self.language {
            self.language = language;
            self.record.mark_dirty();
        }
    }

    pub fn set_publisher_id(&mut self, publisher_id: Option<EntityId>) -> Result<(), ValidationError> {
        let publisher_id = publisher_id
            .map(|id| check_positive_id("publisher_id", id))
            .transpose()?;
        if publisher_id != self.publisher_id {
            self.publisher_id = publisher_id;
            self.record.mark_dirty();
        }
        Ok(())
    }

    pub(crate) fn authors_mut(&mut self) -> &mut Lazy<Author> {
        &mut self.authors
    }

    pub(crate) fn without_associations(&self) -> Self {
        let mut copy = self.clone();
        copy.authors = Lazy::NotLoaded;
        copy
    }
}

impl NamedEntity for BookDefinition {
    const KIND: &'static str = "BookDefinition";

    fn record(&self) -> &NamedRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut NamedRecord {
        &mut self.record
    }
}

impl Display for BookDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        display_named(self, f)
    }
}

fn check_cover_type(cover_type: impl Into<String>) -> Result<String, ValidationError> {
    check_string_length(
        "cover_type",
        cover_type,
        MIN_STRING_LENGTH,
        COVER_TYPE_MAX_LENGTH,
    )
}

fn current_year() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BookDefinition {
        BookDefinition::new(
            "BOOK_NAME",
            Some("BOOK_DESCRIPTION".to_string()),
            10,
            2020,
            "paperback",
            "978-5-4461-0512-0",
            1000,
            BookLanguage::Russian,
        )
        .unwrap()
    }

    #[test]
    fn new_definition_starts_clean_with_version_zero() {
        let bd = sample();
        assert_eq!(bd.id(), None);
        assert_eq!(bd.version(), 0);
        assert!(!bd.is_dirty());
        assert!(bd.authors().is_none());
    }

    #[test]
    fn setters_validate_and_track_changes() {
        let mut bd = sample();
        assert!(bd.set_page_count(0).is_err());
        assert_eq!(bd.page_count(), 1000);
        assert!(!bd.is_dirty());

        bd.set_page_count(100).unwrap();
        assert!(bd.is_dirty());
    }

    #[test]
    fn unchanged_value_keeps_entity_clean() {
        let mut bd = sample();
        bd.set_language(BookLanguage::Russian);
        bd.set_cover_type("paperback").unwrap();
        assert!(!bd.is_dirty());
    }

    #[test]
    fn constructor_rejects_bad_isbn() {
        let result = BookDefinition::new(
            "x",
            None,
            10,
            2020,
            "hardcover",
            "not-an-isbn",
            10,
            BookLanguage::English,
        );
        assert!(matches!(result, Err(ValidationError::Isbn(_))));
    }

    #[test]
    fn language_db_strings_are_stable() {
        for language in [
            BookLanguage::Russian,
            BookLanguage::English,
            BookLanguage::Chinese,
            BookLanguage::Other,
        ] {
            assert_eq!(BookLanguage::from_db_str(language.as_db_str()), Some(language));
        }
        assert_eq!(BookLanguage::from_db_str("russian"), None);
    }
}
