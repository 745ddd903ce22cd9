//! Field limits and validation helpers shared by every catalog entity.
//!
//! # Invariants
//! - Limits here are mirrored by CHECK constraints in `db/migrations`.
//! - String lengths are measured in Unicode scalar values, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::EntityId;

pub const MIN_STRING_LENGTH: usize = 1;
pub const NAME_MAX_LENGTH: usize = 255;
pub const DESCRIPTION_MIN_LENGTH: usize = 3;
pub const LONG_STRING_LENGTH: usize = 2000;
pub const COVER_TYPE_MAX_LENGTH: usize = 30;
pub const ISBN_MIN_LENGTH: usize = 10;
pub const ISBN_MAX_LENGTH: usize = 17;
pub const MIN_RELEASE_YEAR: i32 = 1450;
pub const MAX_PAGE_COUNT: i32 = 100_000;

static ISBN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9][0-9-]*[0-9Xx]$").expect("isbn pattern must compile")
});

/// Validation failure raised by entity constructors and setters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("`{field}` length {actual} is outside {min}..={max}")]
    StringLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("`{field}` must be a positive id, got {value}")]
    NonPositiveId { field: &'static str, value: EntityId },
    #[error("release year {year} is outside {min}..={max}")]
    ReleaseYear { year: i32, min: i32, max: i32 },
    #[error("page count {count} is outside 1..={max}")]
    PageCount { count: i32, max: i32 },
    #[error("invalid isbn `{0}`")]
    Isbn(String),
}

/// Returns `value` unchanged when its char length is within `min..=max`.
pub fn check_string_length(
    field: &'static str,
    value: impl Into<String>,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.into();
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::StringLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(value)
}

pub fn check_positive_id(field: &'static str, value: EntityId) -> Result<EntityId, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositiveId { field, value });
    }
    Ok(value)
}

pub fn check_name(name: impl Into<String>) -> Result<String, ValidationError> {
    check_string_length("name", name, MIN_STRING_LENGTH, NAME_MAX_LENGTH)
}

pub fn check_description(description: Option<String>) -> Result<Option<String>, ValidationError> {
    description
        .map(|value| {
            check_string_length(
                "description",
                value,
                DESCRIPTION_MIN_LENGTH,
                LONG_STRING_LENGTH,
            )
        })
        .transpose()
}

/// Accepts ISBN-10 and ISBN-13 with optional hyphen grouping.
///
/// Checksums are not verified; only shape and digit count.
pub fn check_isbn(isbn: impl Into<String>) -> Result<String, ValidationError> {
    let isbn = check_string_length("isbn", isbn, ISBN_MIN_LENGTH, ISBN_MAX_LENGTH)?;
    if !ISBN_PATTERN.is_match(&isbn) {
        return Err(ValidationError::Isbn(isbn));
    }
    let significant = isbn.chars().filter(|ch| *ch != '-').count();
    if significant != 10 && significant != 13 {
        return Err(ValidationError::Isbn(isbn));
    }
    // `X` is a check character only in ISBN-10.
    if significant == 13 && isbn.ends_with(['X', 'x']) {
        return Err(ValidationError::Isbn(isbn));
    }
    Ok(isbn)
}

pub fn check_release_year(year: i32, current_year: i32) -> Result<i32, ValidationError> {
    let max = current_year + 1;
    if !(MIN_RELEASE_YEAR..=max).contains(&year) {
        return Err(ValidationError::ReleaseYear {
            year,
            min: MIN_RELEASE_YEAR,
            max,
        });
    }
    Ok(year)
}

pub fn check_page_count(count: i32) -> Result<i32, ValidationError> {
    if !(1..=MAX_PAGE_COUNT).contains(&count) {
        return Err(ValidationError::PageCount {
            count,
            max: MAX_PAGE_COUNT,
        });
    }
    Ok(count)
}
