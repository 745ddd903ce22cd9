//! Catalog use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI decoupled from SQL and cache details.

pub mod catalog_service;

pub use catalog_service::{CatalogService, NewBook};
