//! Cross-session entity cache with one named LRU region per entity type.
//!
//! # Responsibility
//! - Serve repeated by-id lookups without touching SQLite.
//! - Keep per-region hit/miss/put/eviction counters.
//!
//! # Invariants
//! - Non-strict read/write: repositories populate a region after a load and
//!   evict after an update or delete. Nothing is written through.
//! - Cached values never carry loaded lazy associations.
//! - A disabled cache stores nothing and reports every lookup as a miss.

mod region;

pub use region::{CacheRegion, RegionStats};

use crate::config::CacheConfig;
use crate::model::author::Author;
use crate::model::book_definition::BookDefinition;
use crate::model::book_instance::BookInstanceStatus;
use crate::model::publisher::Publisher;
use crate::model::EntityId;

/// Shared second-level cache; wrap in `Arc` to share between sessions.
#[derive(Debug)]
pub struct SecondLevelCache {
    authors: CacheRegion<Author>,
    publishers: CacheRegion<Publisher>,
    book_definitions: CacheRegion<BookDefinition>,
    instance_statuses: CacheRegion<BookInstanceStatus>,
}

impl SecondLevelCache {
    pub fn new(config: &CacheConfig) -> Self {
        let region = |name: &'static str| (name, config.enabled, config.capacity_for(name));
        Self {
            authors: CacheRegion::new(region(Author::REGION)),
            publishers: CacheRegion::new(region(Publisher::REGION)),
            book_definitions: CacheRegion::new(region(BookDefinition::REGION)),
            instance_statuses: CacheRegion::new(region(BookInstanceStatus::REGION)),
        }
    }

    pub fn authors(&self) -> &CacheRegion<Author> {
        &self.authors
    }

    pub fn publishers(&self) -> &CacheRegion<Publisher> {
        &self.publishers
    }

    pub fn book_definitions(&self) -> &CacheRegion<BookDefinition> {
        &self.book_definitions
    }

    pub fn instance_statuses(&self) -> &CacheRegion<BookInstanceStatus> {
        &self.instance_statuses
    }

    /// Evicts `id` from the region called `name`, or every entry when `id`
    /// is `None`. Unknown names are ignored.
    pub fn evict_in(&self, name: &str, id: Option<EntityId>) {
        match name {
            Author::REGION => evict_from(&self.authors, id),
            Publisher::REGION => evict_from(&self.publishers, id),
            BookDefinition::REGION => evict_from(&self.book_definitions, id),
            BookInstanceStatus::REGION => evict_from(&self.instance_statuses, id),
            _ => {}
        }
    }

    /// Counters for every region, in a stable order.
    pub fn statistics(&self) -> Vec<RegionStats> {
        vec![
            self.authors.stats(),
            self.publishers.stats(),
            self.book_definitions.stats(),
            self.instance_statuses.stats(),
        ]
    }

    /// Looks up one region's counters by name.
    pub fn region_stats(&self, name: &str) -> Option<RegionStats> {
        self.statistics().into_iter().find(|stats| stats.name == name)
    }

    /// Drops every cached entry and resets counters.
    pub fn clear(&self) {
        self.authors.clear();
        self.publishers.clear();
        self.book_definitions.clear();
        self.instance_statuses.clear();
    }
}

fn evict_from<V: Clone>(region: &CacheRegion<V>, id: Option<EntityId>) {
    match id {
        Some(id) => {
            region.evict(id);
        }
        None => region.evict_all(),
    }
}

impl Default for SecondLevelCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_use_configured_capacities() {
        let mut config = CacheConfig::default();
        config.regions.insert(Author::REGION.to_string(), 2);
        let cache = SecondLevelCache::new(&config);

        assert_eq!(cache.authors().capacity(), 2);
        assert_eq!(cache.publishers().capacity(), config.default_capacity);
        assert_eq!(cache.statistics().len(), 4);
        assert!(cache.region_stats(BookInstanceStatus::REGION).is_some());
    }

    #[test]
    fn evict_in_dispatches_by_region_name() {
        let cache = SecondLevelCache::default();
        let author = Author::new("Bruce Eckel", None, 10).unwrap();
        cache.authors().put(1, author.clone());
        cache.authors().put(2, author);

        cache.evict_in(Author::REGION, Some(1));
        assert!(!cache.authors().contains(1));
        assert!(cache.authors().contains(2));

        cache.evict_in("unknown", None);
        assert!(cache.authors().contains(2));
        cache.evict_in(Author::REGION, None);
        assert!(!cache.authors().contains(2));
    }
}
