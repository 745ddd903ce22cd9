use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::debug;
use lru::LruCache;
use serde::Serialize;

use crate::model::EntityId;

/// Counter snapshot for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionStats {
    pub name: &'static str,
    pub enabled: bool,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub evictions: u64,
}

/// One named LRU region keyed by entity id.
#[derive(Debug)]
pub struct CacheRegion<V> {
    name: &'static str,
    enabled: bool,
    entries: Mutex<LruCache<EntityId, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> CacheRegion<V> {
    pub(crate) fn new((name, enabled, capacity): (&'static str, bool, usize)) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            enabled,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Returns a copy of the cached value and records a hit or miss.
    pub fn get(&self, id: EntityId) -> Option<V> {
        let cached = if self.enabled {
            self.lock().get(&id).cloned()
        } else {
            None
        };
        match cached {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, id: EntityId, value: V) {
        if !self.enabled {
            return;
        }
        let displaced = self.lock().push(id, value);
        self.puts.fetch_add(1, Ordering::Relaxed);
        // `push` also returns the old value on a plain overwrite of `id`.
        if let Some((dropped, _)) = displaced.filter(|(dropped, _)| *dropped != id) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(
                "event=cache_evict module=cache status=capacity region={} id={dropped}",
                self.name
            );
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.enabled && self.lock().contains(&id)
    }

    /// Removes `id`; returns whether an entry was present.
    pub fn evict(&self, id: EntityId) -> bool {
        if !self.enabled {
            return false;
        }
        let removed = self.lock().pop(&id).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(
                "event=cache_evict module=cache status=ok region={} id={id}",
                self.name
            );
        }
        removed
    }

    /// Drops every entry, keeping counters; used when a bulk write touches
    /// rows that cannot be named individually.
    pub fn evict_all(&self) {
        if !self.enabled {
            return;
        }
        let mut entries = self.lock();
        let removed = entries.len() as u64;
        entries.clear();
        self.evictions.fetch_add(removed, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RegionStats {
        RegionStats {
            name: self.name,
            enabled: self.enabled,
            size: self.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
        for counter in [&self.hits, &self.misses, &self.puts, &self.evictions] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<EntityId, V>> {
        // A panic while holding the lock cannot leave the LRU half-updated.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
