//! Per-session SQL statement counters.
//!
//! Repositories record every statement they execute through `Session`, so
//! tests can assert how many SELECT/INSERT/UPDATE/DELETE round trips an
//! operation costs. Transaction control is not counted.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Leading keyword of an executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    /// Classifies `sql` by its first keyword. `WITH` is treated as a query.
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|ch: char| ch.is_whitespace() || ch == '(')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "SELECT" | "WITH" => Self::Select,
            "INSERT" | "REPLACE" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }
}

/// Snapshot of statement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SqlCounts {
    pub select: u64,
    pub insert: u64,
    pub update: u64,
    pub delete: u64,
}

/// Thread-safe statement counters shared between a session and its observers.
#[derive(Debug, Default)]
pub struct SqlStatistics {
    select: AtomicU64,
    insert: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
}

impl SqlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: StatementKind) {
        let counter = match kind {
            StatementKind::Select => &self.select,
            StatementKind::Insert => &self.insert,
            StatementKind::Update => &self.update,
            StatementKind::Delete => &self.delete,
            StatementKind::Other => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn select_count(&self) -> u64 {
        self.select.load(Ordering::Relaxed)
    }

    pub fn insert_count(&self) -> u64 {
        self.insert.load(Ordering::Relaxed)
    }

    pub fn update_count(&self) -> u64 {
        self.update.load(Ordering::Relaxed)
    }

    pub fn delete_count(&self) -> u64 {
        self.delete.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SqlCounts {
        SqlCounts {
            select: self.select_count(),
            insert: self.insert_count(),
            update: self.update_count(),
            delete: self.delete_count(),
        }
    }

    pub fn reset(&self) {
        for counter in [&self.select, &self.insert, &self.update, &self.delete] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
