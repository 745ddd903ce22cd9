//! Counted statement execution over one migrated connection.
//!
//! # Responsibility
//! - Route every repository statement through one place so it is counted.
//! - Give repositories access to the shared second-level cache.
//! - Run multi-statement writes atomically.
//!
//! # Invariants
//! - Only statements that executed successfully are counted.
//! - Nested `with_transaction` calls join the outer transaction.
//! - Nothing read or written inside an open transaction is put into the
//!   second-level cache; evictions made inside a transaction owned by the
//!   session are repeated once it commits or rolls back.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use log::{debug, warn};
use rusqlite::types::FromSql;
use rusqlite::{Connection, Params, Row, Transaction, TransactionBehavior};

use super::error::{RepoError, RepoResult};
use crate::cache::{CacheRegion, SecondLevelCache};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{SqlStatistics, StatementKind};
use crate::model::EntityId;

const REQUIRED_TABLES: [&str; 6] = [
    "publisher",
    "author",
    "book_definition",
    "book_author",
    "book_instance_status",
    "book_instance",
];

/// Unit of database work shared by the repositories of one caller.
///
/// Sessions are cheap; create one per logical unit of work and share the
/// `SecondLevelCache` between them.
pub struct Session<'conn> {
    conn: &'conn Connection,
    statistics: Arc<SqlStatistics>,
    cache: Arc<SecondLevelCache>,
    owns_transaction: Cell<bool>,
    pending_evictions: RefCell<Vec<(&'static str, Option<EntityId>)>>,
}

impl<'conn> Session<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when a catalog table is absent.
    pub fn try_new(conn: &'conn Connection, cache: Arc<SecondLevelCache>) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }

        Ok(Self {
            conn,
            statistics: Arc::new(SqlStatistics::new()),
            cache,
            owns_transaction: Cell::new(false),
            pending_evictions: RefCell::new(Vec::new()),
        })
    }

    pub fn statistics(&self) -> &Arc<SqlStatistics> {
        &self.statistics
    }

    pub fn cache(&self) -> &SecondLevelCache {
        &self.cache
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Whether the connection is inside an open transaction.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Caches a loaded value unless a transaction is open; rows read inside
    /// a transaction may not be committed yet.
    pub(crate) fn cache_put<V: Clone>(&self, region: &CacheRegion<V>, id: EntityId, value: V) {
        if self.in_transaction() {
            debug!(
                "event=cache_put module=repo status=skipped reason=open_transaction region={} id={id}",
                region.name()
            );
            return;
        }
        region.put(id, value);
    }

    /// Evicts `id` now and again when the session's transaction ends.
    pub(crate) fn cache_evict<V: Clone>(&self, region: &CacheRegion<V>, id: EntityId) {
        region.evict(id);
        self.defer_eviction(region.name(), Some(id));
    }

    /// Empties `region` now and again when the session's transaction ends.
    pub(crate) fn cache_evict_all<V: Clone>(&self, region: &CacheRegion<V>) {
        region.evict_all();
        self.defer_eviction(region.name(), None);
    }

    fn defer_eviction(&self, region: &'static str, id: Option<EntityId>) {
        if self.owns_transaction.get() {
            self.pending_evictions.borrow_mut().push((region, id));
        }
    }

    /// Runs `sql` and maps the first row, if any.
    pub fn query_optional<T, P, F>(&self, sql: &str, params: P, map: F) -> RepoResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> RepoResult<T>,
    {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params)?;
        self.record(sql);
        match rows.next()? {
            Some(row) => Ok(Some(map(row)?)),
            None => Ok(None),
        }
    }

    /// Runs `sql` and maps every row.
    pub fn query_list<T, P, F>(&self, sql: &str, params: P, mut map: F) -> RepoResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> RepoResult<T>,
    {
        let mut items = Vec::new();
        self.for_each_row(sql, params, |row| {
            items.push(map(row)?);
            Ok(())
        })?;
        Ok(items)
    }

    /// Runs `sql` and hands each row to `visit`; used by join fetches that
    /// fold several rows into one aggregate.
    pub fn for_each_row<P, F>(&self, sql: &str, params: P, mut visit: F) -> RepoResult<()>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> RepoResult<()>,
    {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params)?;
        self.record(sql);
        while let Some(row) = rows.next()? {
            visit(row)?;
        }
        Ok(())
    }

    /// Runs a single-value query such as `SELECT COUNT(*)`.
    pub fn query_scalar<T: FromSql, P: Params>(&self, sql: &str, params: P) -> RepoResult<T> {
        let value = self.conn.query_row(sql, params, |row| row.get(0))?;
        self.record(sql);
        Ok(value)
    }

    /// Executes a write statement and returns the number of changed rows.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> RepoResult<usize> {
        let changed = self.conn.prepare_cached(sql)?.execute(params)?;
        self.record(sql);
        Ok(changed)
    }

    /// Row id assigned by the most recent successful INSERT.
    pub fn last_insert_id(&self) -> EntityId {
        self.conn.last_insert_rowid()
    }

    /// Runs `work` inside an IMMEDIATE transaction, committing on `Ok`.
    ///
    /// When a transaction is already open the work joins it and the outer
    /// caller decides whether to commit.
    pub fn with_transaction<T>(&self, work: impl FnOnce(&Self) -> RepoResult<T>) -> RepoResult<T> {
        if self.in_transaction() {
            return work(self);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        self.owns_transaction.set(true);
        let result = match work(self) {
            Ok(value) => tx.commit().map(|()| value).map_err(RepoError::from),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=repo status=error error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        };
        self.owns_transaction.set(false);
        self.flush_pending_evictions();
        result
    }

    // Another session may have cached the pre-transaction row between the
    // in-transaction eviction and the commit.
    fn flush_pending_evictions(&self) {
        let pending = std::mem::take(&mut *self.pending_evictions.borrow_mut());
        for (region, id) in pending {
            self.cache.evict_in(region, id);
        }
    }

    fn record(&self, sql: &str) {
        self.statistics.record(StatementKind::classify(sql));
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
