//! Catalog schema steps tracked in `PRAGMA user_version`.
//!
//! # Invariants
//! - Steps are applied in ascending `version` order, all in one transaction.
//! - After a step, every table it lists in `id_tables` hands out ids from
//!   `FIRST_GENERATED_ID` on; lower ids belong to fixtures.

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::db::{DbError, DbResult};

/// First id SQLite generates for a catalog table.
pub const FIRST_GENERATED_ID: i64 = 50;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
    /// AUTOINCREMENT tables created by this step.
    id_tables: &'static [&'static str],
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "catalog",
        sql: include_str!("0001_catalog.sql"),
        id_tables: &["publisher", "author", "book_definition"],
    },
    SchemaStep {
        version: 2,
        name: "book_instances",
        sql: include_str!("0002_book_instances.sql"),
        id_tables: &["book_instance_status", "book_instance"],
    },
];

/// Schema version this build writes and expects.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
/// - `MigrationCheck` when a step's id tables cannot reserve the fixture range.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let to_version = latest_version();
    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        run_step(&tx, step)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={to_version}");
    Ok(())
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    for table in step.id_tables {
        reserve_fixture_ids(tx, step.version, table)?;
    }
    // PRAGMA arguments cannot be bound.
    tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={} id_tables={}",
        step.version,
        step.name,
        step.id_tables.len()
    );
    Ok(())
}

fn reserve_fixture_ids(tx: &Transaction<'_>, version: u32, table: &str) -> DbResult<()> {
    let create_sql: Option<String> = tx
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    let check_failed = |reason: String| DbError::MigrationCheck { version, reason };
    match create_sql {
        None => return Err(check_failed(format!("table {table} was not created"))),
        Some(sql) if !sql.to_ascii_uppercase().contains("AUTOINCREMENT") => {
            return Err(check_failed(format!("table {table} has no AUTOINCREMENT key")));
        }
        Some(_) => {}
    }

    let rows: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM \"{table}\";"), [], |row| {
        row.get(0)
    })?;
    if rows > 0 {
        return Err(check_failed(format!("table {table} already holds {rows} rows")));
    }

    tx.execute(
        "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2);",
        params![table, FIRST_GENERATED_ID - 1],
    )?;
    Ok(())
}
