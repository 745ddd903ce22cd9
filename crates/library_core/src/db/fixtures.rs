//! Demo catalog fixtures for local runs and repository integration tests.
//!
//! Ids 1-4 are fixed so callers can address rows directly; generated ids
//! continue from 50.

use super::DbResult;
use log::info;
use rusqlite::Connection;

const DEMO_CATALOG_SQL: &str = include_str!("fixtures/demo_catalog.sql");

/// Inserts the demo catalog in a single transaction.
///
/// Fails with a constraint error if the rows already exist.
pub fn load_demo_catalog(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(DEMO_CATALOG_SQL)?;
    tx.commit()?;
    info!("event=fixtures_load module=db status=ok fixture=demo_catalog");
    Ok(())
}
