use std::sync::Arc;

use library_core::db::migrations::latest_version;
use library_core::db::{load_demo_catalog, open_db, open_db_in_memory, DbError};
use library_core::{RepoError, SecondLevelCache, Session};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "publisher",
        "author",
        "book_definition",
        "book_author",
        "book_instance_status",
        "book_instance",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.db");

    let mut conn_first = open_db(&path).unwrap();
    load_demo_catalog(&mut conn_first).unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let books: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM book_definition;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(books, 4);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn demo_catalog_cannot_be_loaded_twice() {
    let mut conn = open_db_in_memory().unwrap();
    load_demo_catalog(&mut conn).unwrap();
    assert!(load_demo_catalog(&mut conn).is_err());

    let publishers: i64 = conn
        .query_row("SELECT COUNT(*) FROM publisher;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(publishers, 2);
}

#[test]
fn generated_ids_start_after_reserved_range() {
    let mut conn = open_db_in_memory().unwrap();
    load_demo_catalog(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO author (creator, created_at, name) VALUES (10, 0, 'New Author');",
        [],
    )
    .unwrap();
    assert_eq!(conn.last_insert_rowid(), 50);
}

#[test]
fn session_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let result = Session::try_new(&conn, Arc::new(SecondLevelCache::default()));
    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn session_rejects_missing_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys = OFF;
         DROP TABLE book_instance;",
    )
    .unwrap();
    let result = Session::try_new(&conn, Arc::new(SecondLevelCache::default()));
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("book_instance"))
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
