use std::sync::Arc;

use library_core::db::{load_demo_catalog, open_db_in_memory};
use library_core::{
    BookDefinition, BookDefinitionRepository, BookLanguage, CacheConfig, NamedEntity, RepoError,
    SecondLevelCache, Session, SqliteBookDefinitionRepository, ValidationError,
};
use rusqlite::Connection;

fn seeded_connection() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    load_demo_catalog(&mut conn).unwrap();
    conn
}

fn session(conn: &Connection) -> Session<'_> {
    Session::try_new(conn, Arc::new(SecondLevelCache::default())).unwrap()
}

fn new_book(name: &str) -> BookDefinition {
    BookDefinition::new(
        name,
        Some("A book used in repository tests".to_string()),
        10,
        2020,
        "paperback",
        "978-3-16-148410-0",
        321,
        BookLanguage::English,
    )
    .unwrap()
}

#[test]
fn find_by_id_selects_once_per_distinct_id() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let book = repo.find_by_id(1).unwrap().unwrap();
    assert_eq!(book.name(), "Thinking in Java");
    assert_eq!(book.language(), BookLanguage::Russian);
    assert_eq!(book.publisher_id(), Some(1));
    assert_eq!(session.statistics().select_count(), 1);

    repo.find_by_id(1).unwrap().unwrap();
    assert_eq!(session.statistics().select_count(), 1);

    repo.find_by_id(2).unwrap().unwrap();
    repo.find_by_id(3).unwrap().unwrap();
    assert_eq!(session.statistics().select_count(), 3);

    assert!(repo.find_by_id(999).unwrap().is_none());
    assert!(repo.find_by_id(999).unwrap().is_none());
    assert_eq!(session.statistics().select_count(), 5);

    let stats = session.cache().region_stats("book_definition").unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.size, 3);
}

#[test]
fn cache_is_shared_between_sessions() {
    let conn = seeded_connection();
    let cache = Arc::new(SecondLevelCache::default());

    let first = Session::try_new(&conn, Arc::clone(&cache)).unwrap();
    SqliteBookDefinitionRepository::new(&first)
        .find_by_id(3)
        .unwrap()
        .unwrap();
    assert_eq!(first.statistics().select_count(), 1);

    let second = Session::try_new(&conn, cache).unwrap();
    let book = SqliteBookDefinitionRepository::new(&second)
        .find_by_id(3)
        .unwrap()
        .unwrap();
    assert_eq!(book.name(), "Designing Data-Intensive Applications");
    assert_eq!(second.statistics().select_count(), 0);
}

#[test]
fn disabled_cache_always_hits_the_database() {
    let conn = seeded_connection();
    let session = Session::try_new(
        &conn,
        Arc::new(SecondLevelCache::new(&CacheConfig::disabled())),
    )
    .unwrap();
    let repo = SqliteBookDefinitionRepository::new(&session);

    repo.find_by_id(1).unwrap().unwrap();
    repo.find_by_id(1).unwrap().unwrap();
    assert_eq!(session.statistics().select_count(), 2);
}

#[test]
fn find_all_uses_single_select() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let books = repo.find_all().unwrap();
    let ids: Vec<_> = books.iter().map(|book| book.id().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(session.statistics().select_count(), 1);

    repo.find_by_id(4).unwrap().unwrap();
    assert_eq!(session.statistics().select_count(), 1);
}

#[test]
fn find_by_publisher_and_count() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let ids: Vec<_> = repo
        .find_by_publisher(1)
        .unwrap()
        .iter()
        .map(|book| book.id().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 4]);
    assert!(repo.find_by_publisher(42).unwrap().is_empty());
    assert_eq!(repo.count().unwrap(), 4);
    assert_eq!(session.statistics().select_count(), 3);
}

#[test]
fn create_inserts_once_and_assigns_generated_id() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = new_book("Refactoring");
    book.set_publisher_id(Some(2)).unwrap();
    let id = repo.create(&mut book).unwrap();

    assert_eq!(id, 50);
    assert_eq!(book.id(), Some(50));
    assert_eq!(book.version(), 0);
    assert!(!book.is_dirty());
    let counts = session.statistics().snapshot();
    assert_eq!(counts.insert, 1);
    assert_eq!(counts.select, 0);
    assert!(!session.cache().book_definitions().contains(id));

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.name(), "Refactoring");
    assert_eq!(loaded.publisher_id(), Some(2));
    assert_eq!(loaded.isbn(), "978-3-16-148410-0");
}

#[test]
fn create_rejects_persisted_entity() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = repo.find_by_id(2).unwrap().unwrap();
    assert!(matches!(
        repo.create(&mut book),
        Err(RepoError::AlreadyPersisted { id: 2, .. })
    ));
}

#[test]
fn update_of_clean_entity_issues_no_sql() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = repo.find_by_id(2).unwrap().unwrap();
    book.set_page_count(book.page_count()).unwrap();
    session.statistics().reset();

    assert!(!repo.update(&mut book).unwrap());
    assert_eq!(session.statistics().snapshot().update, 0);
    assert_eq!(book.version(), 0);
}

#[test]
fn dirty_update_bumps_version_and_evicts_cache() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = repo.find_by_id(2).unwrap().unwrap();
    book.set_page_count(500).unwrap();
    book.set_language(BookLanguage::German);
    assert!(book.is_dirty());

    assert!(repo.update(&mut book).unwrap());
    assert_eq!(book.version(), 1);
    assert!(!book.is_dirty());
    assert_eq!(session.statistics().update_count(), 1);
    assert!(!session.cache().book_definitions().contains(2));

    let reloaded = repo.find_by_id(2).unwrap().unwrap();
    assert_eq!(reloaded.version(), 1);
    assert_eq!(reloaded.page_count(), 500);
    assert_eq!(reloaded.language(), BookLanguage::German);
    assert_eq!(session.statistics().select_count(), 2);
}

#[test]
fn stale_copy_fails_with_optimistic_lock() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut first = repo.find_by_id(4).unwrap().unwrap();
    let mut second = repo.find_by_id(4).unwrap().unwrap();

    second.set_name("Clean Architecture (2nd printing)").unwrap();
    repo.update(&mut second).unwrap();

    first.set_cover_type("softcover").unwrap();
    let err = repo.update(&mut first).unwrap_err();
    assert!(matches!(
        err,
        RepoError::OptimisticLock {
            entity: "book_definition",
            id: 4,
            version: 0,
        }
    ));

    let current = repo.find_by_id(4).unwrap().unwrap();
    assert_eq!(current.name(), "Clean Architecture (2nd printing)");
    assert_eq!(current.cover_type(), "hardcover");
    assert_eq!(current.version(), 1);
}

#[test]
fn update_of_transient_entity_is_rejected() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = new_book("Never saved");
    assert!(matches!(
        repo.update(&mut book),
        Err(RepoError::Transient { .. })
    ));
}

#[test]
fn save_creates_then_updates() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = new_book("Working Effectively with Legacy Code");
    let id = repo.save(&mut book).unwrap();
    book.set_release_year(2004).unwrap();
    assert_eq!(repo.save(&mut book).unwrap(), id);

    let counts = session.statistics().snapshot();
    assert_eq!(counts.insert, 1);
    assert_eq!(counts.update, 1);
    assert_eq!(book.version(), 1);
}

#[test]
fn delete_by_id_tolerates_missing_rows() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    repo.find_by_id(2).unwrap().unwrap();
    assert!(repo.delete_by_id(2).unwrap());
    assert!(!session.cache().book_definitions().contains(2));
    assert!(repo.find_by_id(2).unwrap().is_none());

    assert!(!repo.delete_by_id(999).unwrap());
    assert_eq!(session.statistics().delete_count(), 2);
}

#[test]
fn delete_checks_version_and_cascades_author_links() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let book = repo.find_by_id(4).unwrap().unwrap();
    let mut newer = book.clone();
    newer.set_page_count(440).unwrap();
    repo.update(&mut newer).unwrap();

    assert!(matches!(
        repo.delete(&book),
        Err(RepoError::OptimisticLock { id: 4, .. })
    ));
    repo.delete(&newer).unwrap();

    let links: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM book_author WHERE book_definition_id = 4;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(links, 0);
}

#[test]
fn deleting_book_with_copies_is_refused() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    assert!(matches!(repo.delete_by_id(1), Err(RepoError::Db(_))));
    assert_eq!(repo.count().unwrap(), 4);
}

#[test]
fn authors_load_lazily_with_one_select() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let mut book = repo.find_by_id(4).unwrap().unwrap();
    assert!(book.authors().is_none());

    let names: Vec<_> = repo
        .load_authors(&mut book)
        .unwrap()
        .iter()
        .map(|author| author.name().to_string())
        .collect();
    assert_eq!(names, vec!["Robert Martin"]);
    assert_eq!(session.statistics().select_count(), 2);

    repo.load_authors(&mut book).unwrap();
    assert_eq!(session.statistics().select_count(), 2);

    let cached = repo.find_by_id(4).unwrap().unwrap();
    assert!(cached.authors().is_none());
}

#[test]
fn link_and_unlink_author() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    repo.link_author(2, 1).unwrap();
    repo.link_author(2, 1).unwrap();
    let mut book = repo.find_by_id(2).unwrap().unwrap();
    assert_eq!(repo.load_authors(&mut book).unwrap().len(), 2);

    assert!(repo.unlink_author(2, 1).unwrap());
    assert!(!repo.unlink_author(2, 1).unwrap());
}

#[test]
fn invalid_fields_never_reach_the_database() {
    let isbn = BookDefinition::new(
        "Bad ISBN",
        None,
        10,
        2020,
        "paperback",
        "12-34",
        100,
        BookLanguage::English,
    );
    assert!(matches!(isbn, Err(ValidationError::StringLength { .. })));

    let mut book = new_book("Valid");
    assert!(book.set_page_count(0).is_err());
    assert!(book.set_release_year(1200).is_err());
    assert!(book.set_isbn("978-3-16-14841X-0").is_err());
    assert!(book.set_publisher_id(Some(-1)).is_err());
    assert!(!book.is_dirty());
}

#[test]
fn rolled_back_update_never_reaches_the_cache() {
    let conn = seeded_connection();
    let session = session(&conn);
    let repo = SqliteBookDefinitionRepository::new(&session);

    let outcome: Result<(), RepoError> = session.with_transaction(|_| {
        let mut book = repo.find_by_id(2)?.unwrap();
        book.set_name("Uncommitted title").unwrap();
        assert!(repo.update(&mut book)?);
        assert_eq!(repo.find_by_id(2)?.unwrap().name(), "Uncommitted title");
        Err(RepoError::InvalidData("abandon the edit".to_string()))
    });
    assert!(matches!(outcome, Err(RepoError::InvalidData(_))));
    assert!(!session.cache().book_definitions().contains(2));

    let stored = repo.find_by_id(2).unwrap().unwrap();
    assert_eq!(stored.name(), "Clean Code");
    assert_eq!(stored.version(), 0);
}

#[test]
fn reads_inside_a_transaction_are_cached_only_after_it_ends() {
    let conn = seeded_connection();
    let cache = Arc::new(SecondLevelCache::default());
    let writer = Session::try_new(&conn, Arc::clone(&cache)).unwrap();
    let repo = SqliteBookDefinitionRepository::new(&writer);

    writer
        .with_transaction(|_| {
            repo.find_by_id(1)?.unwrap();
            assert!(!cache.book_definitions().contains(1));
            Ok(())
        })
        .unwrap();
    assert!(!cache.book_definitions().contains(1));

    repo.find_by_id(1).unwrap().unwrap();
    assert!(cache.book_definitions().contains(1));
}

#[test]
fn committed_update_leaves_no_stale_copy_behind() {
    let conn = seeded_connection();
    let cache = Arc::new(SecondLevelCache::default());
    let writer = Session::try_new(&conn, Arc::clone(&cache)).unwrap();
    let repo = SqliteBookDefinitionRepository::new(&writer);

    writer
        .with_transaction(|_| {
            let mut book = repo.find_by_id(2)?.unwrap();
            book.set_name("Clean Code, 2nd edition").unwrap();
            repo.update(&mut book)?;
            // Pre-transaction state as another session would have cached it.
            let mut before = book.clone();
            before.set_name("Clean Code").unwrap();
            cache.book_definitions().put(2, before);
            Ok(())
        })
        .unwrap();

    assert!(!cache.book_definitions().contains(2));
    let stored = repo.find_by_id(2).unwrap().unwrap();
    assert_eq!(stored.name(), "Clean Code, 2nd edition");
    assert_eq!(stored.version(), 1);
}
