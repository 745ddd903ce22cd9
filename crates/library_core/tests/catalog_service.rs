use std::sync::Arc;

use chrono::Local;
use library_core::db::{load_demo_catalog, open_db_in_memory};
use library_core::{
    BookDefinitionRepository, BookInstanceRepository, BookInstanceState, BookLanguage,
    CatalogService, NamedEntity, NewBook, RepoError, SecondLevelCache, Session,
    SqliteBookDefinitionRepository, SqliteBookInstanceRepository,
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

fn request(publisher_id: Option<i64>, author_ids: Vec<i64>) -> NewBook {
    NewBook {
        name: "Database Internals".to_string(),
        description: Some("Storage engines and distributed systems".to_string()),
        creator: 10,
        release_year: 2019,
        cover_type: "paperback".to_string(),
        isbn: "978-1-4920-4034-7".to_string(),
        page_count: 373,
        language: BookLanguage::English,
        publisher_id,
        author_ids,
    }
}

#[test]
fn register_book_links_publisher_and_authors() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);

    let book = service.register_book(&request(Some(2), vec![3, 1, 3])).unwrap();
    assert_eq!(book.id(), Some(50));
    assert_eq!(book.publisher_id(), Some(2));
    let author_ids: Vec<_> = book
        .authors()
        .unwrap()
        .iter()
        .map(|author| author.id().unwrap())
        .collect();
    assert_eq!(author_ids, vec![1, 3]);

    let bibliography = service.author_bibliography(3).unwrap();
    let titles: Vec<_> = bibliography
        .book_definitions()
        .unwrap()
        .iter()
        .map(|book| book.name().to_string())
        .collect();
    assert_eq!(
        titles,
        vec!["Designing Data-Intensive Applications", "Database Internals"]
    );
}

#[test]
fn register_book_with_unknown_references_writes_nothing() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);

    assert!(matches!(
        service.register_book(&request(Some(9), vec![1])),
        Err(RepoError::NotFound {
            entity: "publisher",
            id: 9
        })
    ));
    assert!(matches!(
        service.register_book(&request(Some(1), vec![1, 8])),
        Err(RepoError::NotFound {
            entity: "author",
            id: 8
        })
    ));

    assert_eq!(session.statistics().insert_count(), 0);
    let books = SqliteBookDefinitionRepository::new(&session);
    assert_eq!(books.count().unwrap(), 4);
}

#[test]
fn register_book_validates_fields() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);

    let mut bad = request(None, Vec::new());
    bad.page_count = 0;
    assert!(matches!(
        service.register_book(&bad),
        Err(RepoError::Validation(_))
    ));
    assert_eq!(session.statistics().snapshot().select, 0);
}

#[test]
fn publisher_catalog_is_one_query() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);

    let publisher = service.publisher_catalog(2).unwrap();
    assert_eq!(publisher.book_definitions().unwrap().len(), 1);
    assert_eq!(session.statistics().select_count(), 1);
    assert!(matches!(
        service.publisher_catalog(5),
        Err(RepoError::NotFound { id: 5, .. })
    ));
}

#[test]
fn lend_and_return_copy() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);
    let today = Local::now().date_naive();

    let lent = service.lend_instance(1, 40).unwrap();
    assert_eq!(lent.status().state(), BookInstanceState::OnUser);
    assert_eq!(lent.status().to_user(), Some(40));
    assert_eq!(lent.status().moved_to_user_date(), Some(today));

    let returned = service.return_instance(1).unwrap();
    assert_eq!(returned.status().state(), BookInstanceState::OnOwner);
    assert_eq!(returned.status().to_user(), None);

    let stored = SqliteBookInstanceRepository::new(&session)
        .find_status_by_id(1)
        .unwrap()
        .unwrap();
    assert_eq!(stored.state(), BookInstanceState::OnOwner);
    assert_eq!(stored.moved_to_owner_date(), Some(today));

    assert!(matches!(
        service.lend_instance(404, 40),
        Err(RepoError::NotFound {
            entity: "book_instance",
            ..
        })
    ));
}

#[test]
fn add_instance_requires_existing_book() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);

    let instance = service.add_instance(4, 12).unwrap();
    assert_eq!(instance.id(), Some(50));
    assert_eq!(instance.status().state(), BookInstanceState::JustAdded);

    assert!(matches!(
        service.add_instance(999, 12),
        Err(RepoError::NotFound {
            entity: "book_definition",
            ..
        })
    ));
    let copies = SqliteBookInstanceRepository::new(&session)
        .find_by_definition(4)
        .unwrap();
    assert_eq!(copies.len(), 1);
}

#[test]
fn rename_book_checks_expected_version() {
    let conn = seeded_connection();
    let session = session(&conn);
    let service = CatalogService::new(&session);

    let renamed = service.rename_book(2, 0, "Clean Code (Annotated)").unwrap();
    assert_eq!(renamed.version(), 1);

    assert!(matches!(
        service.rename_book(2, 0, "Clean Code, again"),
        Err(RepoError::OptimisticLock { id: 2, .. })
    ));
    assert!(matches!(
        service.rename_book(77, 0, "Missing"),
        Err(RepoError::NotFound { id: 77, .. })
    ));

    let stored = SqliteBookDefinitionRepository::new(&session)
        .find_by_id(2)
        .unwrap()
        .unwrap();
    assert_eq!(stored.name(), "Clean Code (Annotated)");
}
