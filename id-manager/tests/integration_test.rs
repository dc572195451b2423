//! Integration tests for the ID manager
//!
//! These tests verify end-to-end functionality including:
//! - Item and tag lifecycles against a file database
//! - Upgrading a database left behind by an early release
//! - Repeated startup against the same file
//! - Query building for web searches

use idmanager::app;
use idmanager::database::{create_pool, DarkMode, Repository};
use idmanager::error::AppError;
use idmanager::services::{ItemsService, SearchService, SettingsService, TagsService};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

struct Services {
    items: ItemsService,
    tags: TagsService,
    settings: SettingsService,
    search: SearchService,
}

/// Helper to create a test database with schema
async fn create_test_services() -> (Services, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let pool = create_pool(&db_path).await.unwrap();
    let repo = Repository::new(pool);
    let settings = SettingsService::new(repo.clone());

    let services = Services {
        items: ItemsService::new(repo.clone(), settings.clone()),
        tags: TagsService::new(repo.clone()),
        search: SearchService::new(repo, settings.clone()),
        settings,
    };

    (services, temp_dir)
}

/// Write a database the way the first releases laid it out
async fn write_legacy_database(db_path: &Path) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
        .await
        .unwrap();

    for statement in [
        "CREATE TABLE ids (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, \
         username TEXT, password TEXT, notes TEXT, createdAt TEXT NOT NULL, updatedAt TEXT NOT NULL)",
        "INSERT INTO ids (title, username, password, notes, createdAt, updatedAt) VALUES \
         ('1111111', 'alice', 'hunter2', 'first', '2023-01-01T00:00:00.000Z', '2023-01-01T00:00:00.000Z'), \
         ('2222222', 'bob', 'pw', NULL, '2023-03-01T00:00:00.000Z', '2023-03-01T00:00:00.000Z'), \
         ('3333333', NULL, NULL, 'third', '2023-02-01T00:00:00.000Z', '2023-02-01T00:00:00.000Z')",
        "CREATE TABLE search_words (id INTEGER PRIMARY KEY AUTOINCREMENT, word TEXT NOT NULL, \
         isActive INTEGER NOT NULL DEFAULT 1, createdAt TEXT NOT NULL)",
        "INSERT INTO search_words (word, isActive, createdAt) VALUES ('ID', 1, '2023-01-01T00:00:00.000Z')",
        "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT)",
        "INSERT INTO settings (key, value) VALUES ('search_prefix', 'YouTube')",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    pool.close().await;
}

#[tokio::test]
async fn test_item_crud_operations() {
    let (services, _temp) = create_test_services().await;

    let tag = services
        .tags
        .create_tag("YouTube".to_string(), Some("#FF6B6B".to_string()))
        .await
        .unwrap();

    // Create item
    let item = services
        .items
        .create_item(
            "1234567".to_string(),
            Some("cute puppy video".to_string()),
            vec![tag.id],
        )
        .await
        .unwrap();

    assert_eq!(item.title, "1234567");
    assert_eq!(item.tag_ids, vec![tag.id]);

    // Read item
    let retrieved = services.items.get_item(item.id).await.unwrap();
    assert_eq!(retrieved, item);

    // Update item, dropping the tag
    let updated = services
        .items
        .update_item(item.id, "7654321".to_string(), None, vec![])
        .await
        .unwrap();

    assert_eq!(updated.title, "7654321");
    assert!(updated.tag_ids.is_empty());

    // List items
    let items = services.items.list_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "7654321");

    // Delete item
    services.items.delete_item(item.id).await.unwrap();

    let result = services.items.get_item(item.id).await;
    assert!(matches!(result, Err(AppError::ItemNotFound(_))));
    assert!(services.items.list_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tag_deletion_workflow() {
    let (services, _temp) = create_test_services().await;

    let a = services.tags.create_tag("A".to_string(), None).await.unwrap();
    let b = services.tags.create_tag("B".to_string(), None).await.unwrap();

    let first = services
        .items
        .create_item("first".to_string(), None, vec![a.id, b.id])
        .await
        .unwrap();
    let second = services
        .items
        .create_item("second".to_string(), None, vec![a.id])
        .await
        .unwrap();

    // A frontend warns before deleting a tag still in use
    let users: HashSet<i64> = services
        .tags
        .items_using_tag(a.id)
        .await
        .unwrap()
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(users, HashSet::from([first.id, second.id]));

    services.tags.delete_tag(a.id).await.unwrap();

    for item in services.items.list_items().await.unwrap() {
        assert!(!item.has_tag(a.id));
    }
    assert_eq!(services.items.get_item(first.id).await.unwrap().tag_ids, vec![b.id]);
    assert!(services
        .tags
        .list_tags()
        .await
        .unwrap()
        .iter()
        .all(|tag| tag.id != a.id));
}

#[tokio::test]
async fn test_drag_reorder() {
    let (services, _temp) = create_test_services().await;

    let mut ids = Vec::new();
    for title in ["one", "two", "three"] {
        let item = services
            .items
            .create_item(title.to_string(), None, vec![])
            .await
            .unwrap();
        ids.push(item.id);
    }

    services
        .items
        .reorder_items(&[ids[2], ids[0], ids[1]])
        .await
        .unwrap();

    let listed: Vec<i64> = services
        .items
        .list_items()
        .await
        .unwrap()
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(listed, vec![ids[2], ids[0], ids[1]]);

    // A new item still lands on top
    let newest = services
        .items
        .create_item("four".to_string(), None, vec![])
        .await
        .unwrap();
    assert_eq!(services.items.list_items().await.unwrap()[0].id, newest.id);
}

#[tokio::test]
async fn test_search_query_building() {
    let (services, _temp) = create_test_services().await;

    let own = services.tags.create_tag("Vimeo".to_string(), None).await.unwrap();
    services.tags.set_tag_active(own.id, false).await.unwrap();

    // Seeded default tag is the only active one
    let query = services
        .search
        .build_search_query("1234567", &[own.id])
        .await
        .unwrap();
    assert_eq!(query, "ID Vimeo 1234567");

    services.settings.set_use_search_words(false).await.unwrap();

    let query = services.search.build_search_query("1234567", &[]).await.unwrap();
    assert_eq!(query, "1234567");
}

#[tokio::test]
async fn test_legacy_database_upgrade() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("legacy.db");
    write_legacy_database(&db_path).await;

    let pool = create_pool(&db_path).await.unwrap();
    let repo = Repository::new(pool);

    // Rows survive, credentials are gone, previous display order kept
    let titles: Vec<String> = repo
        .list_items()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["2222222", "3333333", "1111111"]);

    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('items')")
        .fetch_all(&pool_for(&db_path).await)
        .await
        .unwrap();
    assert!(!columns.iter().any(|c| c == "username" || c == "password"));

    // The old single prefix became an active tag next to the seeded one
    let mut words: Vec<String> = repo
        .list_active_tags()
        .await
        .unwrap()
        .into_iter()
        .map(|tag| tag.word)
        .collect();
    words.sort();
    assert_eq!(words, vec!["ID", "YouTube"]);

    let settings = repo.get_global_settings().await.unwrap();
    assert!(settings.use_search_words);
    assert_eq!(settings.dark_mode, DarkMode::System);
}

async fn pool_for(db_path: &Path) -> sqlx::SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_repeated_startup_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");

    let first = app::setup(data_dir.clone()).await.unwrap();
    first
        .items_service
        .create_item("keep me".to_string(), None, vec![])
        .await
        .unwrap();
    first
        .settings_service
        .set_dark_mode(DarkMode::Dark)
        .await
        .unwrap();

    let second = app::setup(data_dir.clone()).await.unwrap();
    let third = app::setup(data_dir).await.unwrap();

    assert_eq!(third.tags_service.list_tags().await.unwrap().len(), 1);
    assert_eq!(third.items_service.list_items().await.unwrap().len(), 1);
    assert_eq!(
        second.settings_service.load().await.unwrap().dark_mode,
        DarkMode::Dark
    );
}
