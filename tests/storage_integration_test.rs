//! Integration tests for the storage backends
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests (needs DATABASE_URL)
//! - By default, SQLite and memory are tested, PostgreSQL only when DATABASE_URL is set

use shorturl::models::HostnameCount;
use shorturl::storage::{MemoryStorage, PostgresStorage, SqliteStorage, Storage, StorageError};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true,
    }
}

async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn create_postgres_storage() -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

/// Backends that start out empty
async fn fresh_backends() -> Vec<(&'static str, Arc<dyn Storage>)> {
    let mut backends: Vec<(&'static str, Arc<dyn Storage>)> = vec![];
    if should_test_backend("sqlite") {
        backends.push(("sqlite", create_sqlite_storage().await));
    }
    if should_test_backend("memory") {
        backends.push(("memory", Arc::new(MemoryStorage::new())));
    }
    backends
}

/// Unique prefix so PostgreSQL runs do not trip over earlier data
fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}{nanos}")
}

async fn check_concurrent_creation(storage: Arc<dyn Storage>, short_id: String) {
    let mut handles = vec![];

    // Try to create the same id concurrently
    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        let short_id = short_id.clone();
        let handle = tokio::spawn(async move {
            storage_clone
                .create(&short_id, &format!("https://example.com/{i}"))
                .await
        });
        handles.push(handle);
    }

    // Exactly one should succeed, others should get Conflict error
    let mut success_count = 0;
    let mut conflict_count = 0;

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(StorageError::Conflict) => conflict_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one creation should succeed");
    assert_eq!(conflict_count, 9, "All others should get conflict");
}

#[tokio::test]
async fn test_concurrent_creation_same_id() {
    for (_, storage) in fresh_backends().await {
        check_concurrent_creation(storage, "same_id".to_string()).await;
    }
}

#[tokio::test]
async fn test_concurrent_creation_same_id_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_concurrent_creation(storage, unique("same")).await;
}

async fn check_lifecycle(storage: Arc<dyn Storage>, short_id: String) {
    let created = storage
        .create(&short_id, "https://example.com/start")
        .await
        .unwrap();
    assert_eq!(created.short_id, short_id);
    assert_eq!(created.access_count, 0);
    assert_eq!(created.created_at, created.updated_at);

    let found = storage.get(&short_id).await.unwrap().unwrap();
    assert_eq!(found.target_url, "https://example.com/start");

    assert_eq!(
        storage.update(&short_id, "https://example.com/next").await.unwrap(),
        1
    );
    let found = storage.get(&short_id).await.unwrap().unwrap();
    assert_eq!(found.target_url, "https://example.com/next");
    assert_eq!(found.short_id, short_id);

    storage.increment_access_count(&short_id).await.unwrap();
    storage.increment_access_count(&short_id).await.unwrap();
    let found = storage.get(&short_id).await.unwrap().unwrap();
    assert_eq!(found.access_count, 2);

    assert!(storage.delete(&short_id).await.unwrap());
    assert!(storage.get(&short_id).await.unwrap().is_none());
    assert!(!storage.delete(&short_id).await.unwrap());
    assert_eq!(
        storage.update(&short_id, "https://example.com/gone").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_record_lifecycle() {
    for (_, storage) in fresh_backends().await {
        check_lifecycle(storage, "life".to_string()).await;
    }
}

#[tokio::test]
async fn test_record_lifecycle_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_lifecycle(storage, unique("life")).await;
}

#[tokio::test]
async fn test_increment_unknown_id_is_noop() {
    for (name, storage) in fresh_backends().await {
        storage.create("known", "https://example.com").await.unwrap();
        storage.increment_access_count("unknown").await.unwrap();

        let known = storage.get("known").await.unwrap().unwrap();
        assert_eq!(known.access_count, 0, "{name}");
        assert!(storage.get("unknown").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_list_in_insertion_order() {
    for (name, storage) in fresh_backends().await {
        for id in ["c", "a", "b"] {
            storage
                .create(id, &format!("https://{id}.example"))
                .await
                .unwrap();
        }

        let ids = storage
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.short_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "a", "b"], "{name}");
    }
}

#[tokio::test]
async fn test_stats_by_hostname() {
    for (name, storage) in fresh_backends().await {
        storage.create("x", "http://a.com/x").await.unwrap();
        storage.create("y", "http://a.com/y").await.unwrap();
        storage.create("z", "https://b.com/z").await.unwrap();

        let all = storage.stats_by_hostname(None).await.unwrap();
        assert_eq!(
            all,
            vec![
                HostnameCount {
                    hostname: "a.com".to_string(),
                    count: 2
                },
                HostnameCount {
                    hostname: "b.com".to_string(),
                    count: 1
                },
            ],
            "{name}"
        );

        let filtered = storage.stats_by_hostname(Some("a.com")).await.unwrap();
        assert_eq!(
            filtered,
            vec![HostnameCount {
                hostname: "a.com".to_string(),
                count: 2
            }],
            "{name}"
        );

        // Filter is an exact, case-sensitive match
        assert!(storage
            .stats_by_hostname(Some("A.COM"))
            .await
            .unwrap()
            .is_empty());
        assert!(storage
            .stats_by_hostname(Some("a.co"))
            .await
            .unwrap()
            .is_empty());
    }
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    for (name, storage) in fresh_backends().await {
        assert!(storage.stats_by_hostname(None).await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_stats_by_hostname_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };

    let host = format!("{}.example", unique("h"));
    storage
        .create(&unique("s1"), &format!("http://{host}/x"))
        .await
        .unwrap();
    storage
        .create(&unique("s2"), &format!("https://{host}"))
        .await
        .unwrap();

    let stats = storage.stats_by_hostname(Some(&host)).await.unwrap();
    assert_eq!(
        stats,
        vec![HostnameCount {
            hostname: host.clone(),
            count: 2
        }]
    );
}
