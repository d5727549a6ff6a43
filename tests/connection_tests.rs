//! Lazy open, reuse and reset of the shared database handle.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use paycheck::config::DatabaseConfig;
use paycheck::connection::ConnectionProvider;
use paycheck::database::Database;

fn memory_config() -> DatabaseConfig {
    DatabaseConfig {
        db_type: "sqlite".to_string(),
        sqlite_url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    }
}

#[tokio::test]
async fn handle_is_opened_lazily_and_reused() {
    let provider = ConnectionProvider::new(memory_config());
    assert!(!provider.is_connected().await);

    let first = provider
        .get_connection()
        .await
        .expect("in-memory sqlite should open");
    assert!(provider.is_connected().await);
    assert_eq!(first.kind(), "sqlite");

    let second = provider
        .get_connection()
        .await
        .expect("cached handle should be returned");
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn reset_forces_a_new_handle() {
    let provider = ConnectionProvider::new(memory_config());

    let first = provider.get_connection().await.expect("open");
    provider.reset().await;
    assert!(!provider.is_connected().await);

    let second = provider.get_connection().await.expect("reopen");
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn invalidate_only_drops_the_matching_handle() {
    let provider = ConnectionProvider::new(memory_config());

    let stale = provider.get_connection().await.expect("open");
    assert!(provider.invalidate(&stale).await);
    assert!(!provider.is_connected().await);

    let fresh = provider.get_connection().await.expect("reopen");
    assert!(!provider.invalidate(&stale).await);
    assert!(provider.is_connected().await);

    assert!(provider.invalidate(&fresh).await);
}

#[tokio::test]
async fn open_failure_returns_none() {
    let config = DatabaseConfig {
        sqlite_url: "sqlite:///nonexistent-paycheck-dir/paycheck.db".to_string(),
        ..memory_config()
    };
    let provider = ConnectionProvider::new(config);

    assert!(provider.get_connection().await.is_none());
    assert!(!provider.is_connected().await);
}

#[tokio::test]
async fn unknown_backend_returns_none() {
    let config = DatabaseConfig {
        db_type: "oracle".to_string(),
        ..memory_config()
    };
    let provider = ConnectionProvider::new(config);

    assert!(provider.get_connection().await.is_none());
    assert!(!provider.is_connected().await);
}

#[tokio::test]
async fn seeded_handle_is_returned_without_opening() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open");

    // The configured URL would fail; the seeded handle must be used instead.
    let config = DatabaseConfig {
        db_type: "oracle".to_string(),
        ..memory_config()
    };
    let provider = ConnectionProvider::with_database(config, Database::SQLite(pool));

    assert!(provider.is_connected().await);
    assert!(provider.get_connection().await.is_some());
}

#[tokio::test]
async fn concurrent_first_access_opens_one_handle() {
    let provider = Arc::new(ConnectionProvider::new(memory_config()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get_connection().await })
        })
        .collect();

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.expect("task panicked").expect("open"));
    }

    let first = &handles[0];
    assert!(handles.iter().all(|h| Arc::ptr_eq(first, h)));
}
