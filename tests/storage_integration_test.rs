// Integration tests for the visitor stores
// SQLite always runs; PostgreSQL and MySQL run when a test URL is exported

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use visitor_tracker::models::NewVisitor;
use visitor_tracker::storage::{MySqlStore, PostgresStore, SqliteStore, VisitorStore};

/// Check if we should run tests for a specific backend
fn should_test_backend(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|url| !url.is_empty())
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn sample_visit(screen_resolution: &str) -> NewVisitor {
    NewVisitor {
        ip_address: "203.0.113.5".to_string(),
        country: "US".to_string(),
        state: "CA".to_string(),
        city: "Mountain View".to_string(),
        isp: "Google".to_string(),
        browser_name: "Chrome 120.0.0.0".to_string(),
        operating_system: "Windows 10".to_string(),
        device_type: "Desktop".to_string(),
        screen_resolution: screen_resolution.to_string(),
    }
}

async fn create_memory_store() -> SqliteStore {
    let storage = SqliteStore::new("sqlite::memory:", 1).unwrap();
    storage.ensure_schema().await.unwrap();
    storage
}

#[tokio::test]
async fn test_sqlite_append_and_list() {
    let storage = create_memory_store().await;

    assert!(storage.list_all().await.unwrap().is_empty());

    let visit = sample_visit("1920x1080");
    storage.append(&visit).await.unwrap();

    let visitors = storage.list_all().await.unwrap();
    assert_eq!(visitors.len(), 1);

    let record = &visitors[0];
    assert!(record.id > 0);
    assert_eq!(record.ip_address, visit.ip_address);
    assert_eq!(record.country, visit.country);
    assert_eq!(record.state, visit.state);
    assert_eq!(record.city, visit.city);
    assert_eq!(record.isp, visit.isp);
    assert_eq!(record.browser_name, visit.browser_name);
    assert_eq!(record.operating_system, visit.operating_system);
    assert_eq!(record.device_type, visit.device_type);
    assert_eq!(record.screen_resolution, visit.screen_resolution);
}

#[tokio::test]
async fn test_sqlite_visit_time_assigned_by_store() {
    let storage = create_memory_store().await;
    let before = chrono::Utc::now() - chrono::Duration::seconds(5);

    storage.append(&sample_visit("800x600")).await.unwrap();

    let visitors = storage.list_all().await.unwrap();
    let visit_time = visitors[0].visit_time;
    assert!(visit_time >= before);
    assert!(visit_time <= chrono::Utc::now() + chrono::Duration::seconds(5));
}

#[tokio::test]
async fn test_sqlite_list_most_recent_first() {
    let storage = create_memory_store().await;

    for resolution in ["1", "2", "3", "4", "5"] {
        storage.append(&sample_visit(resolution)).await.unwrap();
    }

    let visitors = storage.list_all().await.unwrap();
    assert_eq!(visitors.len(), 5);

    assert!(visitors
        .windows(2)
        .all(|w| w[0].visit_time >= w[1].visit_time));
    assert!(visitors.windows(2).all(|w| w[0].id > w[1].id));
    assert_eq!(visitors[0].screen_resolution, "5");
    assert_eq!(visitors[4].screen_resolution, "1");
}

#[tokio::test]
async fn test_sqlite_ensure_schema_is_idempotent() {
    let storage = create_memory_store().await;
    storage.append(&sample_visit("1280x720")).await.unwrap();

    for _ in 0..3 {
        storage.ensure_schema().await.unwrap();
    }

    let visitors = storage.list_all().await.unwrap();
    assert_eq!(visitors.len(), 1, "provisioning must not drop existing rows");
    assert_eq!(visitors[0].screen_resolution, "1280x720");
}

#[tokio::test]
async fn test_sqlite_creates_missing_database_file() {
    let path = std::env::temp_dir().join(format!(
        "visitor-tracker-test-{}-{}.db",
        std::process::id(),
        unique_suffix()
    ));
    assert!(!path.exists());

    let url = format!("sqlite://{}", path.display());
    let storage = SqliteStore::new(&url, 2).unwrap();
    storage.ensure_schema().await.unwrap();
    assert!(path.exists());

    storage.append(&sample_visit("1366x768")).await.unwrap();
    storage.ensure_schema().await.unwrap();
    assert_eq!(storage.list_all().await.unwrap().len(), 1);

    drop(storage);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_sqlite_ping() {
    let storage = create_memory_store().await;
    storage.ping().await.unwrap();
}

#[tokio::test]
async fn test_sqlite_concurrent_appends() {
    let storage: Arc<dyn VisitorStore> = Arc::new(create_memory_store().await);

    let mut handles = vec![];
    for i in 0..25 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage.append(&sample_visit(&format!("{i}x{i}"))).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let visitors = storage.list_all().await.unwrap();
    assert_eq!(visitors.len(), 25);
}

async fn exercise_server_backend(storage: &dyn VisitorStore) {
    // Provision twice against a database that may already hold rows
    storage.ensure_schema().await.unwrap();
    storage.ensure_schema().await.unwrap();
    storage.ping().await.unwrap();

    let marker = format!("t{}", unique_suffix() % 1_000_000_000);
    storage.append(&sample_visit(&marker)).await.unwrap();

    let visitors = storage.list_all().await.unwrap();
    assert!(visitors.iter().any(|v| v.screen_resolution == marker));
    assert!(visitors
        .windows(2)
        .all(|w| w[0].visit_time >= w[1].visit_time));
}

#[tokio::test]
async fn test_postgres_backend() {
    let Some(url) = should_test_backend("TEST_POSTGRES_URL") else {
        eprintln!("Skipping PostgreSQL test (set TEST_POSTGRES_URL to run)");
        return;
    };

    let storage = PostgresStore::new(&url, 5).unwrap();
    exercise_server_backend(&storage).await;
}

#[tokio::test]
async fn test_mysql_backend() {
    let Some(url) = should_test_backend("TEST_MYSQL_URL") else {
        eprintln!("Skipping MySQL test (set TEST_MYSQL_URL to run)");
        return;
    };

    let storage = MySqlStore::new(&url, 5).unwrap();
    exercise_server_backend(&storage).await;
}
