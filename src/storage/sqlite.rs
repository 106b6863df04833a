use crate::models::{NewVisitor, VisitorRecord};
use crate::storage::{StoreResult, VisitorStore};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;

pub struct SqliteStore {
    url: String,
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        Ok(Self {
            url: database_url.to_string(),
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl VisitorStore for SqliteStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        if !Sqlite::database_exists(&self.url).await? {
            Sqlite::create_database(&self.url).await?;
            info!("Created SQLite database {}", self.url);
        }

        // Millisecond precision keeps visit_time ordering meaningful
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visitors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip_address VARCHAR(45) NOT NULL,
                country VARCHAR(100) NOT NULL,
                state VARCHAR(100) NOT NULL,
                city VARCHAR(100) NOT NULL,
                isp VARCHAR(255) NOT NULL,
                browser_name VARCHAR(100) NOT NULL,
                operating_system VARCHAR(100) NOT NULL,
                device_type VARCHAR(50) NOT NULL,
                screen_resolution VARCHAR(50) NOT NULL,
                visit_time DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_visitors_visit_time ON visitors(visit_time)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn append(&self, visit: &NewVisitor) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO visitors (ip_address, country, state, city, isp, browser_name, operating_system, device_type, screen_resolution)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&visit.ip_address)
        .bind(&visit.country)
        .bind(&visit.state)
        .bind(&visit.city)
        .bind(&visit.isp)
        .bind(&visit.browser_name)
        .bind(&visit.operating_system)
        .bind(&visit.device_type)
        .bind(&visit.screen_resolution)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<VisitorRecord>> {
        let visitors = sqlx::query_as::<_, VisitorRecord>(
            r#"
            SELECT id, ip_address, country, state, city, isp, browser_name, operating_system,
                   device_type, screen_resolution, visit_time
            FROM visitors
            ORDER BY visit_time DESC, id DESC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(visitors)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
