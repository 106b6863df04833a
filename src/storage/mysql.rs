use crate::models::{NewVisitor, VisitorRecord};
use crate::storage::{StoreResult, VisitorStore};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::migrate::MigrateDatabase;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool};
use std::sync::Arc;
use tracing::info;

pub struct MySqlStore {
    url: String,
    pool: Arc<MySqlPool>,
}

impl MySqlStore {
    pub fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        Ok(Self {
            url: database_url.to_string(),
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl VisitorStore for MySqlStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        if !MySql::database_exists(&self.url).await? {
            MySql::create_database(&self.url).await?;
            info!("Created MySQL database");
        }

        // MySQL has no CREATE INDEX IF NOT EXISTS, so the index lives in the table definition
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visitors (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                ip_address VARCHAR(45) NOT NULL,
                country VARCHAR(100) NOT NULL,
                state VARCHAR(100) NOT NULL,
                city VARCHAR(100) NOT NULL,
                isp VARCHAR(255) NOT NULL,
                browser_name VARCHAR(100) NOT NULL,
                operating_system VARCHAR(100) NOT NULL,
                device_type VARCHAR(50) NOT NULL,
                screen_resolution VARCHAR(50) NOT NULL,
                visit_time TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
                INDEX idx_visitors_visit_time (visit_time)
            ) CHARACTER SET utf8mb4
            "#,
        )
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
