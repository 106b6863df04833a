pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use mysql::MySqlStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use trait_def::{StoreError, StoreResult, VisitorStore};

use anyhow::Result;
use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseConfig};

/// Create the pool for the configured backend; nothing is connected until first use
pub fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn VisitorStore>> {
    let store: Arc<dyn VisitorStore> = match config.backend {
        DatabaseBackend::Sqlite => Arc::new(SqliteStore::new(&config.url, config.max_connections)?),
        DatabaseBackend::Postgres => {
            Arc::new(PostgresStore::new(&config.url, config.max_connections)?)
        }
        DatabaseBackend::Mysql => Arc::new(MySqlStore::new(&config.url, config.max_connections)?),
    };
    Ok(store)
}
