use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewVisitor, VisitorRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait VisitorStore: Send + Sync {
    /// Create the database and the `visitors` table if they are missing.
    /// Safe to run on every startup; existing rows are never touched.
    async fn ensure_schema(&self) -> StoreResult<()>;

    /// Insert one visit; `id` and `visit_time` are assigned by the database
    async fn append(&self, visit: &NewVisitor) -> StoreResult<()>;

    /// Every visit, most recent first
    async fn list_all(&self) -> StoreResult<Vec<VisitorRecord>>;

    /// Round-trip to the database
    async fn ping(&self) -> StoreResult<()>;
}
