use std::sync::Arc;

use arbor_core::config::HierarchyConfig;
use arbor_core::lifecycle::EntityLifecycle;
use arbor_db::store::{PgEntityTransaction, PgHierarchyStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: the pool is reference-counted and the config sits behind
/// an `Arc`. Nothing permission-related is cached here.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: arbor_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn hierarchy(&self) -> &HierarchyConfig {
        &self.config.hierarchy
    }

    /// Pool-backed store for permission checks and reads.
    pub fn reader(&self) -> PgHierarchyStore {
        PgHierarchyStore::new(self.pool.clone())
    }

    /// Open a write transaction holding the structural lock.
    pub async fn writer(&self) -> Result<PgEntityTransaction, sqlx::Error> {
        PgEntityTransaction::begin(&self.pool).await
    }

    pub fn lifecycle(&self) -> EntityLifecycle {
        EntityLifecycle::new(self.config.hierarchy)
    }
}
