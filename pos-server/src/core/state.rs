//! Shared server state
//!
//! One explicitly constructed instance owns the database pool, the
//! inventory bridge and the catalog cache; handlers receive clones.

use std::str::FromStr;
use std::sync::Arc;

use ims_bridge::InventoryBridge;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::core::config::Config;
use crate::services::catalog_cache::CatalogCache;
use crate::utils::AppError;

#[derive(Clone)]
pub struct ServerState {
    pub pool: SqlitePool,
    pub bridge: Arc<InventoryBridge>,
    pub catalog: Arc<CatalogCache>,
}

impl ServerState {
    /// Build the full state: open the pool, run the schema, construct the
    /// bridge and prime the catalog cache (best-effort).
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| AppError::Database(format!("invalid DATABASE_URL: {e}")))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("open database: {e}")))?;
        crate::db::init(&pool).await?;

        let bridge = Arc::new(InventoryBridge::new(config.bridge.clone()));
        let catalog = Arc::new(CatalogCache::new(bridge.clone()));
        catalog.prime().await;

        Ok(Self {
            pool,
            bridge,
            catalog,
        })
    }
}
