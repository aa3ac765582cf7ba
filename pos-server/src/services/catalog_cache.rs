//! Read-through catalog cache.
//!
//! Catalog data lives in the IMS; this cache keeps the last good snapshot
//! so listings keep working through an IMS outage. Every read refreshes
//! from upstream first and falls back to the cached copy when the fetch
//! fails.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ims_bridge::InventoryBridge;
use shared::CatalogItem;

pub struct CatalogCache {
    bridge: Arc<InventoryBridge>,
    items: RwLock<HashMap<i64, CatalogItem>>,
}

impl CatalogCache {
    pub fn new(bridge: Arc<InventoryBridge>) -> Self {
        Self {
            bridge,
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Warm the cache at startup. A failed fetch is logged and left for the
    /// next read to retry.
    pub async fn prime(&self) {
        match self.bridge.catalog().fetch_all().await {
            Ok(items) => {
                self.store(items);
                tracing::info!(count = self.len(), "catalog cache primed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog prime failed, starting with empty cache");
            }
        }
    }

    /// All known items, refreshed from upstream when reachable.
    pub async fn list(&self) -> Vec<CatalogItem> {
        match self.bridge.catalog().fetch_all().await {
            Ok(items) => {
                self.store(items);
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog refresh failed, serving cached items");
            }
        }
        let guard = self.items.read().unwrap();
        let mut items: Vec<CatalogItem> = guard.values().cloned().collect();
        items.sort_by_key(|item| item.id);
        items
    }

    /// One item by id. Unknown ids yield a placeholder so callers can keep
    /// rendering sale history for delisted products.
    pub async fn get(&self, id: i64) -> CatalogItem {
        if let Some(item) = self.cached(id) {
            return item;
        }
        match self.bridge.catalog().fetch_item(id).await {
            Ok(item) => {
                self.items.write().unwrap().insert(item.id, item.clone());
                item
            }
            Err(e) => {
                tracing::debug!(item_id = id, error = %e, "catalog lookup failed");
                CatalogItem::unknown(id)
            }
        }
    }

    /// One item by id, without the placeholder fallback.
    pub async fn try_get(&self, id: i64) -> Option<CatalogItem> {
        if let Some(item) = self.cached(id) {
            return Some(item);
        }
        match self.bridge.catalog().fetch_item(id).await {
            Ok(item) => {
                self.items.write().unwrap().insert(item.id, item.clone());
                Some(item)
            }
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, id: i64) -> Option<CatalogItem> {
        self.items.read().unwrap().get(&id).cloned()
    }

    fn store(&self, items: Vec<CatalogItem>) {
        let mut guard = self.items.write().unwrap();
        for item in items {
            guard.insert(item.id, item);
        }
    }
}
