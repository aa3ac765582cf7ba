//! Catalog cache behavior against a stub catalog HTTP endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, extract::Path, routing::get};
use ims_bridge::{BridgeConfig, InventoryBridge};
use pos_server::services::catalog_cache::CatalogCache;
use serde_json::json;

async fn start_catalog_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/api/Shoes",
            get(|| async {
                Json(json!({"data": [
                    {"id": 1, "brand": "Nike", "model": "Dunk", "currentStock": 4},
                    {"id": 2, "brand": "Adidas", "model": "Samba", "currentStock": 9},
                ]}))
            }),
        )
        .route(
            "/api/Shoes/{id}",
            get(|Path(id): Path<i64>| async move {
                Json(json!({"id": id, "brand": "NB", "model": "550"}))
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn cache_against(addr: SocketAddr) -> CatalogCache {
    let config = BridgeConfig::default().with_http_base_url(format!("http://{addr}"));
    CatalogCache::new(Arc::new(InventoryBridge::new(config)))
}

#[tokio::test]
async fn fetch_failure_serves_the_cached_snapshot() {
    let (addr, server) = start_catalog_server().await;
    let cache = cache_against(addr);

    cache.prime().await;
    assert_eq!(cache.len(), 2);

    // Upstream goes away; the cache keeps the last good snapshot
    server.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let items = cache.list().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].brand, "Nike");
    assert_eq!(items[1].brand, "Adidas");

    let cached = cache.get(2).await;
    assert_eq!(cached.brand, "Adidas");
}

#[tokio::test]
async fn unknown_item_degrades_to_placeholder_when_upstream_is_down() {
    let (addr, server) = start_catalog_server().await;
    let cache = cache_against(addr);
    cache.prime().await;

    server.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let ghost = cache.get(99).await;
    assert_eq!(ghost.id, 99);
    assert_eq!(ghost.brand, "Unknown");
    // The placeholder is not stored; the map still holds the primed items
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn single_item_lookup_fills_the_cache() {
    let (addr, server) = start_catalog_server().await;
    let cache = cache_against(addr);
    assert!(cache.is_empty());

    let item = cache.try_get(3).await.expect("upstream is reachable");
    assert_eq!(item.model, "550");
    assert_eq!(cache.len(), 1);

    // A repeat lookup is served from the map even with upstream gone
    server.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get(3).await.model, "550");
}
