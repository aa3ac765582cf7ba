//! HTTP/WebSocket API surface

pub mod events;
pub mod health;
pub mod sales;
pub mod shoes;

use axum::{
    Router,
    routing::{any, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::state::ServerState;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/shoes", get(shoes::list_shoes))
        .route("/api/shoes/{id}", get(shoes::get_shoe))
        .route("/api/sales", post(sales::create_sale).get(sales::list_sales))
        .route("/api/sales/dashboard", get(sales::dashboard))
        .route("/api/events/ws", any(events::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
