//! Catalog read endpoints, served from the bulk-sync cache.

use axum::{
    Json,
    extract::{Path, State},
};
use shared::CatalogItem;

use crate::core::state::ServerState;
use crate::utils::{AppError, AppResponse, ok};

pub async fn list_shoes(
    State(state): State<ServerState>,
) -> Result<Json<AppResponse<Vec<CatalogItem>>>, AppError> {
    Ok(ok(state.catalog.list().await))
}

pub async fn get_shoe(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<AppResponse<CatalogItem>>, AppError> {
    match state.catalog.try_get(id).await {
        Some(item) => Ok(ok(item)),
        None => Err(AppError::NotFound(format!("shoe {id} not found"))),
    }
}
