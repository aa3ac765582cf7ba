//! Sale endpoints

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::core::state::ServerState;
use crate::services::sales::{self, SaleLine};
use crate::utils::{AppError, AppResponse, ok};

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub items: Vec<SaleLine>,
}

pub async fn create_sale(
    State(state): State<ServerState>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<Response, AppError> {
    let created = sales::create_sale(&state, &req.items).await?;
    Ok((StatusCode::CREATED, ok(created)).into_response())
}

pub async fn list_sales(
    State(state): State<ServerState>,
) -> Result<Json<AppResponse<Vec<sales::SaleView>>>, AppError> {
    Ok(ok(sales::list_sales(&state).await?))
}

pub async fn dashboard(
    State(state): State<ServerState>,
) -> Result<Json<AppResponse<sales::DashboardStats>>, AppError> {
    Ok(ok(sales::dashboard_stats(&state).await?))
}
