//! Database row types

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One committed sale.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleTransaction {
    pub id: i64,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// One line item of a sale.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub id: i64,
    pub transaction_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub price_at_sale: f64,
    pub subtotal: f64,
}

/// Line item of a sale about to be written.
#[derive(Debug, Clone)]
pub struct NewSaleLine {
    pub item_id: i64,
    pub quantity: i64,
    pub price: f64,
}

impl NewSaleLine {
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}
