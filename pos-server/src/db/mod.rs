//! Local SQLite store for sale records.
//!
//! Inventory quantities are never persisted here; the IMS stays
//! authoritative and the bridge is only a relay.

pub mod models;
pub mod repository;

use sqlx::SqlitePool;

use crate::utils::AppError;

/// Create the schema if it does not exist yet.
pub async fn init(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sale_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            total_amount REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sale_transaction_details (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL REFERENCES sale_transactions(id),
            item_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            price_at_sale REAL NOT NULL,
            subtotal REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sale_details_transaction
         ON sale_transaction_details(transaction_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
