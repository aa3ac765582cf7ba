//! Sale record repository

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{NewSaleLine, SaleDetail, SaleTransaction};

/// Insert a sale with its details in one transaction.
pub async fn insert_sale(
    pool: &SqlitePool,
    total_amount: f64,
    lines: &[NewSaleLine],
) -> Result<(SaleTransaction, Vec<SaleDetail>), sqlx::Error> {
    let created_at = Utc::now();
    let mut tx = pool.begin().await?;

    let sale_id = sqlx::query(
        "INSERT INTO sale_transactions (total_amount, status, created_at) VALUES (?, ?, ?)",
    )
    .bind(total_amount)
    .bind("completed")
    .bind(created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let mut details = Vec::with_capacity(lines.len());
    for line in lines {
        let detail_id = sqlx::query(
            "INSERT INTO sale_transaction_details
             (transaction_id, item_id, quantity, price_at_sale, subtotal)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(sale_id)
        .bind(line.item_id)
        .bind(line.quantity)
        .bind(line.price)
        .bind(line.subtotal())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        details.push(SaleDetail {
            id: detail_id,
            transaction_id: sale_id,
            item_id: line.item_id,
            quantity: line.quantity,
            price_at_sale: line.price,
            subtotal: line.subtotal(),
        });
    }

    tx.commit().await?;

    let sale = SaleTransaction {
        id: sale_id,
        total_amount,
        status: "completed".into(),
        created_at,
    };
    Ok((sale, details))
}

/// All sales, newest first.
pub async fn list_sales(pool: &SqlitePool) -> Result<Vec<SaleTransaction>, sqlx::Error> {
    sqlx::query_as::<_, SaleTransaction>(
        "SELECT id, total_amount, status, created_at
         FROM sale_transactions ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
}

/// The most recent sales, newest first.
pub async fn recent_sales(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<SaleTransaction>, sqlx::Error> {
    sqlx::query_as::<_, SaleTransaction>(
        "SELECT id, total_amount, status, created_at
         FROM sale_transactions ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Details of one sale.
pub async fn details_for(
    pool: &SqlitePool,
    transaction_id: i64,
) -> Result<Vec<SaleDetail>, sqlx::Error> {
    sqlx::query_as::<_, SaleDetail>(
        "SELECT id, transaction_id, item_id, quantity, price_at_sale, subtotal
         FROM sale_transaction_details WHERE transaction_id = ? ORDER BY id",
    )
    .bind(transaction_id)
    .fetch_all(pool)
    .await
}

/// Count of sale records.
pub async fn count_sales(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM sale_transactions")
        .fetch_one(pool)
        .await
}

/// Aggregate totals for the dashboard: sum of sale amounts and number of
/// transactions.
pub async fn totals(pool: &SqlitePool) -> Result<(f64, i64), sqlx::Error> {
    sqlx::query_as::<_, (f64, i64)>(
        "SELECT COALESCE(SUM(total_amount), 0.0), COUNT(*) FROM sale_transactions",
    )
    .fetch_one(pool)
    .await
}

/// Best-selling item by total units sold.
pub async fn top_item(pool: &SqlitePool) -> Result<Option<(i64, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT item_id, SUM(quantity) AS total_sold
         FROM sale_transaction_details
         GROUP BY item_id ORDER BY total_sold DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}
