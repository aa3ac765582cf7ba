//! Sale creation workflow.
//!
//! Stock is validated against the IMS for every line item before the local
//! transaction is written; any shortfall rejects the whole sale. After a
//! successful commit the stock decrement is pushed best-effort: a failure
//! there is logged, never rolled back, because the quantities were
//! validated pre-commit. This is an accepted eventual-consistency gap; a
//! durable reconciliation queue is out of scope for this service.

use serde::{Deserialize, Serialize};

use crate::core::state::ServerState;
use crate::db::models::{NewSaleLine, SaleDetail, SaleTransaction};
use crate::db::repository::sale;
use crate::utils::AppError;

/// One requested line item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub item_id: i64,
    pub quantity: i64,
    pub price: f64,
}

/// A committed sale as returned to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSale {
    #[serde(flatten)]
    pub sale: SaleTransaction,
    pub items: Vec<SaleDetail>,
}

/// Create a sale: validate stock upstream, commit locally, then decrement
/// stock upstream best-effort.
pub async fn create_sale(
    state: &ServerState,
    lines: &[SaleLine],
) -> Result<CreatedSale, AppError> {
    if lines.is_empty() {
        return Err(AppError::Validation("sale has no line items".into()));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "invalid quantity {} for item {}",
                line.quantity, line.item_id
            )));
        }
    }

    // (a) Validate every line against live IMS stock before any local write.
    for line in lines {
        let available = state.bridge.query_stock(line.item_id).await?;
        if available < line.quantity {
            return Err(AppError::Validation(format!(
                "Insufficient stock for item {}. Available: {}, Requested: {}",
                line.item_id, available, line.quantity
            )));
        }
    }

    let new_lines: Vec<NewSaleLine> = lines
        .iter()
        .map(|line| NewSaleLine {
            item_id: line.item_id,
            quantity: line.quantity,
            price: line.price,
        })
        .collect();
    let total: f64 = new_lines.iter().map(NewSaleLine::subtotal).sum();

    // (b) Local transactional write.
    let (sale, items) = sale::insert_sale(&state.pool, total, &new_lines).await?;
    tracing::info!(sale_id = sale.id, total, "sale committed");

    // (c) Best-effort post-commit stock decrement.
    for line in lines {
        if let Err(e) = state.bridge.update_stock(line.item_id, -line.quantity).await {
            tracing::warn!(
                item_id = line.item_id,
                quantity = line.quantity,
                error = %e,
                "post-commit stock update failed; stock was validated pre-commit"
            );
        }
    }

    Ok(CreatedSale { sale, items })
}

/// A sale with its line items, enriched with catalog data when available.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: SaleTransaction,
    pub details: Vec<SaleDetailView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetailView {
    #[serde(flatten)]
    pub detail: SaleDetail,
    pub item: shared::CatalogItem,
}

/// List all sales, newest first, with catalog enrichment. Items the IMS no
/// longer reports come back as "Unknown" placeholders instead of failing
/// the listing.
pub async fn list_sales(state: &ServerState) -> Result<Vec<SaleView>, AppError> {
    let sales = sale::list_sales(&state.pool).await?;
    let mut views = Vec::with_capacity(sales.len());
    for sale_row in sales {
        views.push(enrich(state, sale_row).await?);
    }
    Ok(views)
}

/// Dashboard aggregation over local sale records.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_sales: f64,
    pub transaction_count: i64,
    pub top_product: Option<TopProduct>,
    pub recent_transactions: Vec<SaleView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub total_sold: i64,
}

pub async fn dashboard_stats(state: &ServerState) -> Result<DashboardStats, AppError> {
    let (total_sales, transaction_count) = sale::totals(&state.pool).await?;

    let top_product = match sale::top_item(&state.pool).await? {
        Some((item_id, total_sold)) => {
            let item = state.catalog.get(item_id).await;
            Some(TopProduct {
                id: item_id,
                brand: item.brand,
                model: item.model,
                total_sold,
            })
        }
        None => None,
    };

    let mut recent_transactions = Vec::new();
    for sale_row in sale::recent_sales(&state.pool, 5).await? {
        recent_transactions.push(enrich(state, sale_row).await?);
    }

    Ok(DashboardStats {
        total_sales,
        transaction_count,
        top_product,
        recent_transactions,
    })
}

async fn enrich(state: &ServerState, sale_row: SaleTransaction) -> Result<SaleView, AppError> {
    let details = sale::details_for(&state.pool, sale_row.id).await?;
    let mut views = Vec::with_capacity(details.len());
    for detail in details {
        let item = state.catalog.get(detail.item_id).await;
        views.push(SaleDetailView { detail, item });
    }
    Ok(SaleView {
        sale: sale_row,
        details: views,
    })
}
