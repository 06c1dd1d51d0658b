//! Database operations for the supplier catalog.

use chrono::{DateTime, Utc};
use rakuda_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::RepositoryError;

/// A product sourced from a supplier, priced in whole yen.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Internal stock-keeping unit.
    pub sku: String,
    /// Supplier-facing title.
    pub title: String,
    /// Acquisition cost in JPY (zero-decimal).
    pub cost_jpy: Decimal,
    /// Units on hand.
    pub stock_quantity: i32,
    /// Stock level at or below which the product appears in alerts.
    pub low_stock_threshold: i32,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A product at or below its low-stock threshold.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LowStockProduct {
    /// Product ID.
    pub id: ProductId,
    /// Stock-keeping unit.
    pub sku: String,
    /// Title.
    pub title: String,
    /// Acquisition cost in JPY, for restock decisions.
    pub cost_jpy: Decimal,
    /// Units on hand.
    pub stock_quantity: i32,
    /// Alert threshold.
    pub low_stock_threshold: i32,
    /// Live listings that will oversell if the product runs out.
    pub active_listings: i64,
}

const PRODUCT_COLUMNS: &str =
    "id, sku, title, cost_jpy, stock_quantity, low_stock_threshold, created_at, updated_at";

/// Get a product by ID.
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn get(pool: &PgPool, id: ProductId) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(&format!(
        r"
        SELECT {PRODUCT_COLUMNS}
        FROM products
        WHERE id = $1
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Products at or below their low-stock threshold with live listing counts.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn low_stock(pool: &PgPool) -> Result<Vec<LowStockProduct>, RepositoryError> {
    let products = sqlx::query_as::<_, LowStockProduct>(
        r"
        SELECT
            p.id, p.sku, p.title, p.cost_jpy, p.stock_quantity, p.low_stock_threshold,
            COUNT(l.id) FILTER (WHERE l.status = 'active') AS active_listings
        FROM products p
        LEFT JOIN listings l ON l.product_id = p.id
        WHERE p.stock_quantity <= p.low_stock_threshold
        GROUP BY p.id
        ORDER BY p.stock_quantity ASC, p.sku
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Count of products at or below their low-stock threshold.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn count_low_stock(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE stock_quantity <= low_stock_threshold",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
