//! Database operations for marketplace orders.

use chrono::{DateTime, Utc};
use rakuda_core::{ListingId, Marketplace, OrderId, OrderStatus, ShipmentId};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// An order placed against a listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Listing the order was placed against.
    pub listing_id: ListingId,
    /// Marketplace-side order identifier.
    pub external_id: Option<String>,
    /// Buyer's marketplace username.
    pub buyer_username: String,
    /// Units ordered.
    pub quantity: i32,
    /// Sale price per unit in USD.
    pub sale_price_usd: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// When payment cleared.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating an order.
pub struct NewOrder {
    /// Listing the order is against.
    pub listing_id: ListingId,
    /// Marketplace-side order identifier.
    pub external_id: Option<String>,
    /// Buyer's username.
    pub buyer_username: String,
    /// Units ordered.
    pub quantity: i32,
    /// Sale price per unit in USD.
    pub sale_price_usd: Decimal,
}

/// Everything the messaging service needs to render a template for an order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderContext {
    /// Order ID.
    pub order_id: OrderId,
    /// Marketplace-side order identifier.
    pub order_external_id: Option<String>,
    /// Buyer's username.
    pub buyer_username: String,
    /// Listing title.
    pub item_title: String,
    /// Marketplace the order came from.
    pub marketplace: Marketplace,
    /// Units ordered.
    pub quantity: i32,
    /// Order status.
    pub status: OrderStatus,
    /// Shipment ID, once one exists.
    pub shipment_id: Option<ShipmentId>,
    /// Carrier, once processed.
    pub carrier: Option<String>,
    /// Tracking number, once processed.
    pub tracking_number: Option<String>,
}

/// Month-to-date order totals for the dashboard.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct MonthToDate {
    /// Non-cancelled orders created this month.
    pub orders: i64,
    /// Revenue (price x quantity) over those orders, USD.
    pub revenue_usd: Decimal,
}

const ORDER_COLUMNS: &str = "id, listing_id, external_id, buyer_username, quantity, \
     sale_price_usd, status, paid_at, created_at, updated_at";

/// Create a new order in `pending` state.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn create(pool: &PgPool, params: NewOrder) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        INSERT INTO orders (listing_id, external_id, buyer_username, quantity, sale_price_usd)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(params.listing_id)
    .bind(&params.external_id)
    .bind(&params.buyer_username)
    .bind(params.quantity)
    .bind(params.sale_price_usd)
    .fetch_one(pool)
    .await?;

    Ok(order)
}

/// Mark an order paid and open its pending shipment, atomically.
///
/// A paid order is exactly what the shipment backlog tracks, so the
/// shipment row is created in the same transaction.
///
/// # Errors
///
/// Returns `NotFound` if the order does not exist, `Conflict` if the
/// order is not in `pending` state.
pub async fn mark_paid(pool: &PgPool, id: OrderId) -> Result<Order, RepositoryError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders
        SET status = 'paid', paid_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(order) = order else {
        // Distinguish a missing order from one in the wrong state.
        let exists: Option<(OrderStatus,)> =
            sqlx::query_as("SELECT status FROM orders WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        return match exists {
            Some((status,)) => Err(RepositoryError::Conflict(format!(
                "order {id} is {status:?}, expected Pending"
            ))),
            None => Err(RepositoryError::NotFound),
        };
    };

    sqlx::query("INSERT INTO shipments (order_id) VALUES ($1)")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(order)
}

/// Context row for rendering buyer messages.
///
/// # Errors
///
/// Returns `NotFound` if the order does not exist.
pub async fn context(pool: &PgPool, id: OrderId) -> Result<OrderContext, RepositoryError> {
    sqlx::query_as::<_, OrderContext>(
        r"
        SELECT
            o.id AS order_id, o.external_id AS order_external_id,
            o.buyer_username, l.title AS item_title, l.marketplace,
            o.quantity, o.status,
            s.id AS shipment_id, s.carrier, s.tracking_number
        FROM orders o
        JOIN listings l ON l.id = o.listing_id
        LEFT JOIN shipments s ON s.order_id = o.id
        WHERE o.id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Month-to-date order count and revenue, excluding cancellations.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn month_to_date(pool: &PgPool) -> Result<MonthToDate, RepositoryError> {
    let totals = sqlx::query_as::<_, MonthToDate>(
        r"
        SELECT
            COUNT(*) AS orders,
            COALESCE(SUM(sale_price_usd * quantity), 0) AS revenue_usd
        FROM orders
        WHERE created_at >= date_trunc('month', NOW())
          AND status <> 'cancelled'
        ",
    )
    .fetch_one(pool)
    .await?;

    Ok(totals)
}
