//! Database operations for shipments.
//!
//! One shipment row exists per paid order; the shipment worker drives it
//! through `pending -> processing -> shipped`, or `failed` when the job
//! queue exhausts its retries.

use chrono::{DateTime, Utc};
use rakuda_core::{ListingId, Marketplace, OrderId, ShipmentId, ShipmentStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// A shipment attached to a paid order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Shipment {
    /// Unique shipment ID.
    pub id: ShipmentId,
    /// The order this shipment fulfils.
    pub order_id: OrderId,
    /// Lifecycle status.
    pub status: ShipmentStatus,
    /// Carrier handling the parcel, once processed.
    pub carrier: Option<String>,
    /// Carrier tracking number, once processed.
    pub tracking_number: Option<String>,
    /// When processing finished.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the shipment was created.
    pub created_at: DateTime<Utc>,
    /// When the shipment was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A pending shipment joined with its order, as the backlog endpoint
/// returns it.
#[derive(Debug, Clone, Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct PendingShipment {
    /// Shipment ID.
    pub id: ShipmentId,
    /// Order ID.
    pub order_id: OrderId,
    /// Shipment status (`pending` or `failed`).
    pub status: ShipmentStatus,
    /// Buyer's username.
    pub buyer_username: String,
    /// Listing title.
    pub item_title: String,
    /// Marketplace the order came from.
    pub marketplace: Marketplace,
    /// Units to ship.
    pub quantity: i32,
    /// Sale price per unit in USD.
    pub sale_price_usd: Decimal,
    /// When the order was paid.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Data captured when a shipment completes, for messaging and audit.
#[derive(Debug, Clone)]
pub struct CompletedShipment {
    /// The shipment after the update.
    pub shipment: Shipment,
    /// The listing the order was placed against.
    pub listing_id: ListingId,
    /// Units shipped (stock was decremented by this much).
    pub quantity: i32,
}

const SHIPMENT_COLUMNS: &str =
    "id, order_id, status, carrier, tracking_number, processed_at, created_at, updated_at";

/// Get a shipment by ID.
///
/// # Errors
///
/// Returns `NotFound` if the shipment does not exist.
pub async fn get(pool: &PgPool, id: ShipmentId) -> Result<Shipment, RepositoryError> {
    sqlx::query_as::<_, Shipment>(&format!(
        r"
        SELECT {SHIPMENT_COLUMNS}
        FROM shipments
        WHERE id = $1
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Paid orders awaiting shipment, oldest payment first.
///
/// Includes `failed` shipments so operators can see what needs another
/// attempt after fixing the underlying problem.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_pending(pool: &PgPool) -> Result<Vec<PendingShipment>, RepositoryError> {
    let shipments = sqlx::query_as::<_, PendingShipment>(
        r"
        SELECT
            s.id, s.order_id, s.status, o.buyer_username,
            l.title AS item_title, l.marketplace,
            o.quantity, o.sale_price_usd, o.paid_at
        FROM shipments s
        JOIN orders o ON o.id = s.order_id
        JOIN listings l ON l.id = o.listing_id
        WHERE s.status IN ('pending', 'failed')
        ORDER BY o.paid_at ASC NULLS LAST, s.id
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(shipments)
}

/// Move a shipment into `processing` when its job is claimed.
///
/// Legal from `pending` (first attempt) and from `failed` (operator
/// re-queued it) and is a no-op when already `processing` (retry of a
/// crashed attempt).
///
/// # Errors
///
/// Returns `NotFound` if the shipment does not exist, `Conflict` if it
/// already shipped.
pub async fn mark_processing(pool: &PgPool, id: ShipmentId) -> Result<Shipment, RepositoryError> {
    let shipment = sqlx::query_as::<_, Shipment>(&format!(
        r"
        UPDATE shipments
        SET status = 'processing', updated_at = NOW()
        WHERE id = $1 AND status IN ('pending', 'failed', 'processing')
        RETURNING {SHIPMENT_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match shipment {
        Some(shipment) => Ok(shipment),
        None => {
            let exists: Option<(ShipmentStatus,)> =
                sqlx::query_as("SELECT status FROM shipments WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
            match exists {
                Some((status,)) => Err(RepositoryError::Conflict(format!(
                    "shipment {id} is {status:?}, cannot process"
                ))),
                None => Err(RepositoryError::NotFound),
            }
        }
    }
}

/// Complete a shipment: stamp carrier and tracking, ship the order, and
/// decrement product stock, all in one transaction.
///
/// # Errors
///
/// Returns `NotFound` if the shipment does not exist, `Conflict` if the
/// shipment is not `processing` or stock would go negative.
pub async fn complete(
    pool: &PgPool,
    id: ShipmentId,
    carrier: &str,
    tracking_number: &str,
) -> Result<CompletedShipment, RepositoryError> {
    let mut tx = pool.begin().await?;

    let shipment = sqlx::query_as::<_, Shipment>(&format!(
        r"
        UPDATE shipments
        SET status = 'shipped', carrier = $2, tracking_number = $3,
            processed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'processing'
        RETURNING {SHIPMENT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(carrier)
    .bind(tracking_number)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(shipment) = shipment else {
        return Err(RepositoryError::Conflict(format!(
            "shipment {id} is not processing"
        )));
    };

    let order: Option<(ListingId, i32)> = sqlx::query_as(
        r"
        UPDATE orders
        SET status = 'shipped', updated_at = NOW()
        WHERE id = $1 AND status = 'paid'
        RETURNING listing_id, quantity
        ",
    )
    .bind(shipment.order_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((listing_id, quantity)) = order else {
        return Err(RepositoryError::Conflict(format!(
            "order {} for shipment {id} is not paid",
            shipment.order_id
        )));
    };

    let adjusted = sqlx::query(
        r"
        UPDATE products
        SET stock_quantity = stock_quantity - $2, updated_at = NOW()
        FROM listings l
        WHERE products.id = l.product_id AND l.id = $1
        ",
    )
    .bind(listing_id)
    .bind(quantity)
    .execute(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_check_violation() => RepositoryError::Conflict(
            format!("insufficient stock to ship {quantity} units of listing {listing_id}"),
        ),
        _ => RepositoryError::from(e),
    })?;

    if adjusted.rows_affected() == 0 {
        return Err(RepositoryError::DataCorruption(format!(
            "listing {listing_id} has no product row"
        )));
    }

    tx.commit().await?;

    Ok(CompletedShipment {
        shipment,
        listing_id,
        quantity,
    })
}

/// Park a shipment as `failed` after its job exhausts retries.
///
/// # Errors
///
/// Returns `NotFound` if the shipment does not exist.
pub async fn mark_failed(pool: &PgPool, id: ShipmentId) -> Result<Shipment, RepositoryError> {
    let shipment = sqlx::query_as::<_, Shipment>(&format!(
        r"
        UPDATE shipments
        SET status = 'failed', updated_at = NOW()
        WHERE id = $1 AND status = 'processing'
        RETURNING {SHIPMENT_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    shipment.ok_or(RepositoryError::NotFound)
}

/// Count of shipments awaiting processing.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn count_pending(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM shipments WHERE status IN ('pending', 'failed')")
            .fetch_one(pool)
            .await?;

    Ok(count)
}
