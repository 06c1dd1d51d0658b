//! Low-stock inventory alerts.
//!
//! Scans products whose stock has fallen to their threshold and, when
//! SMTP is configured, emails a plain-text digest to the operations
//! address. The scan also backs the `/inventory/alerts` endpoint.

use std::time::Duration;

use rakuda_core::{Currency, Money};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::db::products::{self, LowStockProduct};
use crate::error::AppError;
use crate::services::mailer::Mailer;

/// Inventory alerting service.
#[derive(Debug, Clone)]
pub struct AlertsService {
    pool: PgPool,
    mailer: Option<Mailer>,
    digest_to: Option<String>,
}

impl AlertsService {
    /// Create a new alerts service.
    ///
    /// Without a mailer the service still serves the alerts endpoint;
    /// periodic scans then only log what they find.
    #[must_use]
    pub const fn new(pool: PgPool, mailer: Option<Mailer>, digest_to: Option<String>) -> Self {
        Self {
            pool,
            mailer,
            digest_to,
        }
    }

    /// Products at or below their low-stock threshold.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    pub async fn low_stock(&self) -> Result<Vec<LowStockProduct>, AppError> {
        Ok(products::low_stock(&self.pool).await?)
    }

    /// Run one scan, emailing a digest when anything is low.
    ///
    /// Email delivery failures are logged and swallowed; the digest is
    /// advisory and the next scan will retry. Returns how many products
    /// were below threshold.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    #[instrument(skip(self))]
    pub async fn scan_and_notify(&self) -> Result<usize, AppError> {
        let low = products::low_stock(&self.pool).await?;
        if low.is_empty() {
            return Ok(0);
        }

        warn!(count = low.len(), "Products below low-stock threshold");

        if let (Some(mailer), Some(to)) = (&self.mailer, &self.digest_to) {
            let (subject, body) = format_digest(&low);
            if let Err(e) = mailer.send_plain(to, &subject, &body).await {
                warn!(error = %e, "Failed to send low-stock digest");
            }
        }

        Ok(low.len())
    }

    /// Periodic scan loop. Runs until the shutdown signal flips.
    pub async fn run(self, interval_secs: u64, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.scan_and_notify().await {
                        error!(error = %e, "Low-stock scan failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Inventory alerts task stopping");
                    return;
                }
            }
        }
    }
}

/// Build the digest subject and plain-text body.
fn format_digest(low: &[LowStockProduct]) -> (String, String) {
    let noun = if low.len() == 1 { "product" } else { "products" };
    let subject = format!("Low stock: {} {noun} below threshold", low.len());

    let mut body = String::from("The following products are at or below their low-stock threshold:\n\n");
    for product in low {
        let unit_cost = Money::new(product.cost_jpy, Currency::JPY).display();
        body.push_str(&format!(
            "- {} ({}): {} in stock, threshold {}, {} active listing(s), unit cost {}\n",
            product.title,
            product.sku,
            product.stock_quantity,
            product.low_stock_threshold,
            product.active_listings,
            unit_cost,
        ));
    }
    body.push_str("\nRestock or pause the affected listings.\n");

    (subject, body)
}
