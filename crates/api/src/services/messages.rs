//! Templated buyer messages.
//!
//! Templates carry `{{placeholder}}` slots filled from order context.
//! Rendering is strict: a placeholder the renderer does not know, or one
//! whose value the order cannot supply yet (tracking before shipment),
//! fails with the offenders listed rather than sending a half-empty
//! message to a buyer.
//!
//! Generated messages are always logged to `customer_messages` first;
//! delivery through the eBay client (when configured and the order is an
//! eBay order) then flips the row to `sent` or `failed`.

use rakuda_core::{Marketplace, OrderId, TemplateId};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::db::RepositoryError;
use crate::db::messages::{self, CustomerMessage, MessageTemplate};
use crate::db::orders::{self, OrderContext};
use crate::ebay::EbayClient;
use crate::error::AppError;

/// Placeholder names the renderer understands.
pub const PLACEHOLDERS: [&str; 5] = [
    "buyer_name",
    "order_id",
    "item_title",
    "tracking_number",
    "carrier",
];

/// Errors from rendering a template against an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The template references placeholders that do not exist.
    #[error("unknown placeholders: {}", .0.join(", "))]
    UnknownPlaceholders(Vec<String>),
    /// The order cannot supply values for these placeholders yet.
    #[error("order has no value for: {}", .0.join(", "))]
    MissingValues(Vec<String>),
}

/// A rendered subject and body, ready to log and deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body.
    pub body: String,
}

/// Render a template's subject and body against one order.
///
/// Offenders from both parts are merged, so one error names everything
/// the operator has to fix.
///
/// # Errors
///
/// Returns [`RenderError`] listing unknown placeholders, or known
/// placeholders the order has no value for.
pub fn render_template(
    template: &MessageTemplate,
    ctx: &OrderContext,
) -> Result<RenderedMessage, RenderError> {
    let mut unknown = Vec::new();
    let mut missing = Vec::new();

    let subject = substitute(&template.subject, ctx, &mut unknown, &mut missing);
    let body = substitute(&template.body, ctx, &mut unknown, &mut missing);

    if !unknown.is_empty() {
        return Err(RenderError::UnknownPlaceholders(unknown));
    }
    if !missing.is_empty() {
        return Err(RenderError::MissingValues(missing));
    }

    Ok(RenderedMessage { subject, body })
}

/// Check that every placeholder in a template is one the renderer knows.
///
/// Run at template creation so a typo surfaces immediately instead of on
/// the first order that triggers the template. Value availability (e.g.
/// tracking before shipment) is still a render-time concern.
///
/// # Errors
///
/// Returns [`RenderError::UnknownPlaceholders`] listing the offenders.
pub fn validate_placeholders(subject: &str, body: &str) -> Result<(), RenderError> {
    let mut unknown = Vec::new();
    collect_unknown(subject, &mut unknown);
    collect_unknown(body, &mut unknown);

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(RenderError::UnknownPlaceholders(unknown))
    }
}

fn collect_unknown(input: &str, unknown: &mut Vec<String>) {
    let mut rest = input;
    while let Some((_, after)) = rest.split_once("{{") {
        let Some((slot, tail)) = after.split_once("}}") else {
            return;
        };
        let name = slot.trim();
        if !PLACEHOLDERS.contains(&name) && !unknown.iter().any(|u| u == name) {
            unknown.push(name.to_string());
        }
        rest = tail;
    }
}

/// Replace `{{name}}` slots, collecting offenders instead of failing fast.
///
/// An unclosed `{{` is left as literal text; only well-formed slots are
/// treated as placeholders.
fn substitute(
    input: &str,
    ctx: &OrderContext,
    unknown: &mut Vec<String>,
    missing: &mut Vec<String>,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((before, after)) = rest.split_once("{{") {
        out.push_str(before);

        let Some((slot, tail)) = after.split_once("}}") else {
            out.push_str("{{");
            out.push_str(after);
            return out;
        };

        let name = slot.trim();
        match placeholder_value(name, ctx) {
            Slot::Value(value) => out.push_str(&value),
            Slot::Empty => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
            }
            Slot::Unknown => {
                if !unknown.iter().any(|u| u == name) {
                    unknown.push(name.to_string());
                }
            }
        }

        rest = tail;
    }

    out.push_str(rest);
    out
}

enum Slot {
    Value(String),
    Empty,
    Unknown,
}

fn placeholder_value(name: &str, ctx: &OrderContext) -> Slot {
    match name {
        "buyer_name" => Slot::Value(ctx.buyer_username.clone()),
        // Buyers know the marketplace order number; the internal ID is
        // the fallback for orders never pushed to a marketplace.
        "order_id" => Slot::Value(
            ctx.order_external_id
                .clone()
                .unwrap_or_else(|| ctx.order_id.to_string()),
        ),
        "item_title" => Slot::Value(ctx.item_title.clone()),
        "tracking_number" => ctx.tracking_number.clone().map_or(Slot::Empty, Slot::Value),
        "carrier" => ctx.carrier.clone().map_or(Slot::Empty, Slot::Value),
        _ => Slot::Unknown,
    }
}

/// Buyer messaging service.
#[derive(Debug, Clone)]
pub struct MessageService {
    pool: PgPool,
    ebay: Option<EbayClient>,
}

impl MessageService {
    /// Create a new message service.
    ///
    /// Without an eBay client, generated messages stay `queued` in the
    /// outbound log (local-only mode).
    #[must_use]
    pub const fn new(pool: PgPool, ebay: Option<EbayClient>) -> Self {
        Self { pool, ebay }
    }

    /// Render a template against an order, log the message, and deliver
    /// it when possible.
    ///
    /// Delivery failure does not fail the operation: the row is marked
    /// `failed` with the error retained, and returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing order or template, `Conflict`
    /// for a disabled template, 400-class errors for render failures.
    #[instrument(skip(self))]
    pub async fn generate(
        &self,
        order_id: OrderId,
        template_id: TemplateId,
    ) -> Result<CustomerMessage, AppError> {
        let template = messages::get_template(&self.pool, template_id).await?;
        if !template.enabled {
            return Err(AppError::Conflict(format!(
                "template {} is disabled",
                template.name
            )));
        }

        self.render_and_deliver(order_id, &template).await
    }

    /// Generate from the enabled template answering a trigger kind
    /// (`order_paid`, `order_shipped`, `delivery_followup`).
    ///
    /// Returns `Ok(None)` when no enabled template has the trigger; not
    /// every shop configures every event.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`generate`](Self::generate).
    #[instrument(skip(self))]
    pub async fn generate_for_trigger(
        &self,
        order_id: OrderId,
        trigger_kind: &str,
    ) -> Result<Option<CustomerMessage>, AppError> {
        // Template counts are tiny; filtering in memory beats a bespoke query.
        let templates = messages::list_templates(&self.pool, true).await?;
        let Some(template) = templates.iter().find(|t| t.trigger_kind == trigger_kind) else {
            return Ok(None);
        };

        self.render_and_deliver(order_id, template).await.map(Some)
    }

    async fn render_and_deliver(
        &self,
        order_id: OrderId,
        template: &MessageTemplate,
    ) -> Result<CustomerMessage, AppError> {
        let ctx = orders::context(&self.pool, order_id).await.map_err(|e| {
            match e {
                RepositoryError::NotFound => {
                    AppError::NotFound(format!("order {order_id} not found"))
                }
                other => AppError::from(other),
            }
        })?;

        let rendered = render_template(template, &ctx)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let message = messages::record_message(
            &self.pool,
            order_id,
            Some(template.id),
            &rendered.subject,
            &rendered.body,
        )
        .await?;

        let Some(ebay) = &self.ebay else {
            info!(message_id = %message.id, "No marketplace client configured, message stays queued");
            return Ok(message);
        };

        if ctx.marketplace != Marketplace::Ebay {
            info!(
                message_id = %message.id,
                marketplace = ?ctx.marketplace,
                "No delivery channel for marketplace, message stays queued"
            );
            return Ok(message);
        }

        let Some(external_id) = &ctx.order_external_id else {
            info!(message_id = %message.id, "Order has no marketplace ID, message stays queued");
            return Ok(message);
        };

        match ebay
            .send_buyer_message(external_id, &rendered.subject, &rendered.body)
            .await
        {
            Ok(()) => {
                info!(message_id = %message.id, "Buyer message delivered");
                Ok(messages::mark_sent(&self.pool, message.id).await?)
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Buyer message delivery failed");
                Ok(messages::mark_failed(&self.pool, message.id, &e.to_string()).await?)
            }
        }
    }
}
