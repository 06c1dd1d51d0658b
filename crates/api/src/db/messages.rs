//! Database operations for buyer message templates and the outbound log.

use chrono::{DateTime, Utc};
use rakuda_core::{MessageId, OrderId, TemplateId};
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Delivery status of an outbound buyer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Rendered and logged, not yet delivered.
    Queued,
    /// Delivered to the marketplace.
    Sent,
    /// Delivery failed; `error` holds the reason.
    Failed,
}

/// An operator-editable message template.
///
/// `trigger_kind` names the order event the template answers
/// (`order_paid`, `order_shipped`, `delivery_followup`); it is free text
/// so operators can add their own kinds.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageTemplate {
    /// Unique template ID.
    pub id: TemplateId,
    /// Template name (unique).
    pub name: String,
    /// Order event this template answers.
    pub trigger_kind: String,
    /// Subject line with `{{placeholder}}` slots.
    pub subject: String,
    /// Body with `{{placeholder}}` slots.
    pub body: String,
    /// Disabled templates are skipped by the generator.
    pub enabled: bool,
    /// When the template was created.
    pub created_at: DateTime<Utc>,
    /// When the template was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a template.
pub struct NewTemplate {
    /// Template name (unique).
    pub name: String,
    /// Order event the template answers.
    pub trigger_kind: String,
    /// Subject line.
    pub subject: String,
    /// Body.
    pub body: String,
}

/// A rendered buyer message in the outbound log.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerMessage {
    /// Unique message ID.
    pub id: MessageId,
    /// Order the message concerns.
    pub order_id: OrderId,
    /// Template it was rendered from, if still present.
    pub template_id: Option<TemplateId>,
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Delivery status.
    pub status: MessageStatus,
    /// Delivery error, if any.
    pub error: Option<String>,
    /// When the message was delivered.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the message was rendered.
    pub created_at: DateTime<Utc>,
}

const TEMPLATE_COLUMNS: &str =
    "id, name, trigger_kind, subject, body, enabled, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, order_id, template_id, subject, body, status, error, sent_at, created_at";

/// Create a new template.
///
/// # Errors
///
/// Returns `Conflict` if the name is taken.
pub async fn create_template(
    pool: &PgPool,
    params: NewTemplate,
) -> Result<MessageTemplate, RepositoryError> {
    let template = sqlx::query_as::<_, MessageTemplate>(&format!(
        r"
        INSERT INTO message_templates (name, trigger_kind, subject, body)
        VALUES ($1, $2, $3, $4)
        RETURNING {TEMPLATE_COLUMNS}
        "
    ))
    .bind(&params.name)
    .bind(&params.trigger_kind)
    .bind(&params.subject)
    .bind(&params.body)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("duplicate template name: {}", params.name))
        }
        _ => RepositoryError::from(e),
    })?;

    Ok(template)
}

/// Get a template by ID.
///
/// # Errors
///
/// Returns `NotFound` if the template does not exist.
pub async fn get_template(
    pool: &PgPool,
    id: TemplateId,
) -> Result<MessageTemplate, RepositoryError> {
    sqlx::query_as::<_, MessageTemplate>(&format!(
        r"
        SELECT {TEMPLATE_COLUMNS}
        FROM message_templates
        WHERE id = $1
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// List templates by name, optionally only enabled ones.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_templates(
    pool: &PgPool,
    enabled_only: bool,
) -> Result<Vec<MessageTemplate>, RepositoryError> {
    let templates = sqlx::query_as::<_, MessageTemplate>(&format!(
        r"
        SELECT {TEMPLATE_COLUMNS}
        FROM message_templates
        WHERE NOT $1 OR enabled
        ORDER BY name
        "
    ))
    .bind(enabled_only)
    .fetch_all(pool)
    .await?;

    Ok(templates)
}

/// Log a rendered message as `queued`.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn record_message(
    pool: &PgPool,
    order_id: OrderId,
    template_id: Option<TemplateId>,
    subject: &str,
    body: &str,
) -> Result<CustomerMessage, RepositoryError> {
    let message = sqlx::query_as::<_, CustomerMessage>(&format!(
        r"
        INSERT INTO customer_messages (order_id, template_id, subject, body)
        VALUES ($1, $2, $3, $4)
        RETURNING {MESSAGE_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(template_id)
    .bind(subject)
    .bind(body)
    .fetch_one(pool)
    .await?;

    Ok(message)
}

/// Mark a message delivered.
///
/// # Errors
///
/// Returns `NotFound` if the message does not exist.
pub async fn mark_sent(pool: &PgPool, id: MessageId) -> Result<CustomerMessage, RepositoryError> {
    let message = sqlx::query_as::<_, CustomerMessage>(&format!(
        r"
        UPDATE customer_messages
        SET status = 'sent', sent_at = NOW(), error = NULL
        WHERE id = $1
        RETURNING {MESSAGE_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    message.ok_or(RepositoryError::NotFound)
}

/// Mark a message failed, retaining the delivery error.
///
/// # Errors
///
/// Returns `NotFound` if the message does not exist.
pub async fn mark_failed(
    pool: &PgPool,
    id: MessageId,
    error: &str,
) -> Result<CustomerMessage, RepositoryError> {
    let message = sqlx::query_as::<_, CustomerMessage>(&format!(
        r"
        UPDATE customer_messages
        SET status = 'failed', error = $2
        WHERE id = $1
        RETURNING {MESSAGE_COLUMNS}
        "
    ))
    .bind(id)
    .bind(error)
    .fetch_optional(pool)
    .await?;

    message.ok_or(RepositoryError::NotFound)
}

/// Outbound log, newest first, optionally scoped to one order.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_messages(
    pool: &PgPool,
    order_id: Option<OrderId>,
    limit: i64,
) -> Result<Vec<CustomerMessage>, RepositoryError> {
    let messages = sqlx::query_as::<_, CustomerMessage>(&format!(
        r"
        SELECT {MESSAGE_COLUMNS}
        FROM customer_messages
        WHERE $1::integer IS NULL OR order_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "
    ))
    .bind(order_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}
