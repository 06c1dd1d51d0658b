//! Buyer messaging endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rakuda_core::{OrderId, TemplateId};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::db::messages::{self, CustomerMessage, MessageTemplate, NewTemplate};
use crate::error::AppError;
use crate::middleware::{RequireSession, ValidatedJson};
use crate::services::messages::validate_placeholders;
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/messages/templates",
            get(list_templates).post(create_template),
        )
        .route("/api/messages/generate", post(generate))
        .route("/api/messages", get(list_messages))
}

#[derive(Debug, Deserialize)]
struct TemplateQuery {
    #[serde(default)]
    enabled_only: bool,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    name: String,
    /// Order event this template answers (`order_paid`, `order_shipped`,
    /// `delivery_followup`, or an operator-defined kind).
    #[validate(length(min = 1, max = 64, message = "must be 1-64 characters"))]
    trigger_kind: String,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    subject: String,
    #[validate(length(min = 1, max = 4000, message = "must be 1-4000 characters"))]
    body: String,
}

/// Render request: a template picked by ID, or by trigger kind.
#[derive(Debug, Deserialize)]
struct GenerateRequest {
    order_id: OrderId,
    template_id: Option<TemplateId>,
    trigger_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageLogQuery {
    order_id: Option<OrderId>,
    limit: Option<i64>,
}

/// Message templates, ordered by name.
async fn list_templates(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<MessageTemplate>>, AppError> {
    Ok(Json(
        messages::list_templates(state.pool(), query.enabled_only).await?,
    ))
}

/// Create a template.
///
/// Rejects placeholders the renderer does not know, so typos surface
/// here rather than on the first order that triggers the template.
/// `trigger_kind` stays free text so operators can add their own kinds.
async fn create_template(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<MessageTemplate>), AppError> {
    validate_placeholders(&body.subject, &body.body)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let template = messages::create_template(
        state.pool(),
        NewTemplate {
            name: body.name,
            trigger_kind: body.trigger_kind,
            subject: body.subject,
            body: body.body,
        },
    )
    .await?;

    state
        .audit()
        .record(
            &session.label,
            "template.create",
            Some(&format!("template:{}", template.id)),
            json!({ "name": template.name, "trigger_kind": template.trigger_kind }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(template)))
}

/// Render a template against an order and log (and, when possible,
/// deliver) the result.
async fn generate(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<CustomerMessage>), AppError> {
    let message = match (body.template_id, body.trigger_kind) {
        (Some(template_id), None) => state.messages().generate(body.order_id, template_id).await?,
        (None, Some(trigger)) => state
            .messages()
            .generate_for_trigger(body.order_id, &trigger)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no enabled template for trigger {trigger}"))
            })?,
        _ => {
            return Err(AppError::BadRequest(
                "provide exactly one of template_id or trigger_kind".to_string(),
            ));
        }
    };

    state
        .audit()
        .record(
            &session.label,
            "message.generate",
            Some(&format!("order:{}", body.order_id)),
            json!({ "message_id": message.id, "status": message.status }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Outbound message log, newest first.
async fn list_messages(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Query(query): Query<MessageLogQuery>,
) -> Result<Json<Vec<CustomerMessage>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, 500);
    Ok(Json(
        messages::list_messages(state.pool(), query.order_id, limit).await?,
    ))
}
