//! Cache administration endpoints.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::{CacheNamespace, CacheStats};
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/cache/stats", get(stats))
        .route("/api/admin/cache/config", get(config))
        .route("/api/admin/cache/invalidate", post(invalidate))
        .route("/api/admin/cache/flush", post(flush))
}

/// One row of the namespace configuration table.
#[derive(Debug, Serialize)]
struct NamespaceConfig {
    namespace: CacheNamespace,
    prefix: String,
    ttl_secs: u64,
}

/// Invalidation target: a whole namespace, or one exact key within it
/// when `params` is present.
#[derive(Debug, Deserialize)]
struct InvalidateRequest {
    namespace: CacheNamespace,
    params: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: u64,
}

/// Hit/miss/error counters and the live entry count.
async fn stats(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<CacheStats>, AppError> {
    Ok(Json(state.cache().stats().await))
}

/// The namespace and TTL table, as configured.
async fn config(RequireSession(_session): RequireSession) -> Json<Vec<NamespaceConfig>> {
    let table = CacheNamespace::ALL
        .into_iter()
        .map(|namespace| NamespaceConfig {
            namespace,
            prefix: namespace.prefix(),
            ttl_secs: namespace.ttl().as_secs(),
        })
        .collect();
    Json(table)
}

/// Drop a namespace, or one exact key within it.
async fn invalidate(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    Json(body): Json<InvalidateRequest>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted = match &body.params {
        Some(params) => state.cache().invalidate(body.namespace, Some(params)).await?,
        None => state.cache().invalidate_namespace(body.namespace).await?,
    };

    state
        .audit()
        .record(
            &session.label,
            "cache.invalidate",
            Some(&format!("cache:{}", body.namespace)),
            json!({ "params": body.params, "deleted": deleted }),
        )
        .await;

    Ok(Json(DeletedResponse { deleted }))
}

/// Drop every cache entry.
async fn flush(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted = state.cache().flush_all().await?;

    state
        .audit()
        .record(
            &session.label,
            "cache.flush",
            None,
            json!({ "deleted": deleted }),
        )
        .await;

    Ok(Json(DeletedResponse { deleted }))
}
