//! Operator session endpoints.
//!
//! Issuance is the only route authenticated by the bootstrap admin
//! token; everything else in the API runs on the sessions minted here.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{delete, get};
use axum::{Json, Router};
use rakuda_core::SessionId;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::db::sessions::{self, SecuritySession};
use crate::error::AppError;
use crate::middleware::{RequireSession, ValidatedJson, token_hash};
use crate::state::AppState;

/// Actor label for operations authenticated by the bootstrap token.
const ADMIN_ACTOR: &str = "admin-token";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sessions", get(index).post(issue))
        .route("/api/auth/sessions/{id}", delete(revoke))
}

#[derive(Debug, Deserialize, Validate)]
struct IssueRequest {
    /// Who or what the session is for (workstation name, automation job).
    #[validate(length(min = 1, max = 80, message = "must be 1-80 characters"))]
    label: String,
}

/// Issuance response. The plaintext token appears here and nowhere
/// else; only its hash is stored.
#[derive(Debug, Serialize)]
struct IssuedSession {
    token: String,
    session: SecuritySession,
}

/// A session plus its effective liveness, saving clients the expiry and
/// revocation arithmetic.
#[derive(Debug, Serialize)]
struct SessionView {
    #[serde(flatten)]
    session: SecuritySession,
    active: bool,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Compare digests rather than the strings, so match time does not
/// depend on where they first differ.
fn admin_token_matches(presented: &str, configured: &SecretString) -> bool {
    token_hash(presented) == token_hash(configured.expose_secret())
}

/// Mint an operator session from the bootstrap admin token.
async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<IssueRequest>,
) -> Result<(StatusCode, Json<IssuedSession>), AppError> {
    let presented = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    if !admin_token_matches(presented, &state.config().admin_token) {
        return Err(AppError::Unauthorized("invalid admin token".to_string()));
    }

    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    let ttl = chrono::Duration::hours(state.config().session_ttl_hours);
    let session = sessions::create(state.pool(), &token_hash(&token), &body.label, ttl).await?;

    state
        .audit()
        .record(
            ADMIN_ACTOR,
            "session.issue",
            Some(&format!("session:{}", session.id)),
            json!({ "label": session.label, "expires_at": session.expires_at }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(IssuedSession { token, session })))
}

/// All sessions, newest first, each flagged with whether it can still
/// authenticate.
async fn index(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionView>>, AppError> {
    let sessions = sessions::list(state.pool())
        .await?
        .into_iter()
        .map(|session| SessionView {
            active: session.is_active(),
            session,
        })
        .collect();

    Ok(Json(sessions))
}

/// Revoke a session. Revoking your own session is allowed and takes
/// effect on the next request.
async fn revoke(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SecuritySession>, AppError> {
    let revoked = sessions::revoke(state.pool(), id).await?;

    state
        .audit()
        .record(
            &session.label,
            "session.revoke",
            Some(&format!("session:{id}")),
            json!({ "label": revoked.label }),
        )
        .await;

    Ok(Json(revoked))
}
