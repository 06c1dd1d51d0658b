//! Bearer-session authentication extractor.
//!
//! Every request outside `/health*` and session issuance carries
//! `Authorization: Bearer <token>`. Plaintext tokens are never stored;
//! lookup hashes the presented token and matches against
//! `security_sessions.token_hash`.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::db::sessions::{self, SecuritySession};
use crate::error::AppError;
use crate::state::AppState;

/// Hex SHA-256 digest of a bearer token, the only form that touches
/// storage or logs.
#[must_use]
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extractor requiring a live operator session.
///
/// Rejects with 401 when the header is missing or the session is
/// unknown, expired, or revoked. The matched session is handed to the
/// handler so mutations can audit the operator label.
pub struct RequireSession(pub SecuritySession);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let session = sessions::find_active_by_hash(state.pool(), &token_hash(token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or expired session".to_string()))?;

        // last_seen_at is bookkeeping; a failed stamp must not 500 the request.
        if let Err(e) = sessions::touch(state.pool(), session.id).await {
            warn!(error = %e, "Failed to stamp session last_seen_at");
        }

        Ok(Self(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/api/listings");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_hash_is_hex_sha256() {
        assert_eq!(
            token_hash("rakuda-test-token"),
            "f565c69bf38b25dfae95b637da994a33da6cc840a40c9d36b2633aa5e18702ac"
        );
        // Hash of the empty string, the classic SHA-256 vector.
        assert_eq!(
            token_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_bearer_token_extracts_after_scheme() {
        let parts = parts_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_bearer_token_requires_header() {
        let parts = parts_with_auth(None);
        assert_eq!(bearer_token(&parts), None);
    }
}
