//! eBay OAuth client-credentials flow.

use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::EbayError;

/// Scope for application-level access to the sell APIs.
const API_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// An application access token with its expiry.
#[derive(Debug, Clone)]
pub struct EbayToken {
    /// Bearer token for API requests.
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl EbayToken {
    /// Whether the token should be replaced before the next request.
    ///
    /// Treated as expired 60 seconds early so an in-flight request never
    /// carries a token that dies mid-call.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 60
    }
}

/// Mint an application token with the client-credentials grant.
///
/// # Errors
///
/// Returns `EbayError::AuthenticationFailed` if the credentials are
/// rejected, `EbayError::Http` on transport failures.
#[instrument(skip(client, client_secret), fields(client_id = %client_id))]
pub async fn mint_token(
    client: &reqwest::Client,
    api_base: &str,
    client_id: &str,
    client_secret: &SecretString,
) -> Result<EbayToken, EbayError> {
    let now = chrono::Utc::now().timestamp();
    let credentials = STANDARD.encode(format!("{client_id}:{}", client_secret.expose_secret()));

    let response = client
        .post(format!("{api_base}/identity/v1/oauth2/token"))
        .header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"))
        .form(&[("grant_type", "client_credentials"), ("scope", API_SCOPE)])
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        let token: TokenResponse = response.json().await?;
        Ok(EbayToken {
            access_token: SecretString::from(token.access_token),
            expires_at: now + token.expires_in,
        })
    } else {
        let error: TokenErrorResponse =
            response.json().await.unwrap_or_else(|_| TokenErrorResponse {
                error: None,
                error_description: None,
            });
        let message = error
            .error_description
            .or(error.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(EbayError::AuthenticationFailed(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expires_with_a_safety_margin() {
        let now = chrono::Utc::now().timestamp();

        let expired = EbayToken {
            access_token: SecretString::from("test"),
            expires_at: now - 3600,
        };
        assert!(expired.is_expired());

        let valid = EbayToken {
            access_token: SecretString::from("test"),
            expires_at: now + 3600,
        };
        assert!(!valid.is_expired());

        // 30 seconds left falls inside the 60-second margin
        let almost = EbayToken {
            access_token: SecretString::from("test"),
            expires_at: now + 30,
        };
        assert!(almost.is_expired());
    }
}
