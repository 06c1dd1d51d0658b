//! eBay API client.
//!
//! Covers the two marketplace calls the back office makes: pushing a
//! revised price to a live offer and sending a buyer message. OAuth
//! client-credentials tokens are minted on demand and cached in memory
//! until shortly before expiry.

mod auth;
mod client;

pub use client::EbayClient;

use thiserror::Error;

/// Errors from the eBay API.
#[derive(Debug, Error)]
pub enum EbayError {
    #[error("eBay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("eBay authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limited; retry after the given number of seconds.
    #[error("eBay rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("eBay API error ({status}): {message}")]
    Api { status: u16, message: String },
}
