//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod session;

use secrecy::SecretString;

/// Database URL from the environment, preferring `RAKUDA_DATABASE_URL`
/// and falling back to the generic `DATABASE_URL` (set by Fly.io
/// postgres attach). Same rule the API uses.
pub(crate) fn database_url() -> Option<SecretString> {
    std::env::var("RAKUDA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
