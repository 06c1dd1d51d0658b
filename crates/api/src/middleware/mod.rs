//! Request middleware: authentication and body validation.
//!
//! Both pieces are axum extractors rather than tower layers, so each
//! handler states exactly what it requires in its signature.

pub mod auth;
pub mod validation;

pub use auth::{RequireSession, token_hash};
pub use validation::ValidatedJson;
