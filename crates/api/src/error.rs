//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::ebay::EbayError;
use crate::fx::RatesError;
use crate::pricing::PricingError;

/// Application-level error type.
///
/// Repository, marketplace, and provider errors funnel into this enum;
/// `IntoResponse` maps each class to a status code and redacts internals
/// on server errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// eBay API operation failed.
    #[error("eBay error: {0}")]
    Ebay(#[from] EbayError),

    /// Exchange-rate provider failed.
    #[error("Rates error: {0}")]
    Rates(#[from] RatesError),

    /// Shared cache (Redis) operation failed.
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Pricing formula rejected the inputs.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Request body failed validation.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl AppError {
    const fn is_server_class(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Cache(_)
                | Self::Ebay(_)
                | Self::Rates(_)
                | Self::Database(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
                )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_class() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        let status = match &self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Cache(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Ebay(_) | Self::Rates(_) => StatusCode::BAD_GATEWAY,
            Self::Pricing(_) | Self::Validation(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        };

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => ErrorBody {
                error: "Not found".to_string(),
                details: None,
            },
            Self::Database(RepositoryError::Conflict(reason)) => ErrorBody {
                error: reason.clone(),
                details: None,
            },
            Self::Database(_) | Self::Cache(_) | Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                details: None,
            },
            Self::Ebay(EbayError::RateLimited(secs)) => ErrorBody {
                error: format!("Marketplace rate limited, retry after {secs}s"),
                details: None,
            },
            Self::Ebay(_) => ErrorBody {
                error: "Marketplace error".to_string(),
                details: None,
            },
            Self::Rates(_) => ErrorBody {
                error: "Exchange-rate provider error".to_string(),
                details: None,
            },
            Self::Validation(messages) => ErrorBody {
                error: "Validation failed".to_string(),
                details: Some(messages.clone()),
            },
            _ => ErrorBody {
                error: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("listing 42".to_string());
        assert_eq!(err.to_string(), "Not found: listing 42");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Validation(vec!["bad".to_string()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn repository_not_found_maps_to_404() {
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict(
                "duplicate SKU".to_string()
            ))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn upstream_errors_map_to_502() {
        assert_eq!(
            get_status(AppError::Ebay(EbayError::Api {
                status: 500,
                message: "boom".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Rates(RatesError::Provider {
                status: 503,
                body: "down".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
    }
}
