//! JSON body extraction with declarative validation.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// `Json<T>` that also runs the `validator` derive rules.
///
/// Malformed JSON rejects with 400; rule violations reject with 400 and
/// a `details` list naming each offending field.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::Validation(flatten_errors(&e)))?;

        Ok(Self(value))
    }
}

/// Flatten `ValidationErrors` into one `field: message` line per rule.
fn flatten_errors(errors: &ValidationErrors) -> Vec<String> {
    let mut lines: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map_or_else(|| e.code.to_string(), ToString::to_string);
                format!("{field}: {message}")
            })
        })
        .collect();
    // HashMap iteration order is arbitrary; sort so clients and tests
    // see a stable list.
    lines.sort();
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct CreateTemplate {
        #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
        name: String,
        #[validate(length(min = 1, message = "must not be empty"))]
        body: String,
    }

    #[test]
    fn test_flatten_errors_names_each_field() {
        let bad = CreateTemplate {
            name: String::new(),
            body: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        let lines = flatten_errors(&errors);

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().any(|l| l.starts_with("name: ")));
        assert!(lines.iter().any(|l| l.starts_with("body: ")));
    }

    #[test]
    fn test_flatten_errors_uses_custom_message() {
        let bad = CreateTemplate {
            name: "x".repeat(121),
            body: "hello".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        let lines = flatten_errors(&errors);

        assert_eq!(lines, vec!["name: must be 1-120 characters".to_string()]);
    }

    #[test]
    fn test_valid_body_passes() {
        let ok = CreateTemplate {
            name: "thanks".to_string(),
            body: "Thanks {{buyer_name}}!".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
