//! JSON extractor that runs `validator` checks before the handler sees
//! the value.

use crate::errors::{ErrorCode, ErrorResponse};
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Deserializes the body, runs the payload's `Validate` impl, and
/// rejects with the standard error envelope carrying per-field details —
/// so a create-environment request with an empty `services` array never
/// reaches the handler.
///
/// # Example
/// ```ignore
/// use axum_helpers::extractors::ValidatedJson;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct CreateEnvironment {
///     #[validate(length(min = 1, max = 255))]
///     name: String,
///     #[validate(length(min = 1))]
///     services: Vec<ServiceRequest>,
/// }
///
/// async fn create(ValidatedJson(input): ValidatedJson<CreateEnvironment>) { /* … */ }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| e.into_response())?;

        data.validate().map_err(|e| {
            let details = e
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    let messages: Vec<serde_json::Value> = errors
                        .iter()
                        .map(|err| {
                            serde_json::json!({
                                "code": err.code,
                                "message": err.message,
                                "params": err.params,
                            })
                        })
                        .collect();
                    (field.to_string(), serde_json::json!(messages))
                })
                .collect::<serde_json::Map<_, _>>();

            let code = ErrorCode::ValidationError;
            let envelope = ErrorResponse {
                details: Some(serde_json::Value::Object(details)),
                ..ErrorResponse::of(code, code.default_message())
            };

            (code.status(), axum::Json(envelope)).into_response()
        })?;

        Ok(ValidatedJson(data))
    }
}
