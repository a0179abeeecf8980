//! The identity a handler sees once the transport layer has terminated a
//! request's credentials.
//!
//! This crate does not issue or validate credentials — that is an external
//! collaborator's job. `CallerContext` only captures the shape every domain
//! handler needs after that validation has already happened: a user id bound
//! to the request, used to enforce ownership (who may read/mutate which
//! `Environment`).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use uuid::Uuid;

const CALLER_HEADER: &str = "x-mockfactory-user-id";

/// The caller identity bound to a request by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or((StatusCode::UNAUTHORIZED, "missing caller identity header"))?;

        let raw = header_value
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, "caller identity header is not valid UTF-8"))?;

        let user_id = raw
            .parse::<Uuid>()
            .map_err(|_| (StatusCode::BAD_REQUEST, "caller identity header is not a valid UUID"))?;

        Ok(Self { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<axum::body::Body>) -> Result<CallerContext, (StatusCode, &'static str)> {
        let (mut parts, _body) = req.into_parts();
        CallerContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let req = Request::builder().body(axum::body::Body::empty()).unwrap();
        let result = extract(req).await;
        assert_eq!(result.unwrap_err().0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_uuid_is_bad_request() {
        let req = Request::builder()
            .header(CALLER_HEADER, "not-a-uuid")
            .body(axum::body::Body::empty())
            .unwrap();
        let result = extract(req).await;
        assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn valid_header_parses_user_id() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(CALLER_HEADER, id.to_string())
            .body(axum::body::Body::empty())
            .unwrap();
        let caller = extract(req).await.unwrap();
        assert_eq!(caller.user_id, id);
    }
}
