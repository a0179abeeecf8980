use axum::response::Response;

use super::{error_response, ErrorCode};

/// Router fallback: any path outside the mounted API surface answers with
/// the same envelope the domain endpoints use.
pub async fn not_found() -> Response {
    error_response(ErrorCode::NotFound, "no such endpoint")
}
