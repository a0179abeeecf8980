//! Reusable OpenAPI response components, one per error family the
//! environment endpoints document. Examples show the envelope as the
//! control plane actually emits it.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "code": 5099,
        "error": "INTERNAL_ERROR",
        "message": "An internal error occurred",
        "details": null
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - Validation Error",
    content_type = "application/json",
    example = json!({
        "code": 1001,
        "error": "VALIDATION_ERROR",
        "message": "Request validation failed",
        "details": {
            "services": [{
                "code": "length",
                "message": "an environment declares at least one service",
                "params": {"min": 1}
            }]
        }
    })
)]
pub struct BadRequestValidationResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - Invalid UUID",
    content_type = "application/json",
    example = json!({
        "code": 1002,
        "error": "INVALID_UUID",
        "message": "Invalid UUID format",
        "details": null
    })
)]
pub struct BadRequestUuidResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found (or owned by another user)",
    content_type = "application/json",
    example = json!({
        "code": 2001,
        "error": "NOT_FOUND",
        "message": "environment 0199b2f0-5c52-7d33-a1f5-2b9f3d8f4c21 not found",
        "details": null
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Forbidden - caller may not act on this resource",
    content_type = "application/json",
    example = json!({
        "code": 3002,
        "error": "FORBIDDEN",
        "message": "account is disabled",
        "details": null
    })
)]
pub struct ForbiddenResponse(pub ErrorResponse);
