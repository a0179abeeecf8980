use axum::http::{HeaderName, Method};
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// CORS for the dashboard origin.
///
/// The API is header-authenticated (bearer token terminated upstream,
/// caller identity forwarded as `x-mockfactory-user-id`), so the allow
/// list covers exactly the headers a browser client sends: content
/// negotiation, the authorization header, and the forwarded identity.
/// Every lifecycle verb the environment endpoints use is allowed,
/// including PATCH for hostname updates.
pub fn create_cors_layer(allowed_origin: axum::http::HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            HeaderName::from_static("x-mockfactory-user-id"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Any-origin CORS for local development. Not for production.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
