//! # Axum Helpers
//!
//! HTTP plumbing shared by every domain router in the control plane:
//!
//! - **Server assembly**: OpenAPI doc UIs, `/api` mount, tracing and
//!   security-header layers, coordinated graceful shutdown
//! - **Error vocabulary**: one `ErrorCode` taxonomy and response envelope
//!   across environments, DNS, users, and the shared extractors
//! - **Caller identity**: the `CallerContext` extractor the ownership
//!   checks build on
//! - **Validation**: `ValidatedJson`, rejecting malformed create requests
//!   before a handler runs
//! - **Audit**: structured events for billable mutations
//! - **Health**: liveness handler plus composable readiness checks
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_production_app, create_router};
//! use core_config::server::ServerConfig;
//! use std::time::Duration;
//!
//! let api_routes = Router::new(); // nest your domain routers here
//! let router = create_router::<ApiDoc>(api_routes).await?;
//!
//! let config = ServerConfig::default();
//! create_production_app(router, &config, Duration::from_secs(30), async {}).await?;
//! ```

pub mod audit;
pub mod caller;
pub mod errors;
pub mod extractors;
pub mod health;
pub mod middleware;
pub mod server;
pub mod shutdown;

// Re-export commonly used types
pub use caller::CallerContext;
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use health::HealthResponse;
pub use server::{create_production_app, create_router};
pub use shutdown::ShutdownCoordinator;

// Re-export middleware functions
pub use middleware::cors::{create_cors_layer, create_permissive_cors_layer};
pub use middleware::security::security_headers;

// Re-export extractors
pub use extractors::ValidatedJson;

// Re-export audit types
pub use audit::{AuditEvent, AuditOutcome};
