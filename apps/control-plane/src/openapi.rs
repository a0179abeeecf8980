use utoipa::OpenApi;

/// Aggregated OpenAPI document: each domain crate owns its own `ApiDoc`;
/// this only nests them under their mount points. The cloud-emulation
/// surface is deliberately absent — its request/response shapes are the
/// respective clouds' own APIs, not part of this document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MockFactory Control Plane",
        description = "Ephemeral infrastructure environments: lifecycle, DNS, usage metering, cloud-API emulation."
    ),
    nest(
        (path = "/users", api = domain_users::handlers::ApiDoc),
        (path = "/environments", api = domain_environments::handlers::ApiDoc),
        (path = "/environments/{environment_id}/dns", api = domain_dns::handlers::ApiDoc),
    )
)]
pub struct ApiDoc;
