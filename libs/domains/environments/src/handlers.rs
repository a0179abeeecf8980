use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
    AuditEvent, AuditOutcome, CallerContext, ValidatedJson,
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::{
    effects::{ServiceProvisioner, UsageAccrual},
    error::EnvironmentResult,
    models::{CreateEnvironment, Environment, EnvironmentDetails, EnvironmentFilter, ProvisionedEnvironment, UpdateHostname},
    repository::EnvironmentRepository,
    service::EnvironmentService,
};

#[derive(OpenApi)]
#[openapi(
    paths(create_environment, get_environment, list_environments, stop_environment, start_environment, destroy_environment, update_hostname),
    components(
        schemas(Environment, EnvironmentDetails, CreateEnvironment, EnvironmentFilter, ProvisionedEnvironment, UpdateHostname),
        responses(NotFoundResponse, ForbiddenResponse, BadRequestValidationResponse, BadRequestUuidResponse, InternalServerErrorResponse)
    ),
    tags((name = "environments", description = "Environment lifecycle endpoints"))
)]
pub struct ApiDoc;

pub fn router<R, P, U>(service: Arc<EnvironmentService<R, P, U>>) -> Router
where
    R: EnvironmentRepository + 'static,
    P: ServiceProvisioner + 'static,
    U: UsageAccrual + 'static,
{
    Router::new()
        .route("/", post(create_environment).get(list_environments))
        .route("/{id}", get(get_environment).delete(destroy_environment))
        .route("/{id}/stop", post(stop_environment))
        .route("/{id}/start", post(start_environment))
        .route("/{id}/hostname", patch(update_hostname))
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "",
    tag = "environments",
    request_body = CreateEnvironment,
    responses(
        (status = 201, description = "Environment created and provisioned", body = ProvisionedEnvironment),
        (status = 400, response = BadRequestValidationResponse),
        (status = 422, description = "Provisioning failed"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_environment<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    ValidatedJson(input): ValidatedJson<CreateEnvironment>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let provisioned = service.create(caller.user_id, input).await?;

    AuditEvent::new(
        Some(caller.user_id.to_string()),
        "environment.create",
        Some(format!("environment:{}", provisioned.id)),
        AuditOutcome::Success,
    )
    .log();

    Ok((StatusCode::CREATED, Json(provisioned)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "environments",
    params(("id" = Uuid, Path, description = "Environment id")),
    responses(
        (status = 200, description = "Environment found", body = EnvironmentDetails),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_environment<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let details = service.describe(caller.user_id, id).await?;
    Ok(Json(details))
}

#[utoipa::path(
    get,
    path = "",
    tag = "environments",
    params(EnvironmentFilter),
    responses((status = 200, description = "List of owned environments", body = Vec<Environment>))
)]
async fn list_environments<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    Query(filter): Query<EnvironmentFilter>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let environments = service.list(caller.user_id, filter).await?;
    Ok(Json(environments))
}

#[utoipa::path(
    post,
    path = "/{id}/stop",
    tag = "environments",
    params(("id" = Uuid, Path, description = "Environment id")),
    responses(
        (status = 200, description = "Environment stopped", body = Environment),
        (status = 409, description = "Invalid state transition")
    )
)]
async fn stop_environment<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let environment = service.stop(caller.user_id, id).await?;
    Ok(Json(environment))
}

#[utoipa::path(
    post,
    path = "/{id}/start",
    tag = "environments",
    params(("id" = Uuid, Path, description = "Environment id")),
    responses(
        (status = 200, description = "Environment started", body = Environment),
        (status = 409, description = "Invalid state transition")
    )
)]
async fn start_environment<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let environment = service.start(caller.user_id, id).await?;
    Ok(Json(environment))
}

#[utoipa::path(
    patch,
    path = "/{id}/hostname",
    tag = "environments",
    params(("id" = Uuid, Path, description = "Environment id")),
    request_body = UpdateHostname,
    responses(
        (status = 200, description = "Hostname updated", body = Environment),
        (status = 404, response = NotFoundResponse),
        (status = 409, description = "Hostname already in use")
    )
)]
async fn update_hostname<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateHostname>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let environment = service.set_hostname(caller.user_id, id, input.hostname).await?;

    AuditEvent::new(
        Some(caller.user_id.to_string()),
        "environment.update_hostname",
        Some(format!("environment:{}", environment.id)),
        AuditOutcome::Success,
    )
    .log();

    Ok(Json(environment))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "environments",
    params(("id" = Uuid, Path, description = "Environment id")),
    responses((status = 200, description = "Environment destroyed (idempotent)", body = Environment))
)]
async fn destroy_environment<R, P, U>(
    State(service): State<Arc<EnvironmentService<R, P, U>>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> EnvironmentResult<impl IntoResponse>
where
    R: EnvironmentRepository,
    P: ServiceProvisioner,
    U: UsageAccrual,
{
    let environment = service.destroy(caller.user_id, id).await?;
    Ok(Json(environment))
}
