use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{BadRequestValidationResponse, ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse},
    AuditEvent, AuditOutcome, CallerContext, ValidatedJson,
};
use domain_environments::repository::EnvironmentRepository;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::{
    error::DnsResult,
    models::{BulkCreateDnsRecords, BulkInsertOutcome, CreateDnsRecord, DnsRecord, DnsRecordFilter},
    repository::DnsRecordRepository,
    service::DnsRecordService,
};

#[derive(OpenApi)]
#[openapi(
    paths(create_dns_record, bulk_create_dns_records, get_dns_record, list_dns_records, delete_dns_record),
    components(
        schemas(DnsRecord, CreateDnsRecord, BulkCreateDnsRecords, BulkInsertOutcome, DnsRecordFilter),
        responses(NotFoundResponse, ForbiddenResponse, BadRequestValidationResponse, InternalServerErrorResponse)
    ),
    tags((name = "dns", description = "Per-environment DNS record CRUD"))
)]
pub struct ApiDoc;

/// Nests under `/environments/{environment_id}/dns`.
pub fn router<R, E>(service: Arc<DnsRecordService<R, E>>) -> Router
where
    R: DnsRecordRepository + 'static,
    E: EnvironmentRepository + 'static,
{
    Router::new()
        .route("/", post(create_dns_record).get(list_dns_records))
        .route("/bulk", post(bulk_create_dns_records))
        .route("/{id}", get(get_dns_record).delete(delete_dns_record))
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "",
    tag = "dns",
    params(("environment_id" = Uuid, Path)),
    request_body = CreateDnsRecord,
    responses(
        (status = 201, description = "DNS record created", body = DnsRecord),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn create_dns_record<R, E>(
    State(service): State<Arc<DnsRecordService<R, E>>>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<CreateDnsRecord>,
) -> DnsResult<impl IntoResponse>
where
    R: DnsRecordRepository,
    E: EnvironmentRepository,
{
    let record = service.create(caller.user_id, environment_id, input).await?;

    AuditEvent::new(
        Some(caller.user_id.to_string()),
        "dns_record.create",
        Some(format!("dns_record:{}", record.id)),
        AuditOutcome::Success,
    )
    .log();

    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    post,
    path = "/bulk",
    tag = "dns",
    params(("environment_id" = Uuid, Path)),
    request_body = BulkCreateDnsRecords,
    responses((status = 200, description = "Per-record success/failure", body = BulkInsertOutcome))
)]
async fn bulk_create_dns_records<R, E>(
    State(service): State<Arc<DnsRecordService<R, E>>>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    Json(input): Json<BulkCreateDnsRecords>,
) -> DnsResult<impl IntoResponse>
where
    R: DnsRecordRepository,
    E: EnvironmentRepository,
{
    let outcome = service.bulk_create(caller.user_id, environment_id, input).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "dns",
    params(("environment_id" = Uuid, Path), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "DNS record found", body = DnsRecord),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_dns_record<R, E>(
    State(service): State<Arc<DnsRecordService<R, E>>>,
    caller: CallerContext,
    Path((environment_id, id)): Path<(Uuid, Uuid)>,
) -> DnsResult<impl IntoResponse>
where
    R: DnsRecordRepository,
    E: EnvironmentRepository,
{
    let record = service.get(caller.user_id, environment_id, id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "",
    tag = "dns",
    params(("environment_id" = Uuid, Path), DnsRecordFilter),
    responses((status = 200, description = "DNS records for the environment", body = Vec<DnsRecord>))
)]
async fn list_dns_records<R, E>(
    State(service): State<Arc<DnsRecordService<R, E>>>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    Query(filter): Query<DnsRecordFilter>,
) -> DnsResult<impl IntoResponse>
where
    R: DnsRecordRepository,
    E: EnvironmentRepository,
{
    let records = service.list(caller.user_id, environment_id, filter).await?;
    Ok(Json(records))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "dns",
    params(("environment_id" = Uuid, Path), ("id" = Uuid, Path)),
    responses((status = 204, description = "DNS record deleted"))
)]
async fn delete_dns_record<R, E>(
    State(service): State<Arc<DnsRecordService<R, E>>>,
    caller: CallerContext,
    Path((environment_id, id)): Path<(Uuid, Uuid)>,
) -> DnsResult<impl IntoResponse>
where
    R: DnsRecordRepository,
    E: EnvironmentRepository,
{
    service.delete(caller.user_id, environment_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
